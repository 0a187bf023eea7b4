//! Error types for resumable consumption and consumer recovery.
//!

use thiserror::Error;

use crate::offset::Addressable;

/// Errors raised by resume strategies and the completion handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    /// Resumable tracking is configured but the unit carried no offset
    #[error("No offset available on unit of work {unit_id}: resumable tracking requires a resumable under '{header}'")]
    MissingOffset { unit_id: String, header: String },

    /// The backing store rejected an offset write
    #[error("Failed to persist offset for '{addressable}': {reason}")]
    PersistFailed {
        addressable: Addressable,
        reason: String,
    },

    /// The backing store could not be reached during start or stop
    #[error("Resume store unavailable for strategy '{strategy}': {reason}")]
    StoreUnavailable { strategy: String, reason: String },

    /// The strategy was used before `start()` or after `stop()`
    #[error("Resume strategy '{0}' is not started")]
    NotStarted(String),
}

impl ResumeError {
    pub fn persist_failed(addressable: &Addressable, reason: impl Into<String>) -> Self {
        ResumeError::PersistFailed {
            addressable: addressable.clone(),
            reason: reason.into(),
        }
    }

    pub fn store_unavailable(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        ResumeError::StoreUnavailable {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while running consumer tasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumerError {
    #[error("Consumer task {0} is already running")]
    AlreadyRunning(String),
    #[error("Consumer task {0} was terminated and must be restarted")]
    Terminated(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Resume error: {0}")]
    Resume(#[from] ResumeError),
}

pub type ResumeResult<T> = std::result::Result<T, ResumeError>;
pub type ConsumerResult<T> = std::result::Result<T, ConsumerError>;
