//! # Resume Strategies
//!
//! Pluggable contracts for recording how far a consumer has progressed.
//!
//! ## Capabilities
//!
//! - [`ResumeStrategy`]: scoped lifecycle (`start`/`stop`), idempotent.
//! - [`UpdatableResumeStrategy`]: advances the recorded offset of an
//!   [`Addressable`] when a unit of work completes.
//! - [`SetResumeStrategy`]: filters a bounded candidate set (e.g. a directory
//!   listing) down to the entries that still need processing.
//!
//! Which capabilities a route has is fixed when it is configured, through
//! [`ConfiguredStrategy`]. Call sites ask the configured strategy for a
//! capability instead of inspecting concrete types.
//!
//! ## Concurrent updates
//!
//! Units from the same source may complete out of order. Strategies apply
//! compare-and-advance per key: an ordered offset that is older than the
//! recorded one is ignored, while unordered (opaque) offsets are last-write-wins.

pub mod file;
pub mod memory;
pub mod processed_set;
pub mod resume_set;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::config::{StrategyConfig, StrategyKind};
use crate::error::{ResumeError, ResumeResult};
use crate::offset::{Addressable, Offset, Resumable};

pub use file::FileOffsetStrategy;
pub use memory::InMemoryOffsetStrategy;
pub use processed_set::ProcessedSetStrategy;
pub use resume_set::{ResumableSet, ResumeSet};

/// Base lifecycle shared by all strategies
#[async_trait]
pub trait ResumeStrategy: Send + Sync {
    /// Name for logging and error reporting
    fn name(&self) -> &str;

    /// Open the backing store. Calling `start` on a started strategy is a no-op.
    async fn start(&self) -> ResumeResult<()>;

    /// Flush and close the backing store. Calling `stop` twice is a no-op.
    async fn stop(&self) -> ResumeResult<()>;
}

/// A strategy whose recorded offsets advance as units complete
#[async_trait]
pub trait UpdatableResumeStrategy: ResumeStrategy {
    /// Record `resumable` as the last processed position for its addressable.
    ///
    /// # Errors
    ///
    /// Returns [`ResumeError::PersistFailed`] if the store rejects the write.
    async fn update_last_offset(&self, resumable: &Resumable) -> ResumeResult<()>;

    /// Overwrite the recorded offset, bypassing the no-regression check
    async fn reset_offset(&self, resumable: &Resumable) -> ResumeResult<()>;

    /// Last recorded offset, used to resume after a restart
    fn last_offset(&self, addressable: &Addressable) -> Option<Offset>;
}

/// A strategy that filters a bounded set of candidates
pub trait SetResumeStrategy: ResumeStrategy {
    /// Whether `addressable` has already been processed
    fn is_processed(&self, addressable: &Addressable) -> bool;

    /// Retain only the candidates that still require processing
    fn resume(&self, set: &mut dyn ResumableSet) {
        set.resume_each(&mut |addressable| !self.is_processed(addressable));
    }
}

/// Outcome of comparing a proposed offset against the recorded one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    /// No offset was recorded yet
    Inserted,
    /// The proposed offset is newer, or unordered against the recorded one
    Replaced,
    /// The proposed offset is older than the recorded one
    Ignored,
}

/// Compare-and-advance for one key; `current` is updated in place
pub(crate) fn advance_offset(current: &mut Option<Offset>, proposed: &Offset) -> Advance {
    match current {
        None => {
            *current = Some(proposed.clone());
            Advance::Inserted
        }
        Some(recorded) if proposed.partial_cmp(recorded) == Some(std::cmp::Ordering::Less) => {
            trace!(
                recorded = %recorded,
                proposed = %proposed,
                "Ignoring offset older than the recorded one"
            );
            Advance::Ignored
        }
        Some(recorded) => {
            *recorded = proposed.clone();
            Advance::Replaced
        }
    }
}

/// Which capability tags a configured strategy carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyCapabilities {
    Plain,
    Updatable,
    Set,
    SetUpdatable,
}

/// A strategy instance together with the capabilities it was configured with
#[derive(Clone)]
pub struct ConfiguredStrategy {
    base: Arc<dyn ResumeStrategy>,
    updatable: Option<Arc<dyn UpdatableResumeStrategy>>,
    set: Option<Arc<dyn SetResumeStrategy>>,
}

impl fmt::Debug for ConfiguredStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguredStrategy")
            .field("name", &self.base.name())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl ConfiguredStrategy {
    /// A strategy with lifecycle only; offsets are never updated
    pub fn plain<S: ResumeStrategy + 'static>(strategy: Arc<S>) -> Self {
        Self {
            base: strategy,
            updatable: None,
            set: None,
        }
    }

    pub fn updatable<S: UpdatableResumeStrategy + 'static>(strategy: Arc<S>) -> Self {
        Self {
            base: strategy.clone(),
            updatable: Some(strategy),
            set: None,
        }
    }

    pub fn set<S: SetResumeStrategy + 'static>(strategy: Arc<S>) -> Self {
        Self {
            base: strategy.clone(),
            updatable: None,
            set: Some(strategy),
        }
    }

    pub fn set_updatable<S>(strategy: Arc<S>) -> Self
    where
        S: SetResumeStrategy + UpdatableResumeStrategy + 'static,
    {
        Self {
            base: strategy.clone(),
            updatable: Some(strategy.clone()),
            set: Some(strategy),
        }
    }

    /// Build the strategy selected by configuration
    pub fn from_config(config: &StrategyConfig) -> ResumeResult<Self> {
        match config.kind {
            StrategyKind::Memory => Ok(Self::updatable(Arc::new(InMemoryOffsetStrategy::new()))),
            StrategyKind::ProcessedSet => {
                Ok(Self::set_updatable(Arc::new(ProcessedSetStrategy::new())))
            }
            StrategyKind::File => {
                let path = config.file_path.clone().ok_or_else(|| {
                    ResumeError::store_unavailable("file", "no offset file path configured")
                })?;
                Ok(Self::updatable(Arc::new(FileOffsetStrategy::new(path))))
            }
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn capabilities(&self) -> StrategyCapabilities {
        match (self.updatable.is_some(), self.set.is_some()) {
            (false, false) => StrategyCapabilities::Plain,
            (true, false) => StrategyCapabilities::Updatable,
            (false, true) => StrategyCapabilities::Set,
            (true, true) => StrategyCapabilities::SetUpdatable,
        }
    }

    pub fn as_updatable(&self) -> Option<&Arc<dyn UpdatableResumeStrategy>> {
        self.updatable.as_ref()
    }

    pub fn as_set(&self) -> Option<&Arc<dyn SetResumeStrategy>> {
        self.set.as_ref()
    }

    pub async fn start(&self) -> ResumeResult<()> {
        self.base.start().await
    }

    pub async fn stop(&self) -> ResumeResult<()> {
        self.base.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_offset_semantics() {
        let mut current = None;
        assert_eq!(advance_offset(&mut current, &Offset::sequence(5)), Advance::Inserted);
        assert_eq!(advance_offset(&mut current, &Offset::sequence(3)), Advance::Ignored);
        assert_eq!(current, Some(Offset::sequence(5)));
        assert_eq!(advance_offset(&mut current, &Offset::sequence(5)), Advance::Replaced);
        assert_eq!(advance_offset(&mut current, &Offset::sequence(8)), Advance::Replaced);
        assert_eq!(current, Some(Offset::sequence(8)));

        // Opaque offsets cannot be compared, so the latest write wins
        assert_eq!(advance_offset(&mut current, &Offset::opaque("cursor-a")), Advance::Replaced);
        assert_eq!(advance_offset(&mut current, &Offset::opaque("cursor-0")), Advance::Replaced);
        assert_eq!(current, Some(Offset::opaque("cursor-0")));
    }

    #[test]
    fn test_capabilities_follow_configuration() {
        let memory = ConfiguredStrategy::from_config(&StrategyConfig::default()).unwrap();
        assert_eq!(memory.capabilities(), StrategyCapabilities::Updatable);
        assert!(memory.as_set().is_none());

        let set = ConfiguredStrategy::from_config(&StrategyConfig {
            kind: StrategyKind::ProcessedSet,
            file_path: None,
        })
        .unwrap();
        assert_eq!(set.capabilities(), StrategyCapabilities::SetUpdatable);

        let plain = ConfiguredStrategy::plain(Arc::new(InMemoryOffsetStrategy::new()));
        assert_eq!(plain.capabilities(), StrategyCapabilities::Plain);
        assert!(plain.as_updatable().is_none());
    }

    #[test]
    fn test_file_strategy_requires_path() {
        let result = ConfiguredStrategy::from_config(&StrategyConfig {
            kind: StrategyKind::File,
            file_path: None,
        });
        assert!(matches!(result, Err(ResumeError::StoreUnavailable { .. })));
    }
}
