//! # Resumable Completion
//!
//! The [`Synchronization`] hook that turns completed units of work into offset
//! updates. Successful units with a well-formed [`Resumable`] under
//! [`headers::OFFSET`] advance the configured strategy. Failed units never do;
//! they are logged so that operators can see which position was not recorded.
//!
//! Offset tracking problems are absorbed here: a rejected write is logged and
//! the route keeps running.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::constants::headers;
use crate::error::ResumeError;
use crate::log_at;
use crate::logging::LoggingLevel;
use crate::offset::Resumable;
use crate::strategy::ConfiguredStrategy;
use crate::unit_of_work::{Synchronization, UnitOfWork};

#[derive(Debug, Clone)]
pub struct ResumableCompletion {
    strategy: ConfiguredStrategy,
    logging_level: LoggingLevel,
}

impl ResumableCompletion {
    /// `logging_level` is the severity used for failed units when DEBUG is off
    pub fn new(strategy: ConfiguredStrategy, logging_level: LoggingLevel) -> Self {
        Self {
            strategy,
            logging_level,
        }
    }

    pub fn strategy(&self) -> &ConfiguredStrategy {
        &self.strategy
    }

    pub fn logging_level(&self) -> LoggingLevel {
        self.logging_level
    }
}

#[async_trait]
impl Synchronization for ResumableCompletion {
    async fn on_complete(&self, unit: &mut UnitOfWork) {
        if unit.is_failure_handled() {
            debug!(
                unit_id = %unit.id(),
                "Skipping offset update for a unit whose failure was handled"
            );
            return;
        }

        let resumable = match OffsetHeader::read(unit) {
            OffsetHeader::Present(resumable) => resumable,
            absent => {
                warn!(
                    unit_id = %unit.id(),
                    header = headers::OFFSET,
                    offset_header = absent.describe(),
                    strategy = self.strategy.name(),
                    "⚠️ Cannot update offset: unit of work carries no resumable"
                );
                let missing = ResumeError::MissingOffset {
                    unit_id: unit.id().to_string(),
                    header: headers::OFFSET.to_string(),
                };
                unit.set_error(missing);
                return;
            }
        };

        let Some(updatable) = self.strategy.as_updatable() else {
            debug!(
                strategy = self.strategy.name(),
                resumable = %resumable,
                "Strategy does not track offsets; nothing to update"
            );
            return;
        };

        if let Err(e) = updatable.update_last_offset(&resumable).await {
            error!(
                strategy = self.strategy.name(),
                addressable = %resumable.addressable(),
                offset = %resumable.last_offset(),
                error = %e,
                "❌ Failed to update last offset; continuing"
            );
        }
    }

    async fn on_failure(&self, unit: &mut UnitOfWork) {
        let header = OffsetHeader::read(unit);
        let (addressable, offset) = match &header {
            OffsetHeader::Present(r) => (r.addressable().to_string(), r.last_offset().to_string()),
            absent => (absent.describe().to_string(), absent.describe().to_string()),
        };
        let reason = unit.error().map(ToString::to_string).unwrap_or_default();

        if LoggingLevel::Debug.is_enabled() {
            debug!(
                unit_id = %unit.id(),
                addressable = %addressable,
                offset = %offset,
                error = %reason,
                detail = ?unit.error(),
                "Cannot update offset for a failed unit of work"
            );
        } else {
            log_at!(
                self.logging_level,
                unit_id = %unit.id(),
                addressable = %addressable,
                offset = %offset,
                error = %reason,
                "Cannot update offset for a failed unit of work (full error detail available at DEBUG logging level)"
            );
        }
    }
}

/// What a unit carries under the offset header
enum OffsetHeader {
    Present(Resumable),
    Missing,
    Malformed,
}

impl OffsetHeader {
    fn read(unit: &UnitOfWork) -> Self {
        match unit.header(headers::OFFSET) {
            None | Some(serde_json::Value::Null) => OffsetHeader::Missing,
            Some(value) => Resumable::from_header(value)
                .map_or(OffsetHeader::Malformed, OffsetHeader::Present),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            OffsetHeader::Present(_) => "present",
            OffsetHeader::Missing => "<missing>",
            OffsetHeader::Malformed => "<malformed>",
        }
    }
}
