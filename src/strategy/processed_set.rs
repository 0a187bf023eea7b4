//! Set-based resume: remembers which addressables completed and filters
//! candidate sets against them.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::{ResumeStrategy, SetResumeStrategy, UpdatableResumeStrategy};
use crate::error::{ResumeError, ResumeResult};
use crate::offset::{Addressable, Offset, Resumable};

const NAME: &str = "processed-set";

#[derive(Debug, Default)]
pub struct ProcessedSetStrategy {
    processed: DashMap<Addressable, Offset>,
    started: AtomicBool,
}

impl ProcessedSetStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the strategy with addressables that completed in an earlier run
    pub fn with_processed<I>(processed: I) -> Self
    where
        I: IntoIterator<Item = Resumable>,
    {
        let strategy = Self::new();
        for resumable in processed {
            let (addressable, offset) = resumable.into_parts();
            strategy.processed.insert(addressable, offset);
        }
        strategy
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    fn ensure_started(&self) -> ResumeResult<()> {
        if self.started.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ResumeError::NotStarted(NAME.to_string()))
        }
    }
}

#[async_trait]
impl ResumeStrategy for ProcessedSetStrategy {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> ResumeResult<()> {
        if !self.started.swap(true, Ordering::AcqRel) {
            info!(strategy = NAME, processed = self.processed.len(), "Resume strategy started");
        }
        Ok(())
    }

    async fn stop(&self) -> ResumeResult<()> {
        self.started.store(false, Ordering::Release);
        Ok(())
    }
}

impl SetResumeStrategy for ProcessedSetStrategy {
    fn is_processed(&self, addressable: &Addressable) -> bool {
        self.processed.contains_key(addressable)
    }
}

#[async_trait]
impl UpdatableResumeStrategy for ProcessedSetStrategy {
    async fn update_last_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        self.ensure_started()?;
        super::memory::advance_entry(
            self.processed.entry(resumable.addressable().clone()),
            resumable.last_offset(),
        );
        debug!(strategy = NAME, resumable = %resumable, "Marked addressable as processed");
        Ok(())
    }

    async fn reset_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        self.ensure_started()?;
        self.processed.insert(
            resumable.addressable().clone(),
            resumable.last_offset().clone(),
        );
        Ok(())
    }

    fn last_offset(&self, addressable: &Addressable) -> Option<Offset> {
        self.processed.get(addressable).map(|entry| entry.value().clone())
    }
}
