//! In-process offset tracking, lost on restart.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::{advance_offset, Advance, ResumeStrategy, UpdatableResumeStrategy};
use crate::error::{ResumeError, ResumeResult};
use crate::offset::{Addressable, Offset, Resumable};

const NAME: &str = "memory";

/// Keeps the last offset per addressable in a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryOffsetStrategy {
    offsets: DashMap<Addressable, Offset>,
    started: AtomicBool,
}

impl InMemoryOffsetStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addressables with a recorded offset
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn ensure_started(&self) -> ResumeResult<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(ResumeError::NotStarted(NAME.to_string()))
        }
    }
}

/// Compare-and-advance against a map entry; the entry guard holds the shard
/// lock, so the comparison and the write are atomic per key.
pub(crate) fn advance_entry(entry: Entry<'_, Addressable, Offset>, proposed: &Offset) -> Advance {
    match entry {
        Entry::Vacant(vacant) => {
            vacant.insert(proposed.clone());
            Advance::Inserted
        }
        Entry::Occupied(mut occupied) => {
            let mut current = Some(occupied.get().clone());
            let advance = advance_offset(&mut current, proposed);
            if let (Advance::Replaced, Some(offset)) = (advance, current) {
                occupied.insert(offset);
            }
            advance
        }
    }
}

#[async_trait]
impl ResumeStrategy for InMemoryOffsetStrategy {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> ResumeResult<()> {
        if !self.started.swap(true, Ordering::AcqRel) {
            info!(strategy = NAME, "Resume strategy started");
        }
        Ok(())
    }

    async fn stop(&self) -> ResumeResult<()> {
        if self.started.swap(false, Ordering::AcqRel) {
            info!(strategy = NAME, tracked = self.offsets.len(), "Resume strategy stopped");
        }
        Ok(())
    }
}

#[async_trait]
impl UpdatableResumeStrategy for InMemoryOffsetStrategy {
    async fn update_last_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        self.ensure_started()?;

        let advance = advance_entry(
            self.offsets.entry(resumable.addressable().clone()),
            resumable.last_offset(),
        );
        debug!(
            strategy = NAME,
            resumable = %resumable,
            outcome = ?advance,
            "Offset update applied"
        );
        Ok(())
    }

    async fn reset_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        self.ensure_started()?;
        self.offsets.insert(
            resumable.addressable().clone(),
            resumable.last_offset().clone(),
        );
        Ok(())
    }

    fn last_offset(&self, addressable: &Addressable) -> Option<Offset> {
        self.offsets.get(addressable).map(|entry| (*entry).clone())
    }
}
