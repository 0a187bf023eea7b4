use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tasker_resume::consumer::{PollSource, UnitProcessor};
use tasker_resume::strategy::{ResumeStrategy, UpdatableResumeStrategy};
use tasker_resume::{Addressable, Offset, ResumeError, ResumeResult, Resumable, UnitOfWork};

/// Updatable strategy that counts calls and remembers every update
#[derive(Default)]
pub struct CallCountingStrategy {
    pub updates: Mutex<Vec<Resumable>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub reject_updates: bool,
}

impl CallCountingStrategy {
    pub fn rejecting() -> Self {
        Self {
            reject_updates: true,
            ..Default::default()
        }
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }
}

#[async_trait]
impl ResumeStrategy for CallCountingStrategy {
    fn name(&self) -> &str {
        "call-counting"
    }

    async fn start(&self) -> ResumeResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> ResumeResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl UpdatableResumeStrategy for CallCountingStrategy {
    async fn update_last_offset(&self, resumable: &Resumable) -> ResumeResult<()> {
        self.updates.lock().push(resumable.clone());
        if self.reject_updates {
            return Err(ResumeError::persist_failed(resumable.addressable(), "store offline"));
        }
        Ok(())
    }

    async fn reset_offset(&self, _resumable: &Resumable) -> ResumeResult<()> {
        Ok(())
    }

    fn last_offset(&self, addressable: &Addressable) -> Option<Offset> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|r| r.addressable() == addressable)
            .map(|r| r.last_offset().clone())
    }
}

/// Poll source that replays a fixed script, then returns empty batches
pub struct ScriptedSource {
    script: VecDeque<anyhow::Result<Vec<UnitOfWork>>>,
    pub polls: std::sync::Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = anyhow::Result<Vec<UnitOfWork>>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            polls: Default::default(),
        }
    }

    /// A source whose every poll fails
    pub fn failing(times: usize) -> Self {
        Self::new((0..times).map(|n| Err(anyhow::anyhow!("broker unreachable (attempt {})", n + 1))))
    }
}

#[async_trait]
impl PollSource for ScriptedSource {
    async fn poll(&mut self) -> anyhow::Result<Vec<UnitOfWork>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Processor that records bodies and fails units whose body matches
#[derive(Default)]
pub struct RecordingProcessor {
    pub bodies: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
}

#[async_trait]
impl UnitProcessor for RecordingProcessor {
    async fn process(&self, unit: &mut UnitOfWork) -> anyhow::Result<()> {
        let body = unit.body_str().unwrap_or_default().to_string();
        self.bodies.lock().push(body.clone());
        if self.fail_on.as_deref() == Some(body.as_str()) {
            anyhow::bail!("cannot process {body}");
        }
        Ok(())
    }
}
