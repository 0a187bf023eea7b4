//! # Unit of Work
//!
//! The boundary between consumers and the pipeline that processes what they
//! poll. A [`UnitOfWork`] carries a body, result metadata (headers), an
//! attached error when processing failed, and the [`Synchronization`] hooks to
//! fire when it completes.
//!
//! Completion is exactly-once by construction: [`UnitOfWork::done`] consumes
//! the unit, decides the outcome once, and fires either `on_complete` or
//! `on_failure` on every registered hook.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Completion hooks attached to a unit of work
#[async_trait]
pub trait Synchronization: Send + Sync {
    /// Called when the unit completed without an error
    async fn on_complete(&self, unit: &mut UnitOfWork);

    /// Called when the unit completed with an error
    async fn on_failure(&self, unit: &mut UnitOfWork);
}

/// How a unit of work finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

pub struct UnitOfWork {
    id: Uuid,
    body: Value,
    headers: HashMap<String, Value>,
    error: Option<anyhow::Error>,
    caught_error: Option<anyhow::Error>,
    failure_handled: bool,
    synchronizations: Vec<Arc<dyn Synchronization>>,
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("body", &self.body)
            .field("headers", &self.headers)
            .field("error", &self.error)
            .field("failure_handled", &self.failure_handled)
            .field("synchronizations", &self.synchronizations.len())
            .finish()
    }
}

impl UnitOfWork {
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            body: body.into(),
            headers: HashMap::new(),
            error: None,
            caught_error: None,
            failure_handled: false,
            synchronizations: Vec::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Body as text, when it is a JSON string
    pub fn body_str(&self) -> Option<&str> {
        self.body.as_str()
    }

    pub fn set_body(&mut self, body: impl Into<Value>) {
        self.body = body.into();
    }

    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn remove_header(&mut self, key: &str) -> Option<Value> {
        self.headers.remove(key)
    }

    pub fn headers(&self) -> &HashMap<String, Value> {
        &self.headers
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: impl Into<anyhow::Error>) {
        self.error = Some(error.into());
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Suppress the attached error: the unit is treated as completed, but
    /// flagged so that completion hooks know it did not genuinely succeed.
    pub fn handle_failure(&mut self) {
        if let Some(error) = self.error.take() {
            self.caught_error = Some(error);
        }
        self.failure_handled = true;
    }

    pub fn is_failure_handled(&self) -> bool {
        self.failure_handled
    }

    /// The error that was suppressed by [`UnitOfWork::handle_failure`]
    pub fn caught_error(&self) -> Option<&anyhow::Error> {
        self.caught_error.as_ref()
    }

    pub fn add_synchronization(&mut self, synchronization: Arc<dyn Synchronization>) {
        self.synchronizations.push(synchronization);
    }

    /// Complete the unit, firing each hook exactly once
    pub async fn done(mut self) -> CompletedUnit {
        let outcome = if self.is_failed() {
            Outcome::Failure
        } else {
            Outcome::Success
        };

        let synchronizations = std::mem::take(&mut self.synchronizations);
        for synchronization in synchronizations {
            match outcome {
                Outcome::Success => synchronization.on_complete(&mut self).await,
                Outcome::Failure => synchronization.on_failure(&mut self).await,
            }
        }

        CompletedUnit {
            unit: self,
            outcome,
        }
    }
}

/// A unit of work whose hooks have fired
#[derive(Debug)]
pub struct CompletedUnit {
    unit: UnitOfWork,
    outcome: Outcome,
}

impl CompletedUnit {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn unit(&self) -> &UnitOfWork {
        &self.unit
    }

    /// Error observable by the producer after completion, including errors
    /// raised by the hooks themselves
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.unit.error()
    }

    pub fn into_inner(self) -> UnitOfWork {
        self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHook {
        completed: AtomicUsize,
        failed: AtomicUsize,
    }

    #[async_trait]
    impl Synchronization for CountingHook {
        async fn on_complete(&self, unit: &mut UnitOfWork) {
            self.completed.fetch_add(1, Ordering::SeqCst);
            // Errors raised on completion must not flip the outcome for later hooks
            unit.set_error(anyhow::anyhow!("raised by hook"));
        }

        async fn on_failure(&self, _unit: &mut UnitOfWork) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_success_fires_on_complete_once_per_hook() {
        let first = Arc::new(CountingHook::default());
        let second = Arc::new(CountingHook::default());

        let mut unit = UnitOfWork::new("payload");
        unit.add_synchronization(first.clone());
        unit.add_synchronization(second.clone());
        let completed = unit.done().await;

        assert_eq!(completed.outcome(), Outcome::Success);
        for hook in [&first, &second] {
            assert_eq!(hook.completed.load(Ordering::SeqCst), 1);
            assert_eq!(hook.failed.load(Ordering::SeqCst), 0);
        }
        assert!(completed.error().is_some());
    }

    #[tokio::test]
    async fn test_failure_fires_on_failure_only() {
        let hook = Arc::new(CountingHook::default());
        let mut unit = UnitOfWork::new("payload");
        unit.add_synchronization(hook.clone());
        unit.set_error(anyhow::anyhow!("processing failed"));

        let completed = unit.done().await;
        assert_eq!(completed.outcome(), Outcome::Failure);
        assert_eq!(hook.completed.load(Ordering::SeqCst), 0);
        assert_eq!(hook.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handled_failure_completes_successfully() {
        let mut unit = UnitOfWork::new("payload");
        unit.set_error(anyhow::anyhow!("caught upstream"));
        unit.handle_failure();

        assert!(unit.is_failure_handled());
        assert!(!unit.is_failed());
        assert_eq!(
            unit.caught_error().map(|e| e.to_string()),
            Some("caught upstream".to_string())
        );
        assert_eq!(unit.done().await.outcome(), Outcome::Success);
    }
}
