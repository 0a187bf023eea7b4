//! # Consumer Runner
//!
//! Drives one [`ConsumerTask`] with a poll loop on its own tokio task:
//! polls a [`PollSource`], hands every unit to a [`UnitProcessor`], completes
//! the unit (firing the resumable completion hook) and reports each poll
//! outcome to the task's recovery state machine.
//!
//! The task is registered with the [`ConsumerTaskRegistry`] when the loop is
//! spawned and deregistered when it is stopped through [`ConsumerHandle`]. A
//! task that gives up recovering stays registered, so readiness checks keep
//! reporting it until the route is restarted.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::task::{ConsumerTask, RecoveryDecision};
use crate::completion::ResumableCompletion;
use crate::config::ConsumerConfig;
use crate::error::{ConsumerError, ConsumerResult};
use crate::health::ConsumerTaskRegistry;
use crate::unit_of_work::{Outcome, UnitOfWork};

/// Transport side of a consumer: produces batches of units
#[async_trait]
pub trait PollSource: Send {
    /// Fetch the next batch. An error moves the task into recovery.
    async fn poll(&mut self) -> anyhow::Result<Vec<UnitOfWork>>;
}

/// Pipeline side of a consumer: processes one unit
#[async_trait]
pub trait UnitProcessor: Send + Sync {
    async fn process(&self, unit: &mut UnitOfWork) -> anyhow::Result<()>;
}

pub struct ConsumerRunner {
    task: Arc<ConsumerTask>,
    registry: Arc<ConsumerTaskRegistry>,
    completion: Option<Arc<ResumableCompletion>>,
    config: ConsumerConfig,
}

impl ConsumerRunner {
    pub fn new(
        task: Arc<ConsumerTask>,
        registry: Arc<ConsumerTaskRegistry>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            task,
            registry,
            completion: None,
            config,
        }
    }

    /// Attach the completion hook to every unit this runner dispatches
    pub fn with_completion(mut self, completion: Arc<ResumableCompletion>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn task(&self) -> &Arc<ConsumerTask> {
        &self.task
    }

    /// Register the task and start polling on a new tokio task
    pub fn spawn<S, P>(self, source: S, processor: Arc<P>) -> ConsumerResult<ConsumerHandle>
    where
        S: PollSource + 'static,
        P: UnitProcessor + 'static,
    {
        let task_id = self.task.id().to_string();
        if self.task.is_stopped() || self.task.is_terminated() {
            return Err(ConsumerError::Terminated(task_id));
        }
        if !self.registry.register(Arc::clone(&self.task)) {
            return Err(ConsumerError::AlreadyRunning(task_id));
        }

        let stop_timeout = self.config.stop_timeout();
        let task = Arc::clone(&self.task);
        let registry = Arc::clone(&self.registry);

        info!(
            task_id = %task.id(),
            client_id = %task.identity().client_id,
            topic = %task.identity().topic,
            "🚀 Starting consumer poll loop"
        );
        let join = tokio::spawn(self.run(source, processor));

        Ok(ConsumerHandle {
            task,
            registry,
            join: Mutex::new(Some(join)),
            stop_timeout,
        })
    }

    async fn run<S, P>(self, mut source: S, processor: Arc<P>)
    where
        S: PollSource,
        P: UnitProcessor,
    {
        let poll_interval = self.config.poll_interval();

        while !self.task.is_stopped() {
            match source.poll().await {
                Ok(units) => {
                    self.task.record_poll_success();
                    let idle = units.is_empty();
                    for unit in units {
                        self.dispatch(unit, processor.as_ref()).await;
                    }
                    if idle && !self.task.sleep_unless_stopped(poll_interval).await {
                        break;
                    }
                }
                Err(e) => match self.task.record_poll_failure(e) {
                    RecoveryDecision::RetryAfter(interval) => {
                        if !self.task.sleep_unless_stopped(interval).await {
                            break;
                        }
                    }
                    RecoveryDecision::GiveUp => break,
                },
            }
        }

        debug!(
            task_id = %self.task.id(),
            terminated = self.task.is_terminated(),
            "Consumer poll loop exited"
        );
    }

    async fn dispatch<P: UnitProcessor + ?Sized>(&self, mut unit: UnitOfWork, processor: &P) {
        if let Some(completion) = &self.completion {
            unit.add_synchronization(completion.clone());
        }
        // Units that arrive failed (e.g. an unreadable file) skip processing
        if !unit.is_failed() {
            if let Err(e) = processor.process(&mut unit).await {
                unit.set_error(e);
            }
        }

        let completed = unit.done().await;
        if completed.outcome() == Outcome::Failure {
            debug!(
                task_id = %self.task.id(),
                unit_id = %completed.unit().id(),
                "Unit of work completed with failure"
            );
        }
    }
}

/// Owner handle for a spawned poll loop
#[derive(Debug)]
pub struct ConsumerHandle {
    task: Arc<ConsumerTask>,
    registry: Arc<ConsumerTaskRegistry>,
    join: Mutex<Option<JoinHandle<()>>>,
    stop_timeout: std::time::Duration,
}

impl ConsumerHandle {
    pub fn task(&self) -> &Arc<ConsumerTask> {
        &self.task
    }

    /// Whether the poll loop has exited, by stop or by giving up
    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Stop polling, deregister the task and wait for the loop to exit.
    /// A second call is a no-op.
    pub async fn stop(&self) -> ConsumerResult<()> {
        self.task.stop();
        self.registry.deregister(self.task.id());

        let Some(join) = self.join.lock().take() else {
            return Ok(());
        };
        let abort = join.abort_handle();

        match tokio::time::timeout(self.stop_timeout, join).await {
            Ok(Ok(())) => {
                info!(task_id = %self.task.id(), "🛑 Consumer poll loop stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(task_id = %self.task.id(), error = %e, "Consumer poll loop panicked");
                Ok(())
            }
            Err(_) => {
                abort.abort();
                warn!(
                    task_id = %self.task.id(),
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "Consumer poll loop did not stop in time; aborted"
                );
                Err(ConsumerError::Timeout(format!(
                    "consumer task {} did not stop within {:?}",
                    self.task.id(),
                    self.stop_timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{RecoveryPolicy, TaskIdentity};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedSource {
        script: VecDeque<anyhow::Result<Vec<UnitOfWork>>>,
    }

    #[async_trait]
    impl PollSource for ScriptedSource {
        async fn poll(&mut self) -> anyhow::Result<Vec<UnitOfWork>> {
            self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct CountingProcessor {
        processed: AtomicUsize,
    }

    #[async_trait]
    impl UnitProcessor for CountingProcessor {
        async fn process(&self, _unit: &mut UnitOfWork) -> anyhow::Result<()> {
            self.processed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> ConsumerConfig {
        ConsumerConfig {
            poll_interval_ms: 10,
            stop_timeout_ms: 1000,
        }
    }

    fn task(policy: RecoveryPolicy) -> Arc<ConsumerTask> {
        Arc::new(ConsumerTask::new(TaskIdentity::new("client-1", "inbox"), policy))
    }

    #[tokio::test]
    async fn test_processes_units_and_stops_idempotently() {
        let registry = Arc::new(ConsumerTaskRegistry::new());
        let processor = Arc::new(CountingProcessor::default());
        let source = ScriptedSource {
            script: VecDeque::from([Ok(vec![UnitOfWork::new("a"), UnitOfWork::new("b")])]),
        };

        let handle = ConsumerRunner::new(task(RecoveryPolicy::default()), Arc::clone(&registry), config())
            .spawn(source, Arc::clone(&processor))
            .unwrap();
        assert_eq!(registry.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(processor.processed.load(Ordering::SeqCst), 2);
        assert!(handle.task().is_ready());

        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
        assert!(registry.is_empty());
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_gives_up_after_budget_and_stays_registered() {
        let registry = Arc::new(ConsumerTaskRegistry::new());
        let source = ScriptedSource {
            script: (0..5).map(|_| Err(anyhow::anyhow!("broker unreachable"))).collect(),
        };
        let policy = RecoveryPolicy::exponential(Duration::from_millis(1), Duration::from_millis(5))
            .with_max_attempts(3);

        let handle = ConsumerRunner::new(task(policy), Arc::clone(&registry), config())
            .spawn(source, Arc::new(CountingProcessor::default()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.task().is_terminated());
        assert!(handle.is_finished());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_same_task_cannot_run_twice() {
        let registry = Arc::new(ConsumerTaskRegistry::new());
        let shared = task(RecoveryPolicy::default());
        let source = || ScriptedSource {
            script: VecDeque::new(),
        };

        let handle = ConsumerRunner::new(Arc::clone(&shared), Arc::clone(&registry), config())
            .spawn(source(), Arc::new(CountingProcessor::default()))
            .unwrap();
        let second = ConsumerRunner::new(shared, Arc::clone(&registry), config())
            .spawn(source(), Arc::new(CountingProcessor::default()));
        assert!(matches!(second, Err(ConsumerError::AlreadyRunning(_))));

        handle.stop().await.unwrap();
    }
}
