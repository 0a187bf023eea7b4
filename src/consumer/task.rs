//! # Consumer Task Recovery State Machine
//!
//! One [`ConsumerTask`] exists per physical polling loop. The loop reports the
//! outcome of every poll; the task turns those reports into a recovery state:
//!
//! ```text
//!   Starting ──ok──▶ Ready ◀──────ok────── Recovering ──budget spent──▶ Terminated
//!      │               │                    ▲      │
//!      └─────err───────┴───────err──────────┘      └──err (interval grows)──┐
//!                                                  ▲                        │
//!                                                  └────────────────────────┘
//! ```
//!
//! State is written only by the owning poll loop and read concurrently by
//! health checks, so every read goes through [`ConsumerTask::snapshot`], a
//! lock-protected copy that can never observe a half-applied transition.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::backoff::RecoveryPolicy;

/// Diagnostic identity of a consumer task, surfaced in health reports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub client_id: String,
    pub group_id: Option<String>,
    /// Broker or endpoint addresses the task connects to
    pub bootstrap_servers: String,
    /// Topic, directory or other source name
    pub topic: String,
}

impl TaskIdentity {
    pub fn new(client_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_bootstrap_servers(mut self, bootstrap_servers: impl Into<String>) -> Self {
        self.bootstrap_servers = bootstrap_servers.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryState {
    Starting,
    Ready,
    Recovering {
        interval: Duration,
        attempts: u32,
        since: Instant,
    },
    Terminated {
        attempts: u32,
    },
}

#[derive(Debug, Clone)]
struct TaskState {
    recovery: RecoveryState,
    last_error: Option<Arc<anyhow::Error>>,
}

/// What the poll loop should do after a failed poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Sleep for the interval, then poll again
    RetryAfter(Duration),
    /// The retry budget is spent; stop polling
    GiveUp,
}

/// Point-in-time copy of a task's recovery state
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    recovery: RecoveryState,
    last_error: Option<Arc<anyhow::Error>>,
}

impl TaskSnapshot {
    pub fn is_ready(&self) -> bool {
        matches!(self.recovery, RecoveryState::Ready)
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self.recovery, RecoveryState::Recovering { .. })
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.recovery, RecoveryState::Terminated { .. })
    }

    /// Current backoff interval, only while recovering
    pub fn current_recovery_interval(&self) -> Option<Duration> {
        match self.recovery {
            RecoveryState::Recovering { interval, .. } => Some(interval),
            _ => None,
        }
    }

    /// Consecutive failed polls in the current streak
    pub fn failure_count(&self) -> u32 {
        match self.recovery {
            RecoveryState::Recovering { attempts, .. } | RecoveryState::Terminated { attempts } => {
                attempts
            }
            RecoveryState::Starting | RecoveryState::Ready => 0,
        }
    }

    pub fn last_error(&self) -> Option<&Arc<anyhow::Error>> {
        self.last_error.as_ref()
    }
}

/// Recovery-aware state of one polling loop
#[derive(Debug)]
pub struct ConsumerTask {
    id: Uuid,
    identity: TaskIdentity,
    policy: RecoveryPolicy,
    state: RwLock<TaskState>,
    stopped: AtomicBool,
    shutdown_notify: Notify,
}

impl ConsumerTask {
    pub fn new(identity: TaskIdentity, policy: RecoveryPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            policy,
            state: RwLock::new(TaskState {
                recovery: RecoveryState::Starting,
                last_error: None,
            }),
            stopped: AtomicBool::new(false),
            shutdown_notify: Notify::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let state = self.state.read();
        TaskSnapshot {
            recovery: state.recovery,
            last_error: state.last_error.clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_ready()
    }

    pub fn is_recoverable(&self) -> bool {
        self.snapshot().is_recoverable()
    }

    pub fn is_terminated(&self) -> bool {
        self.snapshot().is_terminated()
    }

    pub fn current_recovery_interval(&self) -> Option<Duration> {
        self.snapshot().current_recovery_interval()
    }

    pub fn last_error(&self) -> Option<Arc<anyhow::Error>> {
        self.state.read().last_error.clone()
    }

    /// Record a successful poll or connect
    pub fn record_poll_success(&self) {
        let mut state = self.state.write();
        match state.recovery {
            RecoveryState::Ready => {}
            RecoveryState::Starting => {
                state.recovery = RecoveryState::Ready;
                info!(
                    task_id = %self.id,
                    client_id = %self.identity.client_id,
                    topic = %self.identity.topic,
                    "🟢 Consumer task ready"
                );
            }
            RecoveryState::Recovering { attempts, since, .. } => {
                state.recovery = RecoveryState::Ready;
                state.last_error = None;
                info!(
                    task_id = %self.id,
                    client_id = %self.identity.client_id,
                    failed_attempts = attempts,
                    recovered_after_ms = since.elapsed().as_millis() as u64,
                    "🟢 Consumer task recovered"
                );
            }
            RecoveryState::Terminated { .. } => {
                warn!(
                    task_id = %self.id,
                    "Poll success reported for a terminated consumer task; ignoring"
                );
            }
        }
    }

    /// Record a failed poll or connect and decide whether to keep trying
    pub fn record_poll_failure(&self, error: anyhow::Error) -> RecoveryDecision {
        let mut state = self.state.write();

        let (attempts, since) = match state.recovery {
            RecoveryState::Terminated { .. } => return RecoveryDecision::GiveUp,
            RecoveryState::Starting | RecoveryState::Ready => (1, Instant::now()),
            RecoveryState::Recovering { attempts, since, .. } => (attempts.saturating_add(1), since),
        };

        let error = Arc::new(error);
        state.last_error = Some(Arc::clone(&error));

        if self.policy.is_exhausted(attempts, since.elapsed()) {
            state.recovery = RecoveryState::Terminated { attempts };
            error!(
                task_id = %self.id,
                client_id = %self.identity.client_id,
                topic = %self.identity.topic,
                failed_attempts = attempts,
                error = %error,
                "🔴 Consumer task gave up recovering; restart required"
            );
            return RecoveryDecision::GiveUp;
        }

        let interval = self.policy.interval_for_attempt(attempts);
        state.recovery = RecoveryState::Recovering {
            interval,
            attempts,
            since,
        };
        warn!(
            task_id = %self.id,
            client_id = %self.identity.client_id,
            topic = %self.identity.topic,
            attempt = attempts,
            interval_ms = interval.as_millis() as u64,
            error = %error,
            "🟡 Consumer poll failed, backing off"
        );
        RecoveryDecision::RetryAfter(interval)
    }

    /// Request the poll loop to stop. Returns `false` if already requested.
    pub fn stop(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        // notify_one stores a permit, so a loop that has not started waiting yet still wakes
        self.shutdown_notify.notify_one();
        debug!(task_id = %self.id, "Consumer task stop requested");
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless the task is stopped first.
    /// Returns `true` when the full duration elapsed.
    pub async fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        if self.is_stopped() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_stopped(),
            _ = self.shutdown_notify.notified() => {
                debug!(task_id = %self.id, "Shutdown notification received during backoff wait");
                false
            }
        }
    }
}
