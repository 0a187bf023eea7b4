//! Shared fakes and builders for integration tests

#![allow(dead_code)] // Not every test binary uses every helper

pub mod fakes;
pub mod strategies;

pub use fakes::*;

use std::sync::Arc;
use std::time::Duration;
use tasker_resume::consumer::{ConsumerTask, RecoveryPolicy, TaskIdentity};

/// A consumer task with a recognizable identity
pub fn consumer_task(client_id: &str, topic: &str, policy: RecoveryPolicy) -> Arc<ConsumerTask> {
    Arc::new(ConsumerTask::new(
        TaskIdentity::new(client_id, topic)
            .with_group_id("test-group")
            .with_bootstrap_servers("localhost:9092"),
        policy,
    ))
}

/// Backoff that doubles from `base_ms` and never gives up
pub fn doubling_policy(base_ms: u64) -> RecoveryPolicy {
    RecoveryPolicy::exponential(Duration::from_millis(base_ms), Duration::from_secs(60))
}
