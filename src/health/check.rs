//! # Consumer Readiness Check
//!
//! Aggregates the recovery state of a route's consumer tasks into one
//! readiness verdict. The check is a pure function of current task state:
//! it performs no I/O and reads each task through a single snapshot.

use std::sync::Arc;
use std::time::Duration;

use super::registry::ConsumerTaskRegistry;
use super::report::HealthReport;
use crate::config::HealthConfig;
use crate::constants::{details, HEALTH_CHECK_GROUP};
use crate::consumer::ConsumerTask;

/// A named health check that can be polled by a readiness or liveness probe
pub trait HealthCheck: Send + Sync {
    fn id(&self) -> &str;

    fn group(&self) -> &str {
        HEALTH_CHECK_GROUP
    }

    fn is_readiness(&self) -> bool {
        true
    }

    fn is_liveness(&self) -> bool {
        true
    }

    fn call(&self) -> HealthReport;
}

/// Readiness check over the consumer tasks of one route
#[derive(Debug, Clone)]
pub struct ConsumerHealthCheck {
    id: String,
    route_id: Option<String>,
    registry: Arc<ConsumerTaskRegistry>,
    include_failure_count: bool,
}

impl ConsumerHealthCheck {
    pub fn new(route_id: impl Into<String>, registry: Arc<ConsumerTaskRegistry>) -> Self {
        let route_id = route_id.into();
        Self {
            id: format!("consumer-{route_id}"),
            route_id: Some(route_id),
            registry,
            include_failure_count: false,
        }
    }

    /// Check for tasks that belong to no route; reports carry no route id
    pub fn without_route(id: impl Into<String>, registry: Arc<ConsumerTaskRegistry>) -> Self {
        Self {
            id: id.into(),
            route_id: None,
            registry,
            include_failure_count: false,
        }
    }

    /// `None` when readiness checks are disabled in configuration
    pub fn from_config(
        route_id: impl Into<String>,
        registry: Arc<ConsumerTaskRegistry>,
        config: &HealthConfig,
    ) -> Option<Self> {
        config.enabled.then(|| {
            Self::new(route_id, registry).with_failure_count(config.include_failure_count)
        })
    }

    pub fn with_failure_count(mut self, include: bool) -> Self {
        self.include_failure_count = include;
        self
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    /// Verdict over `tasks` in order; the first task that is not ready decides
    pub fn check(&self, tasks: &[Arc<ConsumerTask>]) -> HealthReport {
        for task in tasks {
            let snapshot = task.snapshot();
            if snapshot.is_ready() {
                continue;
            }

            let mut message = String::from("Consumer is not ready");
            if snapshot.is_terminated() {
                message.push_str(
                    " (gave up recovering and terminated the consumer; restart route or application to recover).",
                );
            } else if let Some(interval) = snapshot.current_recovery_interval() {
                message.push_str(&format!(
                    " (recovery in progress using {} intervals).",
                    format_duration(interval)
                ));
            }

            let identity = task.identity();
            let mut report = HealthReport::down(&self.id)
                .message(message)
                .error(snapshot.last_error().cloned())
                .detail(details::BOOTSTRAP_SERVERS, &identity.bootstrap_servers)
                .detail(details::CLIENT_ID, &identity.client_id)
                .detail(details::TOPIC, &identity.topic);
            if let Some(group_id) = &identity.group_id {
                report = report.detail(details::GROUP_ID, group_id);
            }
            if let Some(route_id) = &self.route_id {
                report = report.detail(details::ROUTE_ID, route_id);
            }
            if self.include_failure_count {
                report = report.detail(details::FAILURE_COUNT, snapshot.failure_count());
            }
            return report;
        }

        HealthReport::up(&self.id)
    }
}

impl HealthCheck for ConsumerHealthCheck {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_liveness(&self) -> bool {
        false
    }

    fn call(&self) -> HealthReport {
        self.check(&self.registry.tasks())
    }
}

/// Compact human readable duration: `250ms`, `1s`, `2m30s`, `1h5m`
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        return format!("{total_ms}ms");
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    out
}
