//! # Health
//!
//! Readiness reporting for consumers. [`ConsumerHealthCheck`] turns the tasks
//! in a [`ConsumerTaskRegistry`] into a [`HealthReport`];
//! [`HealthCheckRegistry`] runs every registered check and combines them into
//! an overall verdict.

pub mod check;
pub mod registry;
pub mod report;

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub use check::{format_duration, ConsumerHealthCheck, HealthCheck};
pub use registry::ConsumerTaskRegistry;
pub use report::{HealthReport, HealthState};

/// Overall verdict across all checks of one kind
#[derive(Debug, Clone, Serialize)]
pub struct AggregateHealth {
    pub state: HealthState,
    pub checks: Vec<HealthReport>,
}

impl AggregateHealth {
    pub fn is_up(&self) -> bool {
        self.state == HealthState::Up
    }
}

#[derive(Default)]
pub struct HealthCheckRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl std::fmt::Debug for HealthCheckRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.checks.iter().map(|check| check.id()).collect();
        f.debug_struct("HealthCheckRegistry").field("checks", &ids).finish()
    }
}

impl HealthCheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn readiness(&self) -> AggregateHealth {
        self.aggregate(|check| check.is_readiness())
    }

    pub fn liveness(&self) -> AggregateHealth {
        self.aggregate(|check| check.is_liveness())
    }

    fn aggregate(&self, include: impl Fn(&dyn HealthCheck) -> bool) -> AggregateHealth {
        let checks: Vec<HealthReport> = self
            .checks
            .iter()
            .filter(|check| include(check.as_ref()))
            .map(|check| check.call())
            .collect();

        let state = if checks.iter().all(HealthReport::is_up) {
            HealthState::Up
        } else {
            HealthState::Down
        };
        debug!(checks = checks.len(), state = ?state, "Aggregated health checks");

        AggregateHealth { state, checks }
    }
}
