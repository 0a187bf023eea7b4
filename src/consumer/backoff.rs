//! # Recovery Backoff Policy
//!
//! Exponential backoff with a cap and an optional retry budget. The budget can
//! be a count of consecutive failures, a cumulative time spent recovering, or
//! both (whichever is exhausted first).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a consumer task backs off and when it gives up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    /// Interval after the first failure
    pub base_interval: Duration,
    /// Growth factor applied per additional failure
    pub multiplier: f64,
    /// Upper bound for any single interval
    pub max_interval: Duration,
    /// Consecutive failures at which the task terminates
    pub max_attempts: Option<u32>,
    /// Time since the first failure of a streak at which the task terminates
    pub max_elapsed: Option<Duration>,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1), Duration::from_secs(60))
    }
}

impl RecoveryPolicy {
    /// Doubling backoff from `base_interval` up to `max_interval`, retrying forever
    pub fn exponential(base_interval: Duration, max_interval: Duration) -> Self {
        Self {
            base_interval,
            multiplier: 2.0,
            max_interval,
            max_attempts: None,
            max_elapsed: None,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    /// Interval to wait after the given failure (1-based), capped at `max_interval`
    pub fn interval_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_interval.as_secs_f64() * self.multiplier.powi(exponent);

        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }

    /// Whether `attempts` consecutive failures spanning `elapsed` exhaust the budget
    pub fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        let by_count = self.max_attempts.is_some_and(|max| attempts >= max);
        let by_time = self.max_elapsed.is_some_and(|max| elapsed >= max);
        by_count || by_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_double_from_base() {
        let policy = RecoveryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(policy.interval_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.interval_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.interval_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_intervals_are_capped() {
        let policy = RecoveryPolicy::exponential(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(policy.interval_for_attempt(5), Duration::from_secs(10));
        assert_eq!(policy.interval_for_attempt(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_budget_by_attempts() {
        let policy = RecoveryPolicy::default().with_max_attempts(3);
        assert!(!policy.is_exhausted(2, Duration::ZERO));
        assert!(policy.is_exhausted(3, Duration::ZERO));
        assert!(policy.is_exhausted(4, Duration::ZERO));
    }

    #[test]
    fn test_budget_by_elapsed_time() {
        let policy = RecoveryPolicy::default().with_max_elapsed(Duration::from_secs(30));
        assert!(!policy.is_exhausted(100, Duration::from_secs(29)));
        assert!(policy.is_exhausted(1, Duration::from_secs(30)));
    }

    #[test]
    fn test_unbounded_policy_never_exhausts() {
        let policy = RecoveryPolicy::default();
        assert!(!policy.is_exhausted(u32::MAX, Duration::from_secs(86_400)));
    }
}
