//! # Resume Configuration System
//!
//! Configuration for offset tracking, completion logging, consumer recovery and
//! readiness checks. Values are layered from a base TOML file, an optional
//! environment-specific override file, and `TASKER_RESUME__*` environment
//! variables (see [`ConfigManager`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasker_resume::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let policy = manager.config().backoff.recovery_policy();
//! let level = manager.config().completion.logging_level;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::consumer::RecoveryPolicy;
use crate::logging::LoggingLevel;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResumeConfig {
    pub backoff: BackoffConfig,
    pub completion: CompletionConfig,
    pub consumer: ConsumerConfig,
    pub health: HealthConfig,
    pub strategy: StrategyConfig,
}

impl ResumeConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        self.backoff.validate()?;
        self.consumer.validate()?;
        self.strategy.validate()?;
        Ok(())
    }
}

/// Recovery backoff for consumer tasks
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_interval_ms: u64,
    pub backoff_multiplier: f64,
    pub max_interval_ms: u64,
    /// Consecutive failures after which a task gives up
    pub max_attempts: Option<u32>,
    /// Time spent recovering after which a task gives up
    pub max_elapsed_ms: Option<u64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 1000,
            backoff_multiplier: 2.0,
            max_interval_ms: 60_000,
            max_attempts: None,
            max_elapsed_ms: None,
        }
    }
}

impl BackoffConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    /// Build the recovery policy consumer tasks run with
    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            base_interval: self.base_interval(),
            multiplier: self.backoff_multiplier,
            max_interval: self.max_interval(),
            max_attempts: self.max_attempts,
            max_elapsed: self.max_elapsed_ms.map(Duration::from_millis),
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.base_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "backoff.base_interval_ms",
                "0",
                "Base recovery interval must be greater than zero",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "backoff.backoff_multiplier",
                self.backoff_multiplier.to_string(),
                "Multiplier must be a finite value of at least 1.0",
            ));
        }
        if self.max_interval_ms < self.base_interval_ms {
            return Err(ConfigurationError::invalid_value(
                "backoff.max_interval_ms",
                self.max_interval_ms.to_string(),
                format!(
                    "Maximum interval must not be below the base interval ({}ms)",
                    self.base_interval_ms
                ),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "backoff.max_attempts",
                "0",
                "Omit max_attempts to retry without a count limit",
            ));
        }
        Ok(())
    }
}

/// Completion handler settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Level used to report skipped offset updates when DEBUG is disabled
    pub logging_level: LoggingLevel,
}

/// Poll loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Delay between polls that returned no work
    pub poll_interval_ms: u64,
    /// How long `stop` waits for the poll loop to exit
    pub stop_timeout_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            stop_timeout_ms: 5000,
        }
    }
}

impl ConsumerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.stop_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "consumer.stop_timeout_ms",
                "0",
                "Stop timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Readiness check settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    /// Attach the consecutive failure count to down reports
    pub include_failure_count: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_failure_count: false,
        }
    }
}

/// Which resume strategy backs a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Memory,
    File,
    ProcessedSet,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Offset file, required for the `file` strategy
    pub file_path: Option<PathBuf>,
}

impl StrategyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.kind == StrategyKind::File && self.file_path.is_none() {
            return Err(ConfigurationError::invalid_value(
                "strategy.file_path",
                "<unset>",
                "The file strategy requires an offset file path",
            ));
        }
        Ok(())
    }
}
