#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Resume
//!
//! Resumable consumption and consumer recovery for polling pipelines.
//!
//! ## Overview
//!
//! A consumer polls a transport (a broker partition, a directory, ...) and
//! hands each record to a processing pipeline as a [`UnitOfWork`]. This crate
//! provides the two pieces that make such consumers restartable and
//! observable:
//!
//! - **Offset tracking**: when a unit completes successfully, the
//!   [`ResumableCompletion`] hook records its [`Resumable`] position through a
//!   pluggable resume strategy, so a restarted consumer picks up where it left
//!   off. Failed units never advance the offset.
//! - **Recovery and readiness**: each polling loop owns a [`ConsumerTask`] that
//!   moves between ready, recovering (exponential backoff) and terminated.
//!   [`ConsumerHealthCheck`] folds the tasks of a route into one readiness
//!   verdict.
//!
//! ## Module Organization
//!
//! - [`offset`] - Addressable, Offset and Resumable value types
//! - [`strategy`] - Resume strategy contracts and reference strategies
//! - [`unit_of_work`] - Pipeline boundary and completion hooks
//! - [`completion`] - The resumable completion hook
//! - [`consumer`] - Recovery state machine, poll loop and directory source
//! - [`health`] - Readiness checks and aggregation
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_resume::config::ConfigManager;
//! use tasker_resume::consumer::{ConsumerRunner, ConsumerTask, DirectorySource, TaskIdentity};
//! use tasker_resume::health::{ConsumerHealthCheck, ConsumerTaskRegistry};
//! use tasker_resume::{ConfiguredStrategy, ResumableCompletion};
//! # use tasker_resume::consumer::UnitProcessor;
//! # struct Print;
//! # #[async_trait::async_trait]
//! # impl UnitProcessor for Print {
//! #     async fn process(&self, _unit: &mut tasker_resume::UnitOfWork) -> anyhow::Result<()> { Ok(()) }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! tasker_resume::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let strategy = ConfiguredStrategy::from_config(&config.strategy)?;
//! strategy.start().await?;
//!
//! let registry = Arc::new(ConsumerTaskRegistry::new());
//! let task = Arc::new(ConsumerTask::new(
//!     TaskIdentity::new("inbox-reader", "/var/spool/inbox"),
//!     config.backoff.recovery_policy(),
//! ));
//! let completion = Arc::new(ResumableCompletion::new(
//!     strategy.clone(),
//!     config.completion.logging_level,
//! ));
//!
//! let source = DirectorySource::new("/var/spool/inbox").with_configured_strategy(&strategy);
//! let handle = ConsumerRunner::new(task, Arc::clone(&registry), config.consumer.clone())
//!     .with_completion(completion)
//!     .spawn(source, Arc::new(Print))?;
//!
//! let readiness = ConsumerHealthCheck::new("inbox", Arc::clone(&registry));
//! println!("{}", serde_json::to_string(&readiness.check(&registry.tasks()))?);
//!
//! handle.stop().await?;
//! strategy.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod constants;
pub mod consumer;
pub mod error;
pub mod health;
pub mod logging;
pub mod offset;
pub mod strategy;
pub mod unit_of_work;

pub use completion::ResumableCompletion;
pub use config::{ConfigManager, ResumeConfig};
pub use consumer::{ConsumerTask, RecoveryPolicy, TaskIdentity};
pub use error::{ConsumerError, ConsumerResult, ResumeError, ResumeResult};
pub use health::{ConsumerHealthCheck, ConsumerTaskRegistry, HealthCheck, HealthReport};
pub use offset::{Addressable, Offset, OffsetValue, Resumable};
pub use strategy::{
    ConfiguredStrategy, ResumeStrategy, SetResumeStrategy, StrategyCapabilities,
    UpdatableResumeStrategy,
};
pub use unit_of_work::{Synchronization, UnitOfWork};
