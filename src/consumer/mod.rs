//! # Consumers
//!
//! Recovery-aware polling: [`ConsumerTask`] tracks whether a polling loop is
//! ready, recovering or terminated; [`ConsumerRunner`] drives the loop; and
//! [`DirectorySource`] is a file transport that resumes through a
//! set-resumable strategy.

pub mod backoff;
pub mod file_source;
pub mod runner;
pub mod task;

pub use backoff::RecoveryPolicy;
pub use file_source::DirectorySource;
pub use runner::{ConsumerHandle, ConsumerRunner, PollSource, UnitProcessor};
pub use task::{ConsumerTask, RecoveryDecision, TaskIdentity, TaskSnapshot};
