//! # Well-Known Keys
//!
//! Metadata keys shared between the pipeline, the completion handler and the
//! health checks. Keeping them in one place keeps producers and consumers of
//! unit-of-work metadata in agreement.

/// Unit-of-work metadata keys
pub mod headers {
    /// Key under which the pipeline attaches the [`crate::offset::Resumable`]
    pub const OFFSET: &str = "resume.offset";
    /// File name of a unit produced by a directory source
    pub const FILE_NAME: &str = "file.name";
    /// Absolute path of a unit produced by a directory source
    pub const FILE_PATH: &str = "file.path";
    /// File size in bytes
    pub const FILE_LENGTH: &str = "file.length";
}

/// Health report detail keys
pub mod details {
    pub const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
    pub const CLIENT_ID: &str = "client.id";
    pub const GROUP_ID: &str = "group.id";
    pub const ROUTE_ID: &str = "route.id";
    pub const TOPIC: &str = "topic";
    pub const FAILURE_COUNT: &str = "failure.count";
}

/// Health check group for consumer readiness checks
pub const HEALTH_CHECK_GROUP: &str = "tasker";
