//! # Structured Logging Module
//!
//! Environment-aware console logging built on the tracing ecosystem, plus the
//! [`LoggingLevel`] type used where a user-configured severity has to be
//! chosen at runtime (tracing levels are otherwise fixed per call site).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::{fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Severity chosen through configuration rather than at the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl Default for LoggingLevel {
    fn default() -> Self {
        LoggingLevel::Error
    }
}

impl LoggingLevel {
    /// The tracing level this maps to, `None` for `Off`
    pub fn as_tracing_level(self) -> Option<Level> {
        match self {
            LoggingLevel::Trace => Some(Level::TRACE),
            LoggingLevel::Debug => Some(Level::DEBUG),
            LoggingLevel::Info => Some(Level::INFO),
            LoggingLevel::Warn => Some(Level::WARN),
            LoggingLevel::Error => Some(Level::ERROR),
            LoggingLevel::Off => None,
        }
    }

    /// Whether the installed subscriber would record an event at this level
    pub fn is_enabled(self) -> bool {
        match self {
            LoggingLevel::Trace => tracing::enabled!(Level::TRACE),
            LoggingLevel::Debug => tracing::enabled!(Level::DEBUG),
            LoggingLevel::Info => tracing::enabled!(Level::INFO),
            LoggingLevel::Warn => tracing::enabled!(Level::WARN),
            LoggingLevel::Error => tracing::enabled!(Level::ERROR),
            LoggingLevel::Off => false,
        }
    }
}

impl fmt::Display for LoggingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoggingLevel::Trace => "trace",
            LoggingLevel::Debug => "debug",
            LoggingLevel::Info => "info",
            LoggingLevel::Warn => "warn",
            LoggingLevel::Error => "error",
            LoggingLevel::Off => "off",
        };
        f.write_str(name)
    }
}

impl FromStr for LoggingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LoggingLevel::Trace),
            "debug" => Ok(LoggingLevel::Debug),
            "info" => Ok(LoggingLevel::Info),
            "warn" | "warning" => Ok(LoggingLevel::Warn),
            "error" => Ok(LoggingLevel::Error),
            "off" => Ok(LoggingLevel::Off),
            other => Err(format!("Unknown logging level: {other}")),
        }
    }
}

/// Emit an event at a [`LoggingLevel`] picked at runtime.
///
/// ```
/// use tasker_resume::{log_at, logging::LoggingLevel};
///
/// let level = LoggingLevel::Info;
/// log_at!(level, component = "completion", "offset update skipped");
/// ```
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            $crate::logging::LoggingLevel::Trace => ::tracing::trace!($($arg)+),
            $crate::logging::LoggingLevel::Debug => ::tracing::debug!($($arg)+),
            $crate::logging::LoggingLevel::Info => ::tracing::info!($($arg)+),
            $crate::logging::LoggingLevel::Warn => ::tracing::warn!($($arg)+),
            $crate::logging::LoggingLevel::Error => ::tracing::error!($($arg)+),
            $crate::logging::LoggingLevel::Off => {}
        }
    };
}

/// Initialize console logging with environment-specific configuration.
///
/// `RUST_LOG` overrides the environment default. Setting
/// `TASKER_LOG_FORMAT=json` switches to JSON lines for log shippers.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| get_log_level(&environment));
        let json = std::env::var("TASKER_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        // Determine if we're in a TTY for ANSI color support
        let use_ansi = !json && IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = if json {
            tracing_fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            tracing_fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                json_format = json,
                "🔧 STRUCTURED LOGGING: Initialized console output"
            );
        }
    });
}

/// Get current environment from environment variables
pub(crate) fn get_environment() -> String {
    std::env::var("TASKER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
