//! Logging setup for the sink
//!
//! One place decides where tracing output goes so the daemon and any test
//! harness configure it the same way.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output
    Development,
    /// Verbose diagnostics with source locations
    Debug,
}

impl LoggingMode {
    /// Parse a mode name as used in `A2DP_SINK_LOG_MODE`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(LoggingMode::Silent),
            "development" => Some(LoggingMode::Development),
            "debug" => Some(LoggingMode::Debug),
            _ => None,
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),

    #[error("Invalid log filter '{0}'")]
    InvalidFilter(String),
}

/// Initialize logging with the specified mode
///
/// `default_filter` applies when neither `A2DP_SINK_LOG_LEVEL` nor `RUST_LOG`
/// is set.
///
/// # Environment Variables
///
/// - `A2DP_SINK_LOG_LEVEL`: filter directive (error, warn, info, debug, trace,
///   or a full `EnvFilter` expression such as `sink_state=trace`)
/// - `RUST_LOG`: used when `A2DP_SINK_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode, default_filter: &str) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = create_env_filter(default_filter)?;

            Registry::default()
                .with(fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact())
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let filter = create_env_filter(default_filter)?;

            Registry::default()
                .with(fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true))
                .with(filter)
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Read `A2DP_SINK_LOG_MODE`, if set
pub fn mode_from_env() -> Result<Option<LoggingMode>, LoggingError> {
    match std::env::var("A2DP_SINK_LOG_MODE") {
        Ok(value) => LoggingMode::from_name(&value)
            .map(Some)
            .ok_or_else(|| LoggingError::InvalidEnv(format!("A2DP_SINK_LOG_MODE={}", value))),
        Err(_) => Ok(None),
    }
}

/// Initialize logging from the environment
///
/// The mode comes from `A2DP_SINK_LOG_MODE` (silent, development, debug) and
/// defaults to development; a service is expected to log.
pub fn init_logging_from_env(default_filter: &str) -> Result<(), LoggingError> {
    let mode = mode_from_env()?.unwrap_or(LoggingMode::Development);
    init_logging(mode, default_filter)
}

/// Check a filter given as `--log-level` or `A2DP_SINK_LOG_LEVEL`
///
/// A bare word must be a level name (or `off`); a bare word would otherwise
/// parse as a target name. Anything with `=` or `,` must be a valid
/// `EnvFilter` expression.
pub fn validate_filter(filter: &str) -> Result<(), LoggingError> {
    let filter = filter.trim();
    let valid = if filter.contains('=') || filter.contains(',') {
        EnvFilter::try_new(filter).is_ok()
    } else {
        matches!(
            filter.to_ascii_lowercase().as_str(),
            "off" | "error" | "warn" | "info" | "debug" | "trace"
        )
    };

    if valid {
        Ok(())
    } else {
        Err(LoggingError::InvalidFilter(filter.to_string()))
    }
}

/// Build the filter: `A2DP_SINK_LOG_LEVEL`, then `RUST_LOG`, then the default
fn create_env_filter(default_filter: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(level) = std::env::var("A2DP_SINK_LOG_LEVEL") {
        EnvFilter::try_new(&level)
            .map_err(|_| LoggingError::InvalidEnv(format!("A2DP_SINK_LOG_LEVEL={}", level)))
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::try_new(&rust_log)
            .map_err(|_| LoggingError::InvalidEnv(format!("RUST_LOG={}", rust_log)))
    } else {
        EnvFilter::try_new(default_filter)
            .map_err(|_| LoggingError::InvalidFilter(default_filter.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent, "info").is_ok());
    }

    #[rstest]
    #[case("silent", Some(LoggingMode::Silent))]
    #[case("Development", Some(LoggingMode::Development))]
    #[case(" debug ", Some(LoggingMode::Debug))]
    #[case("verbose", None)]
    fn test_mode_from_name(#[case] name: &str, #[case] expected: Option<LoggingMode>) {
        assert_eq!(LoggingMode::from_name(name), expected);
    }

    #[rstest]
    #[case("info", true)]
    #[case("TRACE", true)]
    #[case("off", true)]
    #[case("sink_state=trace", true)]
    #[case("warn,sink_state=debug,zbus=error", true)]
    #[case("loud", false)]
    #[case("sink_state=loud", false)]
    #[case("", false)]
    fn test_validate_filter(#[case] filter: &str, #[case] valid: bool) {
        assert_eq!(validate_filter(filter).is_ok(), valid);
    }
}
