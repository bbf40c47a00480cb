//! Logging setup
//!
//! Logs go to stderr through `tracing-subscriber`. `RUST_LOG`, when set,
//! takes precedence over the level passed on the command line.

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Build the filter from `RUST_LOG` or the given default level.
pub fn build_filter(
    default_level: &str,
    env_override: Option<&str>,
) -> Result<EnvFilter, LoggingError> {
    let filter = match env_override {
        Some(value) if !value.trim().is_empty() => value,
        _ => default_level,
    };
    EnvFilter::try_new(filter).map_err(|e| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber.
pub fn init_logging(default_level: &str) -> Result<(), LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(default_level, env.as_deref())?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}
