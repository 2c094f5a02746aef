//! Structured logging setup.
//!
//! Provides:
//! - Diagnostics on stderr, so stdout stays free for `--output json`
//! - Build-type conditional log levels
//! - Quiet mode, which turns every event off
//! - Environment variable override via PGREADY_LOG or RUST_LOG

use tracing_subscriber::EnvFilter;

use crate::error::ReadyError;

/// Logging configuration.
pub struct LogConfig {
    /// Suppress all output; only the exit status matters
    pub quiet: bool,
    /// Whether stderr is a terminal (affects ANSI colors)
    pub is_tty: bool,
    /// Optional custom log filter
    pub log_filter: Option<String>,
}

impl LogConfig {
    /// Create a new logging configuration.
    pub fn new(quiet: bool) -> Self {
        Self { quiet, is_tty: atty::is(atty::Stream::Stderr), log_filter: None }
    }

    /// Set custom log filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: LogConfig) -> Result<(), ReadyError> {
    let env_filter = build_env_filter(&config);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(config.is_tty)
        .with_target(false)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| ReadyError::internal(format!("Failed to initialize logging: {e}")))
}

/// Build the environment filter from config or defaults.
fn build_env_filter(config: &LogConfig) -> EnvFilter {
    if config.quiet {
        return EnvFilter::new("off");
    }

    // Priority: custom filter > PGREADY_LOG > RUST_LOG > default
    if let Some(filter) = config.log_filter.as_deref() {
        return EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(default_log_filter()));
    }

    EnvFilter::try_from_env("PGREADY_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Get the default log filter based on build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "info,pgready=debug,pgready_core=debug,tokio_postgres=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "info,tokio_postgres=warn"
    }
}
