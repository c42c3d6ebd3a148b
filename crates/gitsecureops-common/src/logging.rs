//! Tracing subscriber bootstrap shared by the API server and the CLI

use tracing_subscriber::EnvFilter;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Build the env filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install a global stdout subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, or a
/// binary that set up its own writer first).
pub fn init_tracing(default_level: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(default_level));
    match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    }
}
