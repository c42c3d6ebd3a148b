//! File logging for the CLI
//!
//! Stdout carries results, so log events go to a daily rolling JSON file and,
//! with `--verbose`, to stderr as well.

use gitsecureops_common::logging::env_filter;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

const LOG_FILE_PREFIX: &str = "gitsecureops.log";

/// Writer guards; logs are flushed when these drop
pub struct LogGuards {
    _file: WorkerGuard,
    _stderr: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// # Errors
/// Returns an error if the log directory cannot be created
pub fn init(log_dir: &Path, level: &str, verbose: bool) -> std::io::Result<LogGuards> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter(level));

    let (stderr_layer, stderr_guard) = if verbose {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_filter(env_filter(level));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    if tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Subscriber already installed; keeping it");
    }

    Ok(LogGuards {
        _file: file_guard,
        _stderr: stderr_guard,
    })
}

/// Default log directory for this platform
pub fn default_log_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map_or_else(
            || PathBuf::from("logs"),
            |local| PathBuf::from(local).join("gitsecureops").join("logs"),
        )
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map_or_else(
            || PathBuf::from("logs"),
            |home| home.join("Library").join("Logs").join("gitsecureops"),
        )
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let system_log_dir = Path::new("/var/log/gitsecureops");
        if system_log_dir.exists() && is_writable(system_log_dir) {
            system_log_dir.to_path_buf()
        } else if let Some(data_dir) = dirs::data_dir() {
            data_dir.join("gitsecureops").join("logs")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".gitsecureops").join("logs")
        } else {
            PathBuf::from("logs")
        }
    }
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn is_writable(path: &Path) -> bool {
    tempfile::tempfile_in(path).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_log_dir_is_namespaced() {
        let dir = default_log_dir();
        assert!(
            dir.components()
                .any(|part| part.as_os_str() == "gitsecureops")
                || dir == Path::new("logs")
        );
    }

    #[test]
    fn init_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let log_dir = root.path().join("nested").join("logs");

        let guards = init(&log_dir, "info", false).unwrap();

        assert!(log_dir.is_dir());
        drop(guards);
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    #[test]
    fn temp_directory_is_writable() {
        let root = tempfile::tempdir().unwrap();
        assert!(is_writable(root.path()));
        assert!(!is_writable(&root.path().join("missing")));
    }
}
