//! Logging setup for applications embedding the accumulator
//!
//! The library only emits `tracing` events (target `accumulator`). Binaries
//! and tests that want to see them call [`init_logging`] once:
//! - console output, filtered by `RUST_LOG` (default `info`)
//! - optional JSON file log in `<directory>/accumulator.<date>`, rotated daily

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging options
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Directory for the rolling file log; console only when `None`
    pub directory: Option<PathBuf>,
    /// Use ANSI colors on the console
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            directory: None,
            ansi: true,
        }
    }
}

/// Initialize the global subscriber
///
/// Returns the guards of the non-blocking file writers; they must be kept
/// alive for the duration of the program or buffered lines are lost.
/// # Errors
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(options: &LoggingOptions) -> io::Result<Vec<WorkerGuard>> {
    let mut guards = Vec::new();

    let file_layer = match &options.directory {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let (appender, guard) = create_appender(dir, "accumulator");
            guards.push(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .json(),
            )
        }
        None => None,
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(options.ansi)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    tracing::info!(target: "accumulator", "Logging system initialized");

    Ok(guards)
}

/// Create a daily rolling file appender
fn create_appender(dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);

    tracing_appender::non_blocking(appender)
}

/// Log under the accumulator target
#[macro_export]
macro_rules! log_accumulator {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "accumulator", $level, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LoggingOptions::default();
        assert_eq!(options.default_filter, "info");
        assert!(options.directory.is_none());
        assert!(options.ansi);
    }

    #[test]
    fn test_init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let options = LoggingOptions {
            directory: Some(logs.clone()),
            ansi: false,
            ..LoggingOptions::default()
        };

        // Another test may already own the global subscriber; the
        // directory is created before installation either way.
        let _guards = init_logging(&options);
        assert!(logs.exists());
    }
}
