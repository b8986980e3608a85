//! Accumulator configuration
//!
//! Immutable once an accumulator is built. Can be loaded from a TOML file;
//! every field has a default so partial files are accepted.

use crate::core::DrainOrder;
use crate::hot_path::HandlerFailurePolicy;
use crate::AccumulatorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Accumulator configuration
///
/// ```toml
/// flush_threshold = 500
/// flush_interval_ms = 250
/// reset_after_push = true
/// drain_order = "fifo"
/// on_handler_failure = "supervise"
/// thread_name = "events"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccumulatorConfig {
    /// Item count that triggers a flush
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Time trigger in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Restart the time trigger on every push
    #[serde(default)]
    pub reset_after_push: bool,

    /// Order of items inside a delivered batch
    #[serde(default)]
    pub drain_order: DrainOrder,

    /// What happens when the flush handler panics
    #[serde(default)]
    pub on_handler_failure: HandlerFailurePolicy,

    /// Name of the background flush thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            flush_threshold: default_flush_threshold(),
            flush_interval_ms: default_flush_interval_ms(),
            reset_after_push: false,
            drain_order: DrainOrder::default(),
            on_handler_failure: HandlerFailurePolicy::default(),
            thread_name: default_thread_name(),
        }
    }
}

fn default_flush_threshold() -> usize {
    100
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_thread_name() -> String {
    "accumulator".to_string()
}

impl AccumulatorConfig {
    /// Configuration with the given triggers and defaults elsewhere
    ///
    /// The interval is stored in whole milliseconds.
    pub fn new(flush_threshold: usize, flush_interval: Duration) -> Self {
        Self {
            flush_threshold,
            flush_interval_ms: 0,
            ..Self::default()
        }
        .flush_interval(flush_interval)
    }

    /// Set the time trigger
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        // Round a non-zero sub-millisecond interval up so it stays valid.
        let ms = interval.as_millis();
        self.flush_interval_ms = if ms == 0 && !interval.is_zero() {
            1
        } else {
            u64::try_from(ms).unwrap_or(u64::MAX)
        };
        self
    }

    pub fn reset_after_push(mut self, reset: bool) -> Self {
        self.reset_after_push = reset;
        self
    }

    pub fn drain_order(mut self, order: DrainOrder) -> Self {
        self.drain_order = order;
        self
    }

    pub fn on_handler_failure(mut self, policy: HandlerFailurePolicy) -> Self {
        self.on_handler_failure = policy;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Time trigger as a `Duration`
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Reject non-positive triggers
    ///
    /// # Errors
    /// Returns `AccumulatorError::Config` if the threshold or the interval is zero.
    pub fn validate(&self) -> Result<(), AccumulatorError> {
        if self.flush_threshold == 0 {
            return Err(AccumulatorError::Config(
                "flush_threshold must be positive".to_string(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(AccumulatorError::Config(
                "flush_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from accumulator.toml
    ///
    /// The path can be overridden with `ACCUMULATOR_CONFIG`.
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("ACCUMULATOR_CONFIG")
            .unwrap_or_else(|_| "accumulator.toml".to_string());

        match Self::from_path(&config_path) {
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Read and parse a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_toml_str(&contents)
    }

    /// Parse TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) => None,
        }
    }
}

impl From<ConfigError> for AccumulatorError {
    fn from(e: ConfigError) -> Self {
        AccumulatorError::Config(e.to_string())
    }
}
