//! Thread-safe batching accumulator
//!
//! Buffers items pushed from any number of threads and hands them to a
//! single handler in batches, whenever a size threshold or a time interval
//! is reached.

pub mod core;
pub mod hot_path;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{Buffer, DrainOrder};
pub use hot_path::{Accumulator, FlushTrigger, HandlerFailurePolicy};
pub use infrastructure::config::AccumulatorConfig;
pub use infrastructure::diagnostics::{DiagnosticSink, Severity};

use thiserror::Error;

/// Main error type for the accumulator
#[derive(Error, Debug)]
pub enum AccumulatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Accumulator is closed")]
    Closed,

    #[error("Failed to spawn background flush thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Background flush thread failed: {0}")]
    BackgroundTaskFailed(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AccumulatorError>;
