//! Infrastructure - cold path only
//!
//! This module contains code outside the flush path:
//! - Configuration management
//! - Metrics
//! - Logging setup and diagnostic sinks
//! - Console formatting helpers

pub mod config;
pub mod console;
pub mod diagnostics;
pub mod logging;
pub mod metrics;
pub mod truncate;

pub use config::{AccumulatorConfig, ConfigError};
pub use diagnostics::{ConsoleSink, DiagnosticSink, NullSink, Severity, TracingSink};
pub use metrics::{MetricsCollector, MetricsSnapshot};
