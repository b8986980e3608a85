//! Diagnostic sinks
//!
//! The accumulator reports exceptional conditions (handler panics, a dead
//! background thread) through a [`DiagnosticSink`]. Nothing in the flush
//! path depends on what the sink does with them.

use crate::infrastructure::console::LogEntry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Severity of a diagnostic, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Test,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Test => "TEST",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of `(severity, message)` reports
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, severity: Severity, message: &str);
}

/// Forwards reports to `tracing` under the `accumulator` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Critical | Severity::Error => {
                tracing::error!(target: "accumulator", severity = severity.as_str(), "{}", message)
            }
            Severity::Warning => tracing::warn!(target: "accumulator", "{}", message),
            Severity::Info => tracing::info!(target: "accumulator", "{}", message),
            Severity::Debug | Severity::Test => {
                tracing::debug!(target: "accumulator", severity = severity.as_str(), "{}", message)
            }
        }
    }
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _severity: Severity, _message: &str) {}
}

/// Renders reports as console log entries into a writer
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    prefix: String,
    max_level: Severity,
    colorized: bool,
}

impl ConsoleSink {
    /// Sink writing to `writer`, reporting everything up to `max_level`
    pub fn new<W: Write + Send + 'static>(writer: W, max_level: Severity) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            prefix: String::new(),
            max_level,
            colorized: false,
        }
    }

    /// Colorized sink on stderr
    pub fn stderr(max_level: Severity) -> Self {
        Self::new(std::io::stderr(), max_level).colorized(true)
    }

    /// Text placed before the severity inside the brackets
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn colorized(mut self, colorized: bool) -> Self {
        self.colorized = colorized;
        self
    }

    /// Whether a report at `severity` would be written
    #[inline]
    pub fn enabled(&self, severity: Severity) -> bool {
        severity <= self.max_level
    }

    /// Write a prepared entry, including its trace frames
    pub fn write_entry(&self, entry: &LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        let rendered = entry.render(&self.prefix, self.colorized);
        let mut writer = self.writer.lock();
        // A sink has nowhere to report its own write failures.
        let _ = writer.write_all(rendered.as_bytes());
        let _ = writer.flush();
    }
}

impl DiagnosticSink for ConsoleSink {
    fn report(&self, severity: Severity, message: &str) {
        if self.enabled(severity) {
            self.write_entry(&LogEntry::untraced(severity, message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SharedWriter;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical < Severity::Error);
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Debug < Severity::Test);
        assert_eq!(Severity::Warning.to_string(), "WARNING");
    }

    #[test]
    fn test_console_sink_filters_by_level() {
        let out = SharedWriter::default();
        let sink = ConsoleSink::new(out.clone(), Severity::Warning).with_prefix("acc:");

        sink.report(Severity::Error, "handler failed");
        sink.report(Severity::Info, "not shown");

        let text = out.contents();
        assert!(text.contains("[ acc:ERROR ] - handler failed"));
        assert!(!text.contains("not shown"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_console_sink_writes_trace() {
        let out = SharedWriter::default();
        let sink = ConsoleSink::new(out.clone(), Severity::Test);

        sink.write_entry(&LogEntry::new(Severity::Critical, "worker died"));

        let text = out.contents();
        assert!(text.contains("worker died"));
        assert!(text.contains("Stacktrace:"));
        assert!(text.contains("diagnostics.rs"));
    }

    #[test]
    fn test_null_and_tracing_sinks_accept_reports() {
        NullSink.report(Severity::Critical, "ignored");
        TracingSink.report(Severity::Debug, "to tracing");
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsoleSink>();
        assert_send_sync::<TracingSink>();
    }
}
