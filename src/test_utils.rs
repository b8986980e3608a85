//! Test utilities: recording handlers and sinks
//!
//! Handlers run on whatever thread flushes, so everything here is shared
//! through `Arc<Mutex<..>>`.

use crate::infrastructure::diagnostics::{DiagnosticSink, Severity};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Collects every batch delivered to its handlers
pub struct Recorder<T> {
    batches: Arc<Mutex<Vec<Vec<T>>>>,
}

impl<T: Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Flush handler appending each batch to this recorder
    pub fn handler(&self) -> impl FnMut(Vec<T>) + Send + 'static {
        let batches = Arc::clone(&self.batches);
        move |batch| batches.lock().push(batch)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn item_count(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

impl<T: Clone> Recorder<T> {
    pub fn batches(&self) -> Vec<Vec<T>> {
        self.batches.lock().clone()
    }
}

/// Diagnostic sink keeping every report
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(Severity, String)>>,
}

impl RecordingSink {
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, severity: Severity, message: &str) {
        self.reports.lock().push((severity, message.to_string()));
    }
}

/// In-memory writer that can be inspected after being handed away
#[derive(Clone, Default)]
pub struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_counts() {
        let recorder = Recorder::new();
        let mut handler = recorder.handler();
        handler(vec![1, 2]);
        handler(vec![3]);

        assert_eq!(recorder.batch_count(), 2);
        assert_eq!(recorder.item_count(), 3);
        assert_eq!(recorder.batches(), vec![vec![1, 2], vec![3]]);
    }
}
