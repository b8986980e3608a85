//! Delivery metrics
//!
//! Lock-free counters updated by the accumulator on every push and delivery.
//! Snapshots are plain copies for inspection and tests.

use crate::hot_path::FlushTrigger;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Accumulator metrics collector
pub struct MetricsCollector {
    /// Items accepted by push
    items_pushed: CachePadded<AtomicU64>,
    /// Items handed to the handler (including failed invocations)
    items_delivered: CachePadded<AtomicU64>,
    /// Handler invocations
    batches_delivered: AtomicU64,
    /// Deliveries per trigger
    size_flushes: AtomicU64,
    interval_flushes: AtomicU64,
    manual_flushes: AtomicU64,
    close_flushes: AtomicU64,
    /// Handler invocations that panicked
    handler_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_pushed: u64,
    pub items_delivered: u64,
    pub batches_delivered: u64,
    pub size_flushes: u64,
    pub interval_flushes: u64,
    pub manual_flushes: u64,
    pub close_flushes: u64,
    pub handler_failures: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Items pushed but not yet delivered
    pub fn pending(&self) -> u64 {
        self.items_pushed.saturating_sub(self.items_delivered)
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            items_pushed: CachePadded::new(AtomicU64::new(0)),
            items_delivered: CachePadded::new(AtomicU64::new(0)),
            batches_delivered: AtomicU64::new(0),
            size_flushes: AtomicU64::new(0),
            interval_flushes: AtomicU64::new(0),
            manual_flushes: AtomicU64::new(0),
            close_flushes: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_push(&self) {
        self.items_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one handler invocation with `items` items
    #[inline]
    pub fn record_batch(&self, trigger: FlushTrigger, items: usize) {
        self.items_delivered.fetch_add(items as u64, Ordering::Relaxed);
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        let counter = match trigger {
            FlushTrigger::Size => &self.size_flushes,
            FlushTrigger::Interval => &self.interval_flushes,
            FlushTrigger::Manual => &self.manual_flushes,
            FlushTrigger::Close => &self.close_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_pushed: self.items_pushed.load(Ordering::Relaxed),
            items_delivered: self.items_delivered.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            size_flushes: self.size_flushes.load(Ordering::Relaxed),
            interval_flushes: self.interval_flushes.load(Ordering::Relaxed),
            manual_flushes: self.manual_flushes.load(Ordering::Relaxed),
            close_flushes: self.close_flushes.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
