//! Batching accumulator
//!
//! Producers push items from any thread; a single handler receives them as
//! batches when the buffer reaches `flush_threshold` items or when
//! `flush_interval` elapses, whichever comes first.
//!
//! # Locking
//! One mutex guards the buffer, the handler, the time trigger and the
//! lifecycle flags. Every entry point (`push`, `flush`, `close` and the
//! background thread) takes it, then calls [`Shared::deliver`], which never
//! locks. The handler therefore runs with the lock held: a slow handler
//! stalls every producer until it returns, and a handler that calls back
//! into the same accumulator deadlocks.
//!
//! The one exception is dropping the last handle from inside the handler on
//! the background thread. `Drop` sees it is running on that thread, leaves
//! the lock alone and marks the accumulator detached; the background thread
//! delivers what is left and exits once the handler returns. Producer-side
//! flushes borrow the accumulator, so their handler can never drop the last
//! handle.

use crate::core::Buffer;
use crate::hot_path::delivery::{self, panic_message, FlushTrigger};
use crate::hot_path::worker::{self, deadline_after};
use crate::infrastructure::config::AccumulatorConfig;
use crate::infrastructure::diagnostics::{DiagnosticSink, Severity, TracingSink};
use crate::infrastructure::metrics::{MetricsCollector, MetricsSnapshot};
use crate::{log_accumulator, AccumulatorError, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::Level;

type Handler<T> = Box<dyn FnMut(Vec<T>) + Send>;

/// State guarded by the accumulator lock
pub(crate) struct State<T> {
    pub(crate) buffer: Buffer<T>,
    handler: Handler<T>,
    /// When the time trigger fires next
    pub(crate) deadline: Instant,
    /// Set by `close`; rejects further pushes and flushes
    closed: bool,
    /// Tells the background thread to exit
    pub(crate) shutdown: bool,
}

/// Everything shared between the handle and the background thread
pub(crate) struct Shared<T> {
    pub(crate) state: Mutex<State<T>>,
    pub(crate) wake: Condvar,
    pub(crate) config: AccumulatorConfig,
    pub(crate) interval: Duration,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
    /// Last handle dropped on the background thread, lock not taken
    detached: AtomicBool,
    metrics: MetricsCollector,
}

impl<T> Shared<T> {
    /// Drain the whole buffer and hand it to the handler
    ///
    /// Does not lock: the caller already holds `state`. An empty buffer
    /// does not reach the handler.
    pub(crate) fn deliver(&self, state: &mut State<T>, trigger: FlushTrigger) {
        let batch = state.buffer.drain();
        if batch.is_empty() {
            return;
        }

        let items = batch.len();
        self.metrics.record_batch(trigger, items);
        log_accumulator!(Level::DEBUG, trigger = trigger.name(), items, "Delivering batch");

        if let Err(message) =
            delivery::invoke(self.config.on_handler_failure, &mut *state.handler, batch)
        {
            self.metrics.record_failure();
            self.sink.report(
                Severity::Error,
                &format!(
                    "flush handler panicked on {} flush of {} items: {}",
                    trigger, items, message
                ),
            );
        }
    }

    pub(crate) fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn signal_shutdown(&self) {
        self.state.lock().shutdown = true;
        self.wake.notify_all();
    }
}

/// Thread-safe batching accumulator
///
/// Share it between producers with `Arc<Accumulator<T>>`.
///
/// # Example
/// ```
/// use batch_accumulator::Accumulator;
/// use std::sync::mpsc;
/// use std::time::Duration;
///
/// let (tx, rx) = mpsc::channel();
/// let acc = Accumulator::new(3, Duration::from_secs(3600), move |batch: Vec<u32>| {
///     tx.send(batch).unwrap();
/// })
/// .unwrap();
///
/// acc.push(1).unwrap();
/// acc.push(2).unwrap();
/// acc.push(3).unwrap(); // reaches the threshold, flushed inline
/// assert_eq!(rx.try_recv().unwrap(), vec![1, 2, 3]);
///
/// acc.push(4).unwrap();
/// acc.close().unwrap(); // final flush, then the background thread is joined
/// assert_eq!(rx.try_recv().unwrap(), vec![4]);
/// ```
pub struct Accumulator<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Accumulator<T> {
    /// Start an accumulator with default settings besides the two triggers
    ///
    /// # Errors
    /// `AccumulatorError::Config` for a zero threshold or interval,
    /// `AccumulatorError::Spawn` if the background thread cannot start.
    pub fn new<F>(flush_threshold: usize, flush_interval: Duration, handler: F) -> Result<Self>
    where
        F: FnMut(Vec<T>) + Send + 'static,
    {
        Self::with_config(AccumulatorConfig::new(flush_threshold, flush_interval), handler)
    }

    /// Start an accumulator reporting to `tracing`
    pub fn with_config<F>(config: AccumulatorConfig, handler: F) -> Result<Self>
    where
        F: FnMut(Vec<T>) + Send + 'static,
    {
        Self::with_sink(config, handler, Arc::new(TracingSink))
    }

    /// Start an accumulator reporting exceptional conditions to `sink`
    ///
    /// The background thread is running when this returns.
    pub fn with_sink<F>(
        config: AccumulatorConfig,
        handler: F,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self>
    where
        F: FnMut(Vec<T>) + Send + 'static,
    {
        config.validate()?;

        let interval = config.interval();
        let state = State {
            buffer: Buffer::with_capacity(config.drain_order, config.flush_threshold.min(1024)),
            handler: Box::new(handler),
            deadline: deadline_after(Instant::now(), interval),
            closed: false,
            shutdown: false,
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            wake: Condvar::new(),
            config,
            interval,
            sink,
            detached: AtomicBool::new(false),
            metrics: MetricsCollector::new(),
        });

        let handle = worker::spawn(Arc::clone(&shared))?;

        log_accumulator!(
            Level::INFO,
            flush_threshold = shared.config.flush_threshold,
            flush_interval_ms = shared.config.flush_interval_ms,
            reset_after_push = shared.config.reset_after_push,
            drain_order = shared.config.drain_order.name(),
            "Accumulator started"
        );

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Add an item
    ///
    /// Flushes inline, on the calling thread, when the buffer reaches the
    /// threshold. With `reset_after_push`, the next time-based flush is
    /// rescheduled one interval from now.
    ///
    /// # Errors
    /// `AccumulatorError::Closed` after `close`; the item is dropped.
    pub fn push(&self, item: T) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(AccumulatorError::Closed);
        }

        state.buffer.push(item);
        self.shared.metrics.record_push();

        if state.buffer.len() >= self.shared.config.flush_threshold {
            self.shared.deliver(&mut state, FlushTrigger::Size);
        }

        if self.shared.config.reset_after_push {
            state.deadline = deadline_after(Instant::now(), self.shared.interval);
        }

        Ok(())
    }

    /// Deliver everything buffered now
    ///
    /// No-op on an empty buffer. Does not move the time trigger.
    ///
    /// # Errors
    /// `AccumulatorError::Closed` after `close`.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(AccumulatorError::Closed);
        }

        self.shared.deliver(&mut state, FlushTrigger::Manual);
        Ok(())
    }

    /// Final flush, then stop and join the background thread
    ///
    /// # Errors
    /// `AccumulatorError::Closed` if already closed.
    /// `AccumulatorError::BackgroundTaskFailed` if the background thread had
    /// died from a propagated handler panic; the final flush still ran.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(AccumulatorError::Closed);
            }
            state.closed = true;
            state.shutdown = true;
            self.shared.deliver(&mut state, FlushTrigger::Close);
        }
        self.shared.wake.notify_all();

        let result = self.join_worker();
        log_accumulator!(
            Level::INFO,
            items_delivered = self.shared.metrics.snapshot().items_delivered,
            "Accumulator closed"
        );
        result
    }

    fn join_worker(&self) -> Result<()> {
        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };

        handle.join().map_err(|payload| {
            let message = panic_message(payload.as_ref());
            AccumulatorError::BackgroundTaskFailed(message)
        })
    }

    /// Items currently buffered
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    fn on_worker_thread(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }
}

impl<T: Send + 'static> Drop for Accumulator<T> {
    fn drop(&mut self) {
        if self.on_worker_thread() {
            // The background thread holds the lock while its handler runs.
            self.shared.detached.store(true, Ordering::Release);
            log_accumulator!(Level::DEBUG, "Accumulator dropped from its flush handler");
            return;
        }

        if thread::panicking() {
            // No handler calls while unwinding; just let the thread exit.
            self.shared.signal_shutdown();
            return;
        }

        match self.close() {
            Ok(()) | Err(AccumulatorError::Closed) => {}
            Err(e) => log_accumulator!(Level::WARN, "Accumulator dropped: {}", e),
        }
        self.shared.signal_shutdown();
        let _ = self.join_worker();
    }
}

impl<T: Send + 'static> fmt::Debug for Accumulator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("config", &self.shared.config)
            .field("metrics", &self.shared.metrics.snapshot())
            .finish()
    }
}
