//! Background flush thread
//!
//! Owns no state of its own: it shares the accumulator's lock and sleeps on
//! its condition variable until the time trigger expires or it is woken for
//! shutdown. Size-triggered flushes normally happen inline in `push`; the
//! size check here only catches what a push left behind.

use crate::hot_path::accumulator::Shared;
use crate::hot_path::FlushTrigger;
use crate::infrastructure::diagnostics::Severity;
use crate::log_accumulator;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::Level;

/// Start the background thread for `shared`
pub(crate) fn spawn<T: Send + 'static>(shared: Arc<Shared<T>>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(shared.config.thread_name.clone())
        .spawn(move || run(&shared))
}

/// `Running` until the shutdown flag is seen or the last handle was dropped
/// by the handler on this thread, then `Terminated`
fn run<T>(shared: &Shared<T>) {
    let _exit = ExitGuard { shared };
    let mut state = shared.state.lock();

    log_accumulator!(Level::DEBUG, "Background flush thread started");

    loop {
        if shared.is_detached() {
            shared.deliver(&mut state, FlushTrigger::Close);
            break;
        }

        if state.shutdown {
            break;
        }

        if Instant::now() >= state.deadline {
            shared.deliver(&mut state, FlushTrigger::Interval);
            state.deadline = next_deadline(state.deadline, Instant::now(), shared.interval);
            continue;
        }

        // Safety net: `push` normally drains at the threshold before unlocking.
        if state.buffer.len() >= shared.config.flush_threshold {
            shared.deliver(&mut state, FlushTrigger::Size);
            continue;
        }

        let deadline = state.deadline;
        shared.wake.wait_until(&mut state, deadline);
    }

    log_accumulator!(Level::DEBUG, "Background flush thread stopped");
}

/// Next tick after `previous`, re-armed from `now` if the thread fell behind
fn next_deadline(previous: Instant, now: Instant, interval: Duration) -> Instant {
    match previous.checked_add(interval) {
        Some(next) if next > now => next,
        _ => deadline_after(now, interval),
    }
}

/// `now + interval`, saturating far in the future
pub(crate) fn deadline_after(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Reports a background thread killed by a propagated handler panic
struct ExitGuard<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Drop for ExitGuard<'_, T> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.sink.report(
                Severity::Critical,
                "background flush thread terminated by a handler panic; \
                 time-based flushing is disabled",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_deadline_keeps_cadence() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);

        let next = next_deadline(start, start + Duration::from_millis(5), interval);
        assert_eq!(next, start + interval);
    }

    #[test]
    fn test_next_deadline_rearms_when_behind() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let late = start + Duration::from_millis(350);

        assert_eq!(next_deadline(start, late, interval), late + interval);
    }

    #[test]
    fn test_deadline_after_saturates() {
        let now = Instant::now();
        assert!(deadline_after(now, Duration::MAX) > now);
        assert_eq!(deadline_after(now, Duration::from_secs(1)), now + Duration::from_secs(1));
    }
}
