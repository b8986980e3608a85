//! Handler invocation and failure policy

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// Buffer reached the flush threshold
    Size,
    /// Flush interval elapsed
    Interval,
    /// Explicit `flush()` call
    Manual,
    /// Final flush performed by `close()`
    Close,
}

impl FlushTrigger {
    pub fn name(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Interval => "interval",
            FlushTrigger::Manual => "manual",
            FlushTrigger::Close => "close",
        }
    }
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a panicking flush handler is treated
///
/// The batch passed to a failing handler is never redelivered, whatever the
/// policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerFailurePolicy {
    /// Catch the panic, report it to the diagnostic sink and keep going.
    /// The background thread survives and time-based flushing continues.
    #[default]
    Supervise,
    /// Let the panic unwind on whichever thread ran the flush.
    ///
    /// From `push` it surfaces on the producer. From the background thread
    /// it terminates that thread for good: no more time-based flushes, while
    /// size-triggered flushes inside `push` keep working.
    Propagate,
}

/// Run the handler on one batch under `policy`
///
/// Returns the panic message when a supervised handler panicked.
pub(crate) fn invoke<T>(
    policy: HandlerFailurePolicy,
    handler: &mut (dyn FnMut(Vec<T>) + Send),
    batch: Vec<T>,
) -> Result<(), String> {
    match policy {
        HandlerFailurePolicy::Propagate => {
            handler(batch);
            Ok(())
        }
        HandlerFailurePolicy::Supervise => {
            panic::catch_unwind(AssertUnwindSafe(|| handler(batch)))
                .map_err(|payload| panic_message(payload.as_ref()))
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervised_panic_is_caught() {
        let mut handler = |batch: Vec<u32>| {
            if batch.len() > 1 {
                panic!("too many: {}", batch.len());
            }
        };

        assert!(invoke(HandlerFailurePolicy::Supervise, &mut handler, vec![1]).is_ok());
        let err = invoke(HandlerFailurePolicy::Supervise, &mut handler, vec![1, 2]).unwrap_err();
        assert_eq!(err, "too many: 2");
    }

    #[test]
    fn test_propagated_panic_unwinds() {
        let result = panic::catch_unwind(|| {
            let mut handler = |batch: Vec<u32>| assert!(batch.is_empty(), "boom");
            let _ = invoke(HandlerFailurePolicy::Propagate, &mut handler, vec![1]);
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_panic_message_payloads() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7u8);

        assert_eq!(panic_message(static_str.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_names() {
        assert_eq!(FlushTrigger::Interval.to_string(), "interval");
        assert_eq!(HandlerFailurePolicy::default(), HandlerFailurePolicy::Supervise);
    }
}
