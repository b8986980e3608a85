//! Hot path - every push and flush goes through here
//!
//! - Accumulator: buffer, lock and the push/flush/close entry points
//! - Worker: background thread driving time-based flushes
//! - Delivery: handler invocation and failure policy

pub mod accumulator;
pub mod delivery;
mod worker;

pub use accumulator::Accumulator;
pub use delivery::{FlushTrigger, HandlerFailurePolicy};
