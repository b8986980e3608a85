//! Core data types
//!
//! - Buffer: unsynchronized item container with an explicit drain order

pub mod buffer;

pub use buffer::{Buffer, DrainOrder};
