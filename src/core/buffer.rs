//! Item buffer held between flushes
//!
//! Not synchronized. The accumulator owns it behind its lock and is the
//! only caller. Removal order is fixed per buffer by [`DrainOrder`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Order in which buffered items leave the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrainOrder {
    /// Arrival order: the oldest item is removed first
    #[default]
    Fifo,
    /// Stack order: the most recently pushed item is removed first
    Lifo,
}

impl DrainOrder {
    pub fn name(&self) -> &'static str {
        match self {
            DrainOrder::Fifo => "fifo",
            DrainOrder::Lifo => "lifo",
        }
    }
}

/// Ordered container of pending items
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    items: VecDeque<T>,
    order: DrainOrder,
}

impl<T> Buffer<T> {
    /// Create an empty buffer with the given removal order
    pub fn new(order: DrainOrder) -> Self {
        Self {
            items: VecDeque::new(),
            order,
        }
    }

    /// Create an empty buffer with room for `capacity` items
    pub fn with_capacity(order: DrainOrder, capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            order,
        }
    }

    /// Append an item
    #[inline]
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Remove the next item according to the drain order
    ///
    /// Returns `None` once the buffer is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        match self.order {
            DrainOrder::Fifo => self.items.pop_front(),
            DrainOrder::Lifo => self.items.pop_back(),
        }
    }

    /// Remove every item, returned in removal order
    pub fn drain(&mut self) -> Vec<T> {
        match self.order {
            DrainOrder::Fifo => self.items.drain(..).collect(),
            DrainOrder::Lifo => self.items.drain(..).rev().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn order(&self) -> DrainOrder {
        self.order
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::new(DrainOrder::default())
    }
}
