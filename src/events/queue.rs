//! # Bounded FIFO event queue.
//!
//! A fixed-capacity circular buffer of pending [`Event`]s that the queue
//! worker drains continuously. Created once at start-up; never resized.
//!
//! ## Rules
//! - One `Mutex` covers the buffer and both indices; push and pop never
//!   overlap partially.
//! - `is_full` holds iff the last push left `write_index == read_index`;
//!   `is_empty` holds iff the last pop did and no push occurred since.
//! - A failed push is not ordered: it simply never enters the queue. Callers
//!   treat [`RuntimeError::QueueFull`] as back-pressure and may retry or drop.
//! - Successful pushes are popped in strict FIFO order.

use std::sync::{Mutex, MutexGuard};

use crate::error::RuntimeError;
use crate::events::event::Event;

struct Ring {
    slots: Vec<Option<Event>>,
    read_index: usize,
    write_index: usize,
    full: bool,
    empty: bool,
}

/// Fixed-capacity circular buffer of pending events.
pub struct EventQueue {
    inner: Mutex<Ring>,
}

impl EventQueue {
    /// Creates a queue with the given capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                slots: vec![None; capacity],
                read_index: 0,
                write_index: 0,
                full: false,
                empty: true,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copies `event` into the queue.
    ///
    /// Fails with [`RuntimeError::QueueFull`] if the full condition holds;
    /// the indices and flags are left untouched in that case.
    pub fn push(&self, event: Event) -> Result<(), RuntimeError> {
        let mut q = self.lock();
        if q.full {
            return Err(RuntimeError::QueueFull);
        }
        let w = q.write_index;
        q.slots[w] = Some(event);
        q.write_index = (w + 1) % q.slots.len();
        q.empty = false;
        q.full = q.write_index == q.read_index;
        Ok(())
    }

    /// Removes and returns the oldest queued event.
    ///
    /// Fails with [`RuntimeError::QueueEmpty`] if the empty condition holds.
    pub fn pop(&self) -> Result<Event, RuntimeError> {
        let mut q = self.lock();
        if q.empty {
            return Err(RuntimeError::QueueEmpty);
        }
        let r = q.read_index;
        // The slot between read and write is always occupied.
        let event = q.slots[r].take().ok_or(RuntimeError::QueueEmpty)?;
        q.read_index = (r + 1) % q.slots.len();
        q.full = false;
        q.empty = q.read_index == q.write_index;
        Ok(event)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        let q = self.lock();
        if q.full {
            q.slots.len()
        } else {
            (q.write_index + q.slots.len() - q.read_index) % q.slots.len()
        }
    }

    /// True if the queue holds no events.
    pub fn is_empty(&self) -> bool {
        self.lock().empty
    }

    /// True if a push would fail.
    pub fn is_full(&self) -> bool {
        self.lock().full
    }

    /// The fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }
}
