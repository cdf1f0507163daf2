//! # Register store: the only shared state between the two workers.
//!
//! Three parallel typed slot arrays (integer, text, float) plus a parallel
//! clear-on-read flag array, all indexed by event id. Producer code (the queue
//! worker dispatching callables) writes results here; consumer code (state
//! functions on the machine worker) polls them, and vice versa for arguments.
//!
//! ## Rules
//! - One `Mutex` covers the whole store, not one per slot. Contention is low:
//!   by convention each slot has exactly one producer and one consumer role.
//! - A read either clears the slot to the type's zero value or leaves it
//!   untouched, deterministically based on the stored clear flag.
//! - Out-of-range reads are no-ops returning the type default; out-of-range
//!   writes return [`RuntimeError::InvalidIndex`].
//!
//! ## Example
//! ```
//! use beatcore::RegisterStore;
//!
//! let regs = RegisterStore::new(4);
//! regs.set_int(0, 120, true).unwrap();
//! assert_eq!(regs.get_int(0), 120); // clear-on-read
//! assert_eq!(regs.get_int(0), 0);
//! ```

use std::sync::{Mutex, MutexGuard};

use crate::error::RuntimeError;
use crate::events::EventId;

struct Slots {
    ints: Vec<i64>,
    texts: Vec<String>,
    floats: Vec<f64>,
    clear: Vec<bool>,
}

/// Fixed-size typed register arrays with clear-on-read semantics.
pub struct RegisterStore {
    inner: Mutex<Slots>,
}

impl RegisterStore {
    /// Creates a store with `slots` entries per typed array, all zeroed,
    /// clear flags unset.
    pub fn new(slots: usize) -> Self {
        Self {
            inner: Mutex::new(Slots {
                ints: vec![0; slots],
                texts: vec![String::new(); slots],
                floats: vec![0.0; slots],
                clear: vec![false; slots],
            }),
        }
    }

    /// Number of slots per typed array.
    pub fn len(&self) -> usize {
        self.lock().clear.len()
    }

    /// True if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panicked holder cannot leave a slot half-written (each slot is one
    // value), so poisoning is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reads the integer slot at `id`.
    ///
    /// Clears the slot to `0` after the read if its clear flag is set.
    /// Out-of-range ids return `0`.
    pub fn get_int(&self, id: EventId) -> i64 {
        let mut s = self.lock();
        match s.ints.get(id).copied() {
            Some(v) => {
                if s.clear[id] {
                    s.ints[id] = 0;
                }
                v
            }
            None => 0,
        }
    }

    /// Reads the text slot at `id`.
    ///
    /// Clears the slot to the empty string after the read if its clear flag
    /// is set. Out-of-range ids return an empty string.
    pub fn get_text(&self, id: EventId) -> String {
        let mut s = self.lock();
        match s.texts.get(id).cloned() {
            Some(v) => {
                if s.clear[id] {
                    s.texts[id] = String::new();
                }
                v
            }
            None => String::new(),
        }
    }

    /// Reads the float slot at `id`.
    ///
    /// Clears the slot to `0.0` after the read if its clear flag is set.
    /// Out-of-range ids return `0.0`.
    pub fn get_float(&self, id: EventId) -> f64 {
        let mut s = self.lock();
        match s.floats.get(id).copied() {
            Some(v) => {
                if s.clear[id] {
                    s.floats[id] = 0.0;
                }
                v
            }
            None => 0.0,
        }
    }

    /// Writes `value` and the clear flag into the integer slot at `id`.
    pub fn set_int(&self, id: EventId, value: i64, clear: bool) -> Result<(), RuntimeError> {
        let mut s = self.lock();
        let len = s.ints.len();
        match s.ints.get_mut(id) {
            Some(slot) => {
                *slot = value;
                s.clear[id] = clear;
                Ok(())
            }
            None => Err(RuntimeError::InvalidIndex { id, len }),
        }
    }

    /// Writes `value` and the clear flag into the text slot at `id`.
    pub fn set_text(
        &self,
        id: EventId,
        value: impl Into<String>,
        clear: bool,
    ) -> Result<(), RuntimeError> {
        let mut s = self.lock();
        let len = s.texts.len();
        match s.texts.get_mut(id) {
            Some(slot) => {
                *slot = value.into();
                s.clear[id] = clear;
                Ok(())
            }
            None => Err(RuntimeError::InvalidIndex { id, len }),
        }
    }

    /// Writes `value` and the clear flag into the float slot at `id`.
    pub fn set_float(&self, id: EventId, value: f64, clear: bool) -> Result<(), RuntimeError> {
        let mut s = self.lock();
        let len = s.floats.len();
        match s.floats.get_mut(id) {
            Some(slot) => {
                *slot = value;
                s.clear[id] = clear;
                Ok(())
            }
            None => Err(RuntimeError::InvalidIndex { id, len }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_on_read_returns_once() {
        let regs = RegisterStore::new(2);
        regs.set_int(0, 42, true).unwrap();
        assert_eq!(regs.get_int(0), 42);
        assert_eq!(regs.get_int(0), 0);
        assert_eq!(regs.get_int(0), 0);
    }

    #[test]
    fn test_sticky_read_without_clear() {
        let regs = RegisterStore::new(2);
        regs.set_int(1, 7, false).unwrap();
        assert_eq!(regs.get_int(1), 7);
        assert_eq!(regs.get_int(1), 7);
    }

    #[test]
    fn test_clear_flag_set_per_write() {
        let regs = RegisterStore::new(1);
        regs.set_float(0, 1.5, false).unwrap();
        assert_eq!(regs.get_float(0), 1.5);
        assert_eq!(regs.get_float(0), 1.5);
        regs.set_float(0, 2.5, true).unwrap();
        assert_eq!(regs.get_float(0), 2.5);
        assert_eq!(regs.get_float(0), 0.0);
    }

    #[test]
    fn test_text_clear_on_read() {
        let regs = RegisterStore::new(1);
        regs.set_text(0, "128 bpm", true).unwrap();
        assert_eq!(regs.get_text(0), "128 bpm");
        assert_eq!(regs.get_text(0), "");
    }

    #[test]
    fn test_out_of_range_read_is_default() {
        let regs = RegisterStore::new(1);
        assert_eq!(regs.get_int(9), 0);
        assert_eq!(regs.get_float(9), 0.0);
        assert_eq!(regs.get_text(9), "");
    }

    #[test]
    fn test_out_of_range_write_fails() {
        let regs = RegisterStore::new(3);
        assert_eq!(
            regs.set_int(3, 1, false),
            Err(RuntimeError::InvalidIndex { id: 3, len: 3 })
        );
    }
}
