//! Error types used by the beatcore runtime.
//!
//! All failures are represented by one flat [`RuntimeError`] enum rather than
//! layered error types: the runtime's two worker loops report errors through
//! their join handles, and a single flat code keeps that channel simple.
//!
//! The taxonomy follows the runtime's error-handling contract:
//!
//! - *binding errors* (`NullCallback`, `BindMismatch`) — reported once at
//!   start-up; start-up aborts.
//! - *capacity errors* (`QueueFull`, `QueueEmpty`) — recoverable back-pressure
//!   signals; callers may retry or drop.
//! - *range errors* (`InvalidIndex`, `InvalidIdNumber`) — start-up miswiring;
//!   reads treat them as logged no-ops, writes return them.
//! - *not-initialized errors* (`MachineNotInitialized`) — persistent, reported
//!   every cycle until fixed.
//! - *lifecycle errors* (`WorkerPanicked`, `GraceExceeded`) — terminal worker
//!   and shutdown outcomes.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the beatcore runtime.
///
/// Worker loops terminate on the first non-recoverable variant they hit; the
/// terminal value is retrievable exactly once by joining the worker's handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A `None` callback was handed to a slot that requires a callable.
    #[error("null callback")]
    NullCallback,

    /// A callable's shape does not accept the argument bound with it.
    #[error("callable shape {shape} does not accept argument {arg}")]
    BindMismatch {
        /// Name of the callable shape.
        shape: &'static str,
        /// Name of the offending argument variant.
        arg: &'static str,
    },

    /// The event queue is full; the push did not enter the queue.
    ///
    /// This is back-pressure, not corruption: queue indices are untouched and
    /// the caller may retry or drop the event.
    #[error("event queue full")]
    QueueFull,

    /// The event queue is empty; nothing to pop.
    #[error("event queue empty")]
    QueueEmpty,

    /// A slot index is outside a fixed array (registers, timer bank).
    #[error("index {id} out of range (len {len})")]
    InvalidIndex {
        /// Offending index.
        id: usize,
        /// Size of the indexed structure.
        len: usize,
    },

    /// A state id is outside the machine's state table.
    #[error("state id {id} out of range (table size {len})")]
    InvalidIdNumber {
        /// Offending state id.
        id: usize,
        /// Number of states in the table.
        len: usize,
    },

    /// A shape/argument mismatch surfaced at dispatch time.
    ///
    /// Bind-time validation makes this unreachable for table-built events;
    /// seeing it means an event was constructed outside the builder.
    #[error("dispatch shape mismatch for {shape}")]
    ShapeMismatch {
        /// Name of the callable shape.
        shape: &'static str,
    },

    /// The machine was asked to execute before every state became ready.
    ///
    /// Re-reported every cycle until the missing loop function is bound.
    #[error("state machine not initialized: state {state} has no loop function")]
    MachineNotInitialized {
        /// First state found unready.
        state: usize,
    },

    /// A transition fired but neither the request nor the exit function
    /// named the next state.
    #[error("state {state} exited without defining a next state id")]
    NextIdNotDefined {
        /// State whose exit ran.
        state: usize,
    },

    /// A worker loop panicked; observed when joining its handle.
    #[error("worker '{worker}' panicked")]
    WorkerPanicked {
        /// Worker name.
        worker: &'static str,
    },

    /// Graceful shutdown exceeded its grace period; some workers were stuck.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of workers that did not stop in time.
        stuck: Vec<&'static str>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use beatcore::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::QueueFull.as_label(), "queue_full");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NullCallback => "null_callback",
            RuntimeError::BindMismatch { .. } => "bind_mismatch",
            RuntimeError::QueueFull => "queue_full",
            RuntimeError::QueueEmpty => "queue_empty",
            RuntimeError::InvalidIndex { .. } => "invalid_index",
            RuntimeError::InvalidIdNumber { .. } => "invalid_id_number",
            RuntimeError::ShapeMismatch { .. } => "shape_mismatch",
            RuntimeError::MachineNotInitialized { .. } => "machine_not_initialized",
            RuntimeError::NextIdNotDefined { .. } => "next_id_not_defined",
            RuntimeError::WorkerPanicked { .. } => "worker_panicked",
            RuntimeError::GraceExceeded { .. } => "grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Indicates whether the error is a back-pressure signal rather than a
    /// fault.
    ///
    /// Returns `true` for [`RuntimeError::QueueFull`] and
    /// [`RuntimeError::QueueEmpty`]; callers should treat those as "try again
    /// later", not as failures.
    pub fn is_backpressure(&self) -> bool {
        matches!(self, RuntimeError::QueueFull | RuntimeError::QueueEmpty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(RuntimeError::NullCallback.as_label(), "null_callback");
        assert_eq!(
            RuntimeError::MachineNotInitialized { state: 2 }.as_label(),
            "machine_not_initialized"
        );
        assert_eq!(
            RuntimeError::InvalidIdNumber { id: 9, len: 3 }.as_label(),
            "invalid_id_number"
        );
    }

    #[test]
    fn test_backpressure_classification() {
        assert!(RuntimeError::QueueFull.is_backpressure());
        assert!(RuntimeError::QueueEmpty.is_backpressure());
        assert!(!RuntimeError::NullCallback.is_backpressure());
        assert!(!RuntimeError::NextIdNotDefined { state: 0 }.is_backpressure());
    }

    #[test]
    fn test_messages_carry_detail() {
        let err = RuntimeError::InvalidIndex { id: 40, len: 32 };
        assert!(err.as_message().contains("40"));
        assert!(err.as_message().contains("32"));
    }
}
