//! # Diagnostic events emitted by the runtime.
//!
//! [`DiagKind`] classifies what the runtime observed: worker lifecycle, state
//! transitions, timer fires, and shutdown progress. [`DiagEvent`] carries the
//! metadata (timestamps, ids, reasons).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for diagnostic ordering.
static DIAG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of diagnostic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    /// A worker loop started cycling.
    ///
    /// Sets: `reason` (worker name), `at`, `seq`.
    WorkerStarted,

    /// A worker loop observed its stop token and returned cleanly.
    ///
    /// Sets: `reason` (worker name), `at`, `seq`.
    WorkerStopped,

    /// A worker loop terminated with an error.
    ///
    /// Sets: `reason` (worker name + error label), `at`, `seq`.
    WorkerFailed,

    /// The state machine transitioned between states.
    ///
    /// Sets: `state` (new active id), `prev_state`, `at`, `seq`.
    StateChanged,

    /// The state machine reported `MachineNotInitialized` this cycle.
    ///
    /// Sets: `state` (first unready id), `at`, `seq`.
    MachineStalled,

    /// A software timer elapsed and its event was dispatched.
    ///
    /// Sets: `event_id`, `at`, `seq`.
    TimerFired,

    /// Shutdown requested (OS signal or explicit stop).
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    ///
    /// Sets: `at`, `seq`.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets: `reason` (stuck worker names), `at`, `seq`.
    GraceExceeded,
}

/// Diagnostic event with optional metadata.
#[derive(Clone, Debug)]
pub struct DiagEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: DiagKind,
    /// State id, if applicable.
    pub state: Option<usize>,
    /// Previously active state id, for transitions.
    pub prev_state: Option<usize>,
    /// Event/timer id, if applicable.
    pub event_id: Option<usize>,
    /// Human-readable detail (worker names, error labels).
    pub reason: Option<Arc<str>>,
}

impl DiagEvent {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: DiagKind) -> Self {
        Self {
            seq: DIAG_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            state: None,
            prev_state: None,
            event_id: None,
            reason: None,
        }
    }

    /// Attaches a state id.
    #[inline]
    pub fn with_state(mut self, id: usize) -> Self {
        self.state = Some(id);
        self
    }

    /// Attaches the previously active state id.
    #[inline]
    pub fn with_prev_state(mut self, id: usize) -> Self {
        self.prev_state = Some(id);
        self
    }

    /// Attaches an event/timer id.
    #[inline]
    pub fn with_event_id(mut self, id: usize) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = DiagEvent::new(DiagKind::WorkerStarted);
        let b = DiagEvent::new(DiagKind::WorkerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_attach_metadata() {
        let ev = DiagEvent::new(DiagKind::StateChanged)
            .with_state(2)
            .with_prev_state(1)
            .with_reason("transition");
        assert_eq!(ev.state, Some(2));
        assert_eq!(ev.prev_state, Some(1));
        assert_eq!(ev.reason.as_deref(), Some("transition"));
    }
}
