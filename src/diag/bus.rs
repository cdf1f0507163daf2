//! # Broadcast bus for diagnostic events.
//!
//! [`DiagBus`] is a thin wrapper around [`tokio::sync::broadcast`] providing
//! non-blocking publishing from multiple sources (both workers and the
//! runtime shell).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: one ring buffer stores recent events for all
//!   receivers; slow receivers observe `RecvError::Lagged(n)` and skip the
//!   `n` oldest items.
//! - **No persistence**: events are dropped if no receiver is subscribed at
//!   send time.

use tokio::sync::broadcast;

use super::event::DiagEvent;

/// Broadcast channel for diagnostic events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct DiagBus {
    tx: broadcast::Sender<DiagEvent>,
}

impl DiagBus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<DiagEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped; publishing still
    /// returns immediately.
    pub fn publish(&self, ev: DiagEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates an independent receiver observing subsequent events only.
    pub fn subscribe(&self) -> broadcast::Receiver<DiagEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::event::DiagKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = DiagBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(DiagEvent::new(DiagKind::TimerFired).with_event_id(3));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, DiagKind::TimerFired);
        assert_eq!(ev.event_id, Some(3));
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = DiagBus::new(1);
        bus.publish(DiagEvent::new(DiagKind::ShutdownRequested));
    }
}
