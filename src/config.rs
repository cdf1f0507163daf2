//! # Global runtime configuration.
//!
//! Provides [`RuntimeConfig`], the centralized settings for the beatcore
//! runtime. A single config value is handed to [`Scheduler`](crate::Scheduler)
//! and [`Runtime`](crate::Runtime) at start-up; nothing is re-read afterwards.
//!
//! ## Sentinel values
//! - `bus_capacity` is clamped to a minimum of 1 by the diag bus.
//! - `grace = 0s` → shutdown does not wait; stuck workers are reported
//!   immediately.

use std::time::Duration;

/// Global configuration for the beatcore runtime.
///
/// ## Field semantics
/// - `queue_capacity`: event queue ring size (fixed for the process lifetime)
/// - `register_slots`: register store size; must cover every event + timer id
/// - `timer_slots`: number of timer slots in the timer bank
/// - `queue_cycle`: inter-cycle sleep of the queue worker
/// - `machine_cycle`: inter-cycle sleep of the state-machine worker
/// - `bus_capacity`: diag bus ring buffer size (min 1; clamped by the bus)
/// - `grace`: maximum wait for graceful shutdown before reporting stuck workers
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Capacity of the bounded event queue.
    ///
    /// The queue is never resized; a push against a full queue returns
    /// `QueueFull` as back-pressure.
    pub queue_capacity: usize,

    /// Number of slots in the register store (per typed array).
    ///
    /// Every registered event and timer id must fit below this bound;
    /// `Scheduler::new` validates this at start-up.
    pub register_slots: usize,

    /// Number of slots in the timer bank.
    pub timer_slots: usize,

    /// Sleep between queue-worker cycles (drain queue → timers → hook).
    pub queue_cycle: Duration,

    /// Sleep between state-machine cycles.
    pub machine_cycle: Duration,

    /// Capacity of the diag bus broadcast channel ring buffer.
    ///
    /// Slow observers that lag behind more than `bus_capacity` messages
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum time to wait for workers to stop during graceful shutdown.
    pub grace: Duration,
}

impl RuntimeConfig {
    /// Returns the diag bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for RuntimeConfig {
    /// Default configuration:
    ///
    /// - `queue_capacity = 32` (the controller's historical queue size)
    /// - `register_slots = 64`
    /// - `timer_slots = 8`
    /// - `queue_cycle = 1ms`, `machine_cycle = 1ms`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            register_slots: 64,
            timer_slots: 8,
            queue_cycle: Duration::from_millis(1),
            machine_cycle: Duration::from_millis(1),
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}
