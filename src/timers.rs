//! # Cooperative software timers.
//!
//! A [`Timer`] is an [`Event`] plus elapsed-time bookkeeping; the
//! [`TimerBank`] holds a fixed array of them, checked once per scheduler
//! cycle. An elapsed timer is disarmed and then dispatched exactly like a
//! queue event, its result value ignored. Timers are a special case of event
//! invocation triggered by time rather than by explicit push.
//!
//! ## Rules
//! - A timer with `started == false` is never evaluated for elapse.
//! - Elapsing is single-shot: it clears `started` and zeroes the bookkeeping;
//!   re-arming a fired timer requires a fresh [`TimerBank::configure`].
//! - `start` is idempotent while running: a second start does not re-capture
//!   the timestamp.
//!
//! Time comes from the [`Clock`] seam: collaborators supply a monotonic
//! microsecond clock; [`MonotonicClock`] is the production implementation and
//! tests plug in a manual one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::RuntimeError;
use crate::events::{Event, EventId};
use crate::registers::RegisterStore;

/// Monotonic microsecond clock consumed by the timer subsystem.
pub trait Clock: Send + Sync + 'static {
    /// Microseconds since a fixed reference point.
    fn now_micros(&self) -> u64;
}

/// Production clock backed by [`Instant`].
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose reference point is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// An event with elapsed-time bookkeeping.
#[derive(Clone, Debug)]
pub struct Timer {
    event: Event,
    started: bool,
    start_value: u64,
    timer_value: u64,
}

impl Timer {
    /// Wraps an event with a duration after which it is considered elapsed.
    pub fn new(event: Event, duration: Duration) -> Self {
        Self {
            event,
            started: false,
            start_value: 0,
            timer_value: duration.as_micros() as u64,
        }
    }

    /// The wrapped event's register identity.
    pub fn id(&self) -> EventId {
        self.event.id()
    }

    /// True while the timer is counting.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Remaining configured duration in microseconds (0 once elapsed).
    pub fn timer_value(&self) -> u64 {
        self.timer_value
    }
}

/// Fixed array of timer slots occupying the contiguous id range
/// `first_id .. first_id + slots`.
pub struct TimerBank {
    inner: Mutex<Vec<Option<Timer>>>,
    first_id: EventId,
    clock: Arc<dyn Clock>,
}

impl TimerBank {
    /// Creates an empty bank of `slots` timer slots starting at `first_id`.
    pub fn new(first_id: EventId, slots: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(vec![None; slots]),
            first_id,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<Timer>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, id: EventId) -> Result<usize, RuntimeError> {
        let len = self.lock().len();
        let idx = id
            .checked_sub(self.first_id)
            .ok_or(RuntimeError::InvalidIndex { id, len })?;
        if idx >= len {
            return Err(RuntimeError::InvalidIndex { id, len });
        }
        Ok(idx)
    }

    /// First id of the bank's range.
    pub fn first_id(&self) -> EventId {
        self.first_id
    }

    /// Number of timer slots.
    pub fn slots(&self) -> usize {
        self.lock().len()
    }

    /// Installs `timer` at `id - first_id`.
    ///
    /// Fails with [`RuntimeError::InvalidIndex`] if `id` is outside the timer
    /// range. Replaces any previously configured timer in that slot.
    pub fn configure(&self, id: EventId, timer: Timer) -> Result<(), RuntimeError> {
        let idx = self.slot(id)?;
        self.lock()[idx] = Some(timer);
        Ok(())
    }

    /// Starts the timer at `id`, capturing the current timestamp.
    ///
    /// Idempotent while running: an already-started timer keeps its original
    /// timestamp. Fails with [`RuntimeError::InvalidIndex`] if `id` is outside
    /// the range or the slot is unconfigured.
    pub fn start(&self, id: EventId) -> Result<(), RuntimeError> {
        let idx = self.slot(id)?;
        let now = self.clock.now_micros();
        let mut bank = self.lock();
        let len = bank.len();
        let timer = bank[idx]
            .as_mut()
            .ok_or(RuntimeError::InvalidIndex { id, len })?;
        if !timer.started {
            timer.start_value = now;
            timer.started = true;
        }
        Ok(())
    }

    /// Stops the timer at `id` without touching its bookkeeping.
    pub fn stop(&self, id: EventId) -> Result<(), RuntimeError> {
        let idx = self.slot(id)?;
        let mut bank = self.lock();
        let len = bank.len();
        let timer = bank[idx]
            .as_mut()
            .ok_or(RuntimeError::InvalidIndex { id, len })?;
        timer.started = false;
        Ok(())
    }

    /// Stops the timer at `id` and zeroes its captured timestamp.
    pub fn reset(&self, id: EventId) -> Result<(), RuntimeError> {
        let idx = self.slot(id)?;
        let mut bank = self.lock();
        let len = bank.len();
        let timer = bank[idx]
            .as_mut()
            .ok_or(RuntimeError::InvalidIndex { id, len })?;
        timer.started = false;
        timer.start_value = 0;
        Ok(())
    }

    /// True if the timer at `id` is currently counting.
    pub fn is_started(&self, id: EventId) -> bool {
        match self.slot(id) {
            Ok(idx) => self.lock()[idx].as_ref().is_some_and(|t| t.started),
            Err(_) => false,
        }
    }

    /// Evaluates every started timer and dispatches the elapsed ones.
    ///
    /// A timer elapses when `now − start_value > timer_value`. Elapsing
    /// disarms the timer (single-shot) before its event is dispatched, so a
    /// second call cannot re-dispatch it. Dispatch runs outside the bank's
    /// lock; user callables may freely call back into the bank.
    ///
    /// Returns the ids of the timers dispatched this sweep.
    pub fn handle_timers(&self, regs: &RegisterStore) -> Result<Vec<EventId>, RuntimeError> {
        let now = self.clock.now_micros();
        let mut due: Vec<Event> = Vec::new();
        {
            let mut bank = self.lock();
            for slot in bank.iter_mut() {
                let Some(timer) = slot.as_mut() else {
                    continue;
                };
                if !timer.started {
                    continue;
                }
                let elapsed = now.saturating_sub(timer.start_value);
                if elapsed > timer.timer_value {
                    timer.started = false;
                    timer.timer_value = 0;
                    timer.start_value = 0;
                    due.push(timer.event.clone());
                }
            }
        }
        let mut fired = Vec::with_capacity(due.len());
        for event in due {
            let id = event.id();
            event.dispatch(regs)?;
            fired.push(id);
        }
        Ok(fired)
    }
}
