//! # Events and the process-wide event table.
//!
//! An [`Event`] is a value naming a callable, its (at most one) argument, and
//! an identity used for result look-up in the
//! [`RegisterStore`](crate::RegisterStore). Events are built once at start-up
//! into an [`EventTable`] and copied by value into the queue on each send; the
//! table entry lives for the process lifetime.
//!
//! Identity assignment is an explicit arena: [`EventTableBuilder`] hands out
//! sequential ids, plain events first, then timer events in one contiguous
//! range (the builder's typestate enforces the split — call
//! [`EventTableBuilder::timers`] once all plain events are registered).
//!
//! ## Example
//! ```
//! use beatcore::{Callable, EventTableBuilder};
//! use std::time::Duration;
//!
//! let mut b = EventTableBuilder::new();
//! let read_bpm = b.event(Callable::float_out(|| 128.0)).unwrap();
//! let mut b = b.timers();
//! let blink = b.timer(Callable::no_arg(|| {}), Duration::from_millis(500)).unwrap();
//! let table = b.finish();
//!
//! assert_eq!(read_bpm, 0);
//! assert_eq!(blink, 1);
//! assert_eq!(table.first_timer_id(), 1);
//! ```

use std::time::Duration;

use crate::error::RuntimeError;
use crate::events::callable::{ArgValue, Callable, RetValue};
use crate::registers::RegisterStore;
use crate::timers::Timer;

/// Identity of an event: index into the event table and the register store.
pub type EventId = usize;

/// A bound callable with its carried argument and register identity.
///
/// Immutable after construction; an `Event` value existing implies its
/// shape/argument binding was validated by the builder.
#[derive(Clone, Debug)]
pub struct Event {
    id: EventId,
    callable: Callable,
    arg: ArgValue,
    clear_on_read: bool,
}

impl Event {
    fn bind(
        id: EventId,
        callable: Callable,
        arg: ArgValue,
        clear_on_read: bool,
    ) -> Result<Self, RuntimeError> {
        if !callable.accepts(&arg) {
            return Err(RuntimeError::BindMismatch {
                shape: callable.shape(),
                arg: arg.as_label(),
            });
        }
        Ok(Self {
            id,
            callable,
            arg,
            clear_on_read,
        })
    }

    /// The event's register identity.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Whether the result register slot resets after one read.
    pub fn clear_on_read(&self) -> bool {
        self.clear_on_read
    }

    /// Shape name of the bound callable (for diagnostics).
    pub fn shape(&self) -> &'static str {
        self.callable.shape()
    }

    /// Invokes the bound callable and writes its result into the register
    /// slot keyed by this event's id, honoring the clear-on-read flag.
    ///
    /// Exactly one register slot is written per invocation, or none for the
    /// void shapes.
    pub fn dispatch(&self, regs: &RegisterStore) -> Result<(), RuntimeError> {
        match self.callable.invoke(&self.arg)? {
            RetValue::None => Ok(()),
            RetValue::Int(v) => regs.set_int(self.id, v, self.clear_on_read),
            RetValue::Float(v) => regs.set_float(self.id, v, self.clear_on_read),
            RetValue::Text(v) => regs.set_text(self.id, v, self.clear_on_read),
        }
    }
}

/// Arena builder for the plain-event section of the table.
///
/// Ids are assigned sequentially from 0 in registration order.
#[derive(Default)]
pub struct EventTableBuilder {
    events: Vec<Event>,
}

impl EventTableBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an argument-less event without clear-on-read.
    pub fn event(&mut self, callable: Callable) -> Result<EventId, RuntimeError> {
        self.event_with(callable, ArgValue::None, false)
    }

    /// Registers an event with an explicit argument and clear flag.
    ///
    /// Fails with [`RuntimeError::BindMismatch`] if the callable's shape does
    /// not accept the argument; no id is consumed in that case.
    pub fn event_with(
        &mut self,
        callable: Callable,
        arg: ArgValue,
        clear_on_read: bool,
    ) -> Result<EventId, RuntimeError> {
        let id = self.events.len();
        let ev = Event::bind(id, callable, arg, clear_on_read)?;
        self.events.push(ev);
        Ok(id)
    }

    /// Closes the plain-event section and opens the timer section.
    pub fn timers(self) -> TimerSectionBuilder {
        let first_timer_id = self.events.len();
        TimerSectionBuilder {
            events: self.events,
            first_timer_id,
            timers: Vec::new(),
        }
    }

    /// Finishes a table with no timer events.
    pub fn finish(self) -> EventTable {
        self.timers().finish()
    }
}

/// Arena builder for the timer section of the table.
///
/// Timer ids continue the plain-event sequence, forming one contiguous range
/// starting at `first_timer_id`.
pub struct TimerSectionBuilder {
    events: Vec<Event>,
    first_timer_id: EventId,
    timers: Vec<Timer>,
}

impl TimerSectionBuilder {
    /// Registers an argument-less timer event with the given duration.
    pub fn timer(
        &mut self,
        callable: Callable,
        duration: Duration,
    ) -> Result<EventId, RuntimeError> {
        self.timer_with(callable, ArgValue::None, false, duration)
    }

    /// Registers a timer event with an explicit argument and clear flag.
    pub fn timer_with(
        &mut self,
        callable: Callable,
        arg: ArgValue,
        clear_on_read: bool,
        duration: Duration,
    ) -> Result<EventId, RuntimeError> {
        let id = self.first_timer_id + self.timers.len();
        let ev = Event::bind(id, callable, arg, clear_on_read)?;
        self.timers.push(Timer::new(ev, duration));
        Ok(id)
    }

    /// Finishes the table.
    pub fn finish(self) -> EventTable {
        EventTable {
            events: self.events,
            first_timer_id: self.first_timer_id,
            timers: self.timers,
        }
    }
}

/// The process-wide table of bound events and timers.
///
/// Built once at start-up; never mutated afterwards.
pub struct EventTable {
    events: Vec<Event>,
    first_timer_id: EventId,
    timers: Vec<Timer>,
}

impl EventTable {
    /// Looks up a plain event by id (timer ids are not addressable here).
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Number of plain events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no plain events are registered.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First id of the contiguous timer range.
    pub fn first_timer_id(&self) -> EventId {
        self.first_timer_id
    }

    /// Number of registered timers.
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Total number of ids handed out (plain events + timers).
    ///
    /// The register store must have at least this many slots.
    pub fn slots(&self) -> usize {
        self.first_timer_id + self.timers.len()
    }

    pub(crate) fn take_timers(&mut self) -> Vec<Timer> {
        std::mem::take(&mut self.timers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut b = EventTableBuilder::new();
        assert_eq!(b.event(Callable::no_arg(|| {})).unwrap(), 0);
        assert_eq!(b.event(Callable::int_out(|| 1)).unwrap(), 1);
        assert_eq!(b.event(Callable::float_out(|| 2.0)).unwrap(), 2);
        let table = b.finish();
        assert_eq!(table.len(), 3);
        assert_eq!(table.slots(), 3);
    }

    #[test]
    fn test_bind_mismatch_consumes_no_id() {
        let mut b = EventTableBuilder::new();
        let err = b
            .event_with(Callable::int_in(|_| {}), ArgValue::Float(1.0), false)
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::BindMismatch {
                shape: "int_in",
                arg: "float"
            }
        );
        assert_eq!(b.event(Callable::no_arg(|| {})).unwrap(), 0);
    }

    #[test]
    fn test_timer_ids_follow_events() {
        let mut b = EventTableBuilder::new();
        b.event(Callable::no_arg(|| {})).unwrap();
        b.event(Callable::no_arg(|| {})).unwrap();
        let mut b = b.timers();
        let t0 = b
            .timer(Callable::no_arg(|| {}), Duration::from_millis(10))
            .unwrap();
        let t1 = b
            .timer(Callable::no_arg(|| {}), Duration::from_millis(20))
            .unwrap();
        let table = b.finish();
        assert_eq!((t0, t1), (2, 3));
        assert_eq!(table.first_timer_id(), 2);
        assert_eq!(table.timer_count(), 2);
        assert_eq!(table.slots(), 4);
    }

    #[test]
    fn test_dispatch_writes_one_register_slot() {
        let regs = RegisterStore::new(4);
        let mut b = EventTableBuilder::new();
        let id = b
            .event_with(Callable::int_in_int_out(|v| v + 1), ArgValue::Int(41), false)
            .unwrap();
        let table = b.finish();

        table.get(id).unwrap().dispatch(&regs).unwrap();
        assert_eq!(regs.get_int(id), 42);
        // Void shape writes nothing.
        assert_eq!(regs.get_float(id), 0.0);
        assert_eq!(regs.get_text(id), "");
    }

    #[test]
    fn test_dispatch_honors_clear_flag() {
        let regs = RegisterStore::new(2);
        let mut b = EventTableBuilder::new();
        let id = b
            .event_with(Callable::text_out(|| "tick".into()), ArgValue::None, true)
            .unwrap();
        let table = b.finish();

        table.get(id).unwrap().dispatch(&regs).unwrap();
        assert_eq!(regs.get_text(id), "tick");
        assert_eq!(regs.get_text(id), "");
    }
}
