//! # Scheduler: the queue worker.
//!
//! The [`Scheduler`] owns the event queue, the timer bank, the
//! software-interrupt hook, and the register store. Its worker cycle is
//! strictly sequential, with no reentrancy:
//!
//! ```text
//! loop {
//!   ├─► drain queue   (pop + dispatch until QueueEmpty)
//!   ├─► handle timers (dispatch elapsed timers)
//!   ├─► interrupt hook (invoked once, if installed)
//!   └─► sleep(queue_cycle)     [stop token checked at the top]
//! }
//! ```
//!
//! The hook runs on this worker: it must not block, or it starves both the
//! queue and the timers.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RuntimeConfig;
use crate::core::worker::{Worker, WorkerHandle, spawn_worker};
use crate::diag::{DiagBus, DiagEvent, DiagKind};
use crate::error::RuntimeError;
use crate::events::{Event, EventId, EventQueue, EventTable, NoArgFn};
use crate::registers::RegisterStore;
use crate::timers::{Clock, Timer, TimerBank};

/// Queue worker: drains events, services timers, runs the interrupt hook.
pub struct Scheduler {
    queue: EventQueue,
    table: EventTable,
    timers: TimerBank,
    registers: Arc<RegisterStore>,
    hook: Mutex<Option<NoArgFn>>,
    diag: OnceLock<DiagBus>,
}

impl Scheduler {
    /// Builds the scheduler from the finished event table.
    ///
    /// Installs every table timer into the bank and validates the start-up
    /// wiring: every handed-out id must fit the register store, and the
    /// table's timers must fit `cfg.timer_slots`. A violation fails here,
    /// once, rather than surfacing mid-run.
    pub fn new(
        cfg: &RuntimeConfig,
        mut table: EventTable,
        clock: Arc<dyn Clock>,
        registers: Arc<RegisterStore>,
    ) -> Result<Arc<Self>, RuntimeError> {
        if table.slots() > registers.len() {
            return Err(RuntimeError::InvalidIndex {
                id: table.slots() - 1,
                len: registers.len(),
            });
        }
        if table.timer_count() > cfg.timer_slots {
            return Err(RuntimeError::InvalidIndex {
                id: table.first_timer_id() + table.timer_count() - 1,
                len: cfg.timer_slots,
            });
        }

        let timers = TimerBank::new(table.first_timer_id(), cfg.timer_slots, clock);
        for timer in table.take_timers() {
            timers.configure(timer.id(), timer)?;
        }

        Ok(Arc::new(Self {
            queue: EventQueue::new(cfg.queue_capacity),
            table,
            timers,
            registers,
            hook: Mutex::new(None),
            diag: OnceLock::new(),
        }))
    }

    /// Attaches the diagnostics bus (set once, by the runtime shell).
    pub fn attach_bus(&self, bus: DiagBus) {
        let _ = self.diag.set(bus);
    }

    fn publish(&self, ev: DiagEvent) {
        if let Some(bus) = self.diag.get() {
            bus.publish(ev);
        }
    }

    /// The shared register store.
    pub fn registers(&self) -> &Arc<RegisterStore> {
        &self.registers
    }

    /// Enqueues the table event with identity `id`.
    ///
    /// The table entry is copied by value into the queue. Fails with
    /// [`RuntimeError::InvalidIndex`] for an unknown id and
    /// [`RuntimeError::QueueFull`] as back-pressure.
    pub fn send(&self, id: EventId) -> Result<(), RuntimeError> {
        let event = self.table.get(id).ok_or(RuntimeError::InvalidIndex {
            id,
            len: self.table.len(),
        })?;
        self.queue.push(event.clone())
    }

    /// Enqueues an already-built event.
    pub fn push(&self, event: Event) -> Result<(), RuntimeError> {
        self.queue.push(event)
    }

    /// Removes and returns the oldest queued event.
    ///
    /// The worker cycle drains the queue itself; this is for callers that
    /// take over draining in tests or tools.
    pub fn pop(&self) -> Result<Event, RuntimeError> {
        self.queue.pop()
    }

    /// Number of pending events.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// True if a `send`/`push` would fail with `QueueFull`.
    pub fn is_queue_full(&self) -> bool {
        self.queue.is_full()
    }

    /// Installs a fresh timer at `id` (see [`TimerBank::configure`]).
    pub fn configure_timer(&self, id: EventId, timer: Timer) -> Result<(), RuntimeError> {
        self.timers.configure(id, timer)
    }

    /// Starts the timer at `id` (idempotent while running).
    pub fn start_timer(&self, id: EventId) -> Result<(), RuntimeError> {
        self.timers.start(id)
    }

    /// Stops the timer at `id`.
    pub fn stop_timer(&self, id: EventId) -> Result<(), RuntimeError> {
        self.timers.stop(id)
    }

    /// Stops the timer at `id` and zeroes its captured timestamp.
    pub fn reset_timer(&self, id: EventId) -> Result<(), RuntimeError> {
        self.timers.reset(id)
    }

    /// True if the timer at `id` is currently counting.
    pub fn is_timer_started(&self, id: EventId) -> bool {
        self.timers.is_started(id)
    }

    /// Installs the software-interrupt hook, replacing any previous one.
    ///
    /// The hook is invoked once per scheduler cycle, unconditionally and
    /// synchronously, after the queue and timers are serviced. It must not
    /// block. A `None` callback fails with [`RuntimeError::NullCallback`].
    pub fn set_software_interrupt(&self, callback: Option<NoArgFn>) -> Result<(), RuntimeError> {
        let callback = callback.ok_or(RuntimeError::NullCallback)?;
        *self.hook.lock().unwrap_or_else(|e| e.into_inner()) = Some(callback);
        Ok(())
    }

    /// Spawns the scheduler's driver loop on its own worker.
    pub fn start(self: &Arc<Self>, period: Duration) -> WorkerHandle {
        spawn_worker(Arc::clone(self) as Arc<dyn Worker>, period)
    }

    fn drain(&self) -> Result<(), RuntimeError> {
        loop {
            match self.queue.pop() {
                Ok(event) => event.dispatch(&self.registers)?,
                Err(RuntimeError::QueueEmpty) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn run_cycle(&self) -> Result<(), RuntimeError> {
        self.drain()?;
        for id in self.timers.handle_timers(&self.registers)? {
            self.publish(DiagEvent::new(DiagKind::TimerFired).with_event_id(id));
        }
        let hook = self
            .hook
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .cloned();
        if let Some(hook) = hook {
            hook();
        }
        Ok(())
    }
}

#[async_trait]
impl Worker for Scheduler {
    fn name(&self) -> &'static str {
        "queue-scheduler"
    }

    async fn cycle(&self) -> Result<(), RuntimeError> {
        self.run_cycle()
    }
}
