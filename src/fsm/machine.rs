//! # State machine: fixed state table, one active state, explicit transitions.
//!
//! The [`StateMachine`] owns a table of [`State`]s with identities exactly
//! `0..N-1`, tracks the active state, and executes one state cycle per
//! machine-worker cycle. Transitions are requested either by the active
//! state's loop function returning a target id or externally through
//! [`StateMachine::set_trans`]; on a request, the active state's exit phase is
//! forced and executed exactly once before the next state's entry phase.
//!
//! ## Lifecycle
//! ```text
//! Uninitialized ──(every state ready)──► Initialized ──(worker spawned)──► Running ──(stop)──► Stopped
//!        │
//!        └─ readiness never reached → MachineNotInitialized every cycle until fixed
//! ```
//!
//! ## Rules
//! - One lock covers the table, the active/previous ids, and the pending
//!   transition; nothing else is acquired while it is held.
//! - State callables never run under the lock: `execute` clones them out and
//!   invokes them unlocked, so entry/loop/exit functions may call back into
//!   the machine.
//! - Readiness is verified lazily and cached once true; while false it is
//!   recomputed every cycle so binding the missing loop function un-sticks
//!   the machine.
//! - Exit-then-Entry ordering across a transition is guaranteed.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{Worker, WorkerHandle, spawn_worker};
use crate::diag::{DiagBus, DiagEvent, DiagKind};
use crate::error::RuntimeError;
use crate::fsm::state::{Phase, State, StateFn, StateId};

struct MachineCore {
    states: Vec<State>,
    active: StateId,
    previous: Option<StateId>,
    pending: Option<StateId>,
    initialized: bool,
    stopped: bool,
}

/// Fixed table of states with one active state and explicit transitions.
pub struct StateMachine {
    inner: Mutex<MachineCore>,
    diag: OnceLock<DiagBus>,
}

impl StateMachine {
    /// Creates a machine with `states` table entries, ids `0..states`,
    /// state 0 active.
    ///
    /// The table size is fixed here; every state must have its loop function
    /// bound before the machine will execute.
    pub fn new(states: usize) -> Arc<Self> {
        let states = states.max(1);
        Arc::new(Self {
            inner: Mutex::new(MachineCore {
                states: (0..states).map(State::new).collect(),
                active: 0,
                previous: None,
                pending: None,
                initialized: false,
                stopped: false,
            }),
            diag: OnceLock::new(),
        })
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

    fn lock(&self) -> MutexGuard<'_, MachineCore> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_state<R>(
        &self,
        id: StateId,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, RuntimeError> {
        let mut m = self.lock();
        let len = m.states.len();
        match m.states.get_mut(id) {
            Some(state) => Ok(f(state)),
            None => Err(RuntimeError::InvalidIdNumber { id, len }),
        }
    }

    /// Number of states in the table.
    pub fn len(&self) -> usize {
        self.lock().states.len()
    }

    /// True if the table is empty (never the case; the table is min 1).
    pub fn is_empty(&self) -> bool {
        self.lock().states.is_empty()
    }

    /// Binds the entry function of state `id`.
    pub fn bind_entry(
        &self,
        id: StateId,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Result<(), RuntimeError> {
        self.with_state(id, |s| s.bind_entry(Arc::new(f)))
    }

    /// Binds the loop function of state `id`.
    pub fn bind_loop(
        &self,
        id: StateId,
        f: impl Fn() -> Option<StateId> + Send + Sync + 'static,
    ) -> Result<(), RuntimeError> {
        self.with_state(id, |s| s.bind_loop(Arc::new(f)))
    }

    /// Binds the exit function of state `id`.
    pub fn bind_exit(
        &self,
        id: StateId,
        f: impl Fn() -> Option<StateId> + Send + Sync + 'static,
    ) -> Result<(), RuntimeError> {
        self.with_state(id, |s| s.bind_exit(Arc::new(f)))
    }

    /// Binds one callable slot of state `id`.
    ///
    /// Fails with [`RuntimeError::InvalidIdNumber`] if `id` is outside the
    /// table; the table is never mutated in that case.
    pub fn bind_function(&self, f: StateFn, id: StateId) -> Result<(), RuntimeError> {
        self.with_state(id, |s| match f {
            StateFn::Entry(f) => s.bind_entry(f),
            StateFn::Loop(f) => s.bind_loop(f),
            StateFn::Exit(f) => s.bind_exit(f),
        })
    }

    /// Requests a transition to state `id`, validated against the table.
    ///
    /// The request is consumed by the next `execute()` cycle; a second
    /// request before that replaces the first.
    pub fn set_trans(&self, id: StateId) -> Result<(), RuntimeError> {
        let mut m = self.lock();
        let len = m.states.len();
        if id >= len {
            return Err(RuntimeError::InvalidIdNumber { id, len });
        }
        m.pending = Some(id);
        Ok(())
    }

    /// Reads the pending transition request, if any.
    pub fn get_trans(&self) -> Option<StateId> {
        self.lock().pending
    }

    /// Identity of the active state.
    pub fn active_state(&self) -> StateId {
        self.lock().active
    }

    /// Identity of the previously active state, once a transition occurred.
    pub fn previous_state(&self) -> Option<StateId> {
        self.lock().previous
    }

    /// Phase of the active state (for supervision/tests).
    pub fn active_phase(&self) -> Phase {
        let m = self.lock();
        m.states[m.active].phase()
    }

    /// True once every state passed the readiness check.
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// True after the machine observed its stop.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Runs one machine cycle.
    ///
    /// Verifies readiness lazily (cached once true), executes the active
    /// state, and performs a requested transition: the active state's exit
    /// phase is forced and executed exactly once, `previous` advances, and
    /// the target becomes active. Fails with
    /// [`RuntimeError::MachineNotInitialized`] every cycle until all states
    /// are ready.
    ///
    /// State callables are cloned out and invoked with the machine lock
    /// released, so they may call back into the machine ([`set_trans`],
    /// accessors) without deadlocking.
    ///
    /// [`set_trans`]: StateMachine::set_trans
    pub fn execute(&self) -> Result<(), RuntimeError> {
        let (active, entry, loop_fn) = {
            let mut m = self.lock();
            if m.stopped {
                return Ok(());
            }
            if !m.initialized {
                if let Some(unready) = m.states.iter().find(|s| !s.is_ready()) {
                    let state = unready.id();
                    drop(m);
                    self.publish(DiagEvent::new(DiagKind::MachineStalled).with_state(state));
                    return Err(RuntimeError::MachineNotInitialized { state });
                }
                m.initialized = true;
            }
            let active = m.active;
            let (entry, loop_fn) = m.states[active].begin_cycle();
            (active, entry, loop_fn)
        };

        if let Some(entry) = entry {
            entry();
        }
        let signal = loop_fn.and_then(|f| f());

        let (target, exit_fn) = {
            let mut m = self.lock();
            let Some(target) = signal.or_else(|| m.pending.take()) else {
                return Ok(());
            };
            let len = m.states.len();
            if target >= len {
                return Err(RuntimeError::InvalidIdNumber { id: target, len });
            }
            (target, m.states[active].begin_exit())
        };

        let named = exit_fn.and_then(|f| f());

        let next = {
            let mut m = self.lock();
            let len = m.states.len();
            let next = m.states[active].finish_exit(named, Some(target))?;
            if next >= len {
                return Err(RuntimeError::InvalidIdNumber { id: next, len });
            }
            m.previous = Some(active);
            m.active = next;
            next
        };
        self.publish(
            DiagEvent::new(DiagKind::StateChanged)
                .with_prev_state(active)
                .with_state(next),
        );
        Ok(())
    }

    /// Spawns the machine's driver loop on its own worker.
    ///
    /// The returned handle's `stop()` is the machine-stop request: the driver
    /// observes it at the top of its next cycle, forces the active state's
    /// exit one final time, and returns. The loop's terminal error resolves
    /// through `join()`.
    pub fn start(self: &Arc<Self>, period: Duration) -> WorkerHandle {
        spawn_worker(Arc::clone(self) as Arc<dyn Worker>, period)
    }
}

#[async_trait]
impl Worker for StateMachine {
    fn name(&self) -> &'static str {
        "state-machine"
    }

    async fn cycle(&self) -> Result<(), RuntimeError> {
        self.execute()
    }

    fn on_stop(&self) {
        let exit = {
            let mut m = self.lock();
            if m.stopped {
                return;
            }
            m.stopped = true;
            let active = m.active;
            m.states[active].begin_exit()
        };
        // Terminal exit: no next state to enter, phase rests at Exit.
        if let Some(f) = exit {
            let _ = f();
        }
    }
}
