//! # States: {entry, loop, exit} callable triples.
//!
//! A [`State`] represents one phase of application behavior. Its entry
//! function runs once on transition-in, its loop function runs every cycle
//! while the state is active (and may request a transition by returning a
//! target id), and its exit function runs exactly once on transition-out and
//! may name or override the next state.
//!
//! ## Readiness
//! A state is ready once its loop function is bound. Entry and exit default
//! to genuine no-ops when never bound; the one place exit is load-bearing —
//! naming the next state — is enforced at transition time via
//! [`RuntimeError::NextIdNotDefined`](crate::RuntimeError::NextIdNotDefined).

use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;

/// Identity of a state within one machine's table.
pub type StateId = usize;

/// Entry function: side effects on transition-in.
pub type EntryFn = Arc<dyn Fn() + Send + Sync>;
/// Loop function: runs every cycle; `Some(id)` requests a transition.
pub type LoopFn = Arc<dyn Fn() -> Option<StateId> + Send + Sync>;
/// Exit function: side effects on transition-out; may name the next state.
pub type ExitFn = Arc<dyn Fn() -> Option<StateId> + Send + Sync>;

/// One of the three callable slots of a state, for the combined
/// [`bind_function`](crate::StateMachine::bind_function) entry point.
#[derive(Clone)]
pub enum StateFn {
    /// Entry slot.
    Entry(EntryFn),
    /// Loop slot.
    Loop(LoopFn),
    /// Exit slot.
    Exit(ExitFn),
}

impl StateFn {
    /// Wraps an entry closure.
    pub fn entry(f: impl Fn() + Send + Sync + 'static) -> Self {
        StateFn::Entry(Arc::new(f))
    }

    /// Wraps a loop closure.
    pub fn loop_fn(f: impl Fn() -> Option<StateId> + Send + Sync + 'static) -> Self {
        StateFn::Loop(Arc::new(f))
    }

    /// Wraps an exit closure.
    pub fn exit(f: impl Fn() -> Option<StateId> + Send + Sync + 'static) -> Self {
        StateFn::Exit(Arc::new(f))
    }
}

/// Execution phase of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Entry function pending; runs once on the next execute.
    Entry,
    /// Loop function runs every cycle.
    Loop,
    /// Exit forced; runs once, then the state re-arms at Entry.
    Exit,
}

/// An {entry, loop, exit} callable triple with phase tracking.
pub struct State {
    id: StateId,
    entry: Option<EntryFn>,
    loop_fn: Option<LoopFn>,
    exit_fn: Option<ExitFn>,
    phase: Phase,
}

impl State {
    pub(crate) fn new(id: StateId) -> Self {
        Self {
            id,
            entry: None,
            loop_fn: None,
            exit_fn: None,
            phase: Phase::Entry,
        }
    }

    /// The state's identity within its machine's table.
    pub fn id(&self) -> StateId {
        self.id
    }

    /// Current execution phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once the loop function is bound.
    pub fn is_ready(&self) -> bool {
        self.loop_fn.is_some()
    }

    pub(crate) fn bind_entry(&mut self, f: EntryFn) {
        self.entry = Some(f);
    }

    pub(crate) fn bind_loop(&mut self, f: LoopFn) {
        self.loop_fn = Some(f);
    }

    pub(crate) fn bind_exit(&mut self, f: ExitFn) {
        self.exit_fn = Some(f);
    }

    /// Begins one cycle: hands out the callables to run this cycle.
    ///
    /// On the first cycle after a transition-in, the entry function is
    /// included and the phase advances Entry→Loop (entry and loop run in the
    /// same cycle). Callables are cloned out so the caller invokes them
    /// without holding the machine lock.
    pub(crate) fn begin_cycle(&mut self) -> (Option<EntryFn>, Option<LoopFn>) {
        let entry = if self.phase == Phase::Entry {
            self.phase = Phase::Loop;
            self.entry.clone()
        } else {
            None
        };
        (entry, self.loop_fn.clone())
    }

    /// Forces the exit phase and hands out the exit function for invocation
    /// outside the machine lock. The phase reads Exit while the callable
    /// runs.
    pub(crate) fn begin_exit(&mut self) -> Option<ExitFn> {
        self.phase = Phase::Exit;
        self.exit_fn.clone()
    }

    /// Commits a finished exit: re-arms the phase at Entry and resolves the
    /// next state id.
    ///
    /// `named` is the exit function's returned id and wins over `requested`.
    /// Fails with [`RuntimeError::NextIdNotDefined`] when neither source
    /// yields an id.
    pub(crate) fn finish_exit(
        &mut self,
        named: Option<StateId>,
        requested: Option<StateId>,
    ) -> Result<StateId, RuntimeError> {
        self.phase = Phase::Entry;
        named
            .or(requested)
            .ok_or(RuntimeError::NextIdNotDefined { state: self.id })
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("ready", &self.is_ready())
            .finish()
    }
}
