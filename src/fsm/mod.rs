//! Finite-state machine: {entry, loop, exit} states and the fixed-table
//! machine that drives them.

mod machine;
mod state;

pub use machine::StateMachine;
pub use state::{EntryFn, ExitFn, LoopFn, Phase, State, StateFn, StateId};
