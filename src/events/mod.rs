//! Events: closed-set callables, the process-wide event table, and the
//! bounded FIFO queue the runtime drains.

mod callable;
mod event;
mod queue;

pub use callable::{
    ArgValue, Callable, FloatInFloatOutFn, FloatOutFn, IntInFn, IntInIntOutFn, IntOutFn, NoArgFn,
    RetValue, TextInFn, TextOutFn,
};
pub use event::{Event, EventId, EventTable, EventTableBuilder, TimerSectionBuilder};
pub use queue::EventQueue;
