//! # beatcore
//!
//! **beatcore** is the cooperative runtime core of a hobbyist BPM-detector
//! controller: a fixed-capacity event queue, type-erased callable dispatch,
//! cooperative software timers, a software-interrupt hook, and a layered
//! finite-state machine, coordinating two long-lived worker loops without an
//! operating system scheduler underneath.
//!
//! Signal processing, GPIO, audio capture, and display code are external
//! collaborators: they hand closures to the runtime at start-up and exchange
//! values with it through the register store. The runtime itself has no
//! file-format or wire-protocol responsibilities.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   collaborator closures (DSP, GPIO, audio, console)
//!            │  bound once at start-up
//!            ▼
//!   ┌─────────────────┐        ┌──────────────────┐
//!   │   EventTable    │        │   State table    │
//!   │ (arena of ids)  │        │  {entry,loop,exit}│
//!   └───────┬─────────┘        └────────┬─────────┘
//!           ▼                           ▼
//!   ┌─────────────────┐        ┌──────────────────┐
//!   │    Scheduler    │        │   StateMachine   │
//!   │ queue → timers  │        │ execute + trans  │
//!   │   → hook        │        │                  │
//!   └───────┬─────────┘        └────────┬─────────┘
//!           │     spawn_worker(token, period)     │
//!           ▼                           ▼
//!      queue worker               machine worker
//!           │                           │
//!           └────── RegisterStore ──────┘
//!              (the only shared state)
//! ```
//!
//! ### Scheduler cycle
//! One iteration of the queue worker, strictly sequential:
//! ```text
//! loop {
//!   ├─► pop + dispatch every queued event (FIFO)
//!   ├─► handle_timers() — dispatch elapsed timers
//!   ├─► software-interrupt hook (once, if installed)
//!   └─► sleep(queue_cycle)   [stop token checked at the top]
//! }
//! ```
//!
//! ## Concurrency contract
//! - The two workers communicate exclusively through the
//!   [`RegisterStore`] and by enqueuing events; neither calls the other.
//! - One lock per structure (queue, store, timer bank, machine table); no
//!   nested acquisition across them.
//! - Cancellation is cooperative: stop tokens are observed at the top of the
//!   next cycle, and terminal errors resolve only through worker handles.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use beatcore::{
//!     Callable, EventTableBuilder, MonotonicClock, RegisterStore, Runtime,
//!     RuntimeConfig, Scheduler, StateMachine,
//! };
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = RuntimeConfig::default();
//!     let regs = Arc::new(RegisterStore::new(cfg.register_slots));
//!
//!     // Bind collaborator callables into the event table.
//!     let mut events = EventTableBuilder::new();
//!     let sample_bpm = events.event(Callable::float_out(|| 120.0))?;
//!     let mut events = events.timers();
//!     let blink = events.timer(Callable::no_arg(|| { /* toggle LED */ }),
//!                              Duration::from_millis(500))?;
//!     let table = events.finish();
//!
//!     let scheduler = Scheduler::new(&cfg, table, Arc::new(MonotonicClock::new()), regs.clone())?;
//!
//!     // Two states: idle polls the BPM register, display shows it.
//!     let machine = StateMachine::new(2);
//!     let r = regs.clone();
//!     machine.bind_loop(0, move || {
//!         if r.get_float(sample_bpm) > 0.0 { Some(1) } else { None }
//!     })?;
//!     machine.bind_loop(1, || None)?;
//!
//!     let rt = Runtime::new(cfg, scheduler, machine);
//!     let handle = rt.start();
//!     rt.scheduler().start_timer(blink)?;
//!     rt.scheduler().send(sample_bpm)?;
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod diag;
mod error;
mod events;
mod fsm;
mod registers;
mod timers;

// ---- Public re-exports ----

pub use config::RuntimeConfig;
pub use self::core::{
    Runtime, RuntimeHandle, Scheduler, Worker, WorkerHandle, spawn_worker,
    wait_for_shutdown_signal,
};
pub use diag::{DiagBus, DiagEvent, DiagKind, LogWriter, Observe};
pub use error::RuntimeError;
pub use events::{
    ArgValue, Callable, Event, EventId, EventQueue, EventTable, EventTableBuilder,
    FloatInFloatOutFn, FloatOutFn, IntInFn, IntInIntOutFn, IntOutFn, NoArgFn, RetValue, TextInFn,
    TextOutFn, TimerSectionBuilder,
};
pub use fsm::{EntryFn, ExitFn, LoopFn, Phase, State, StateFn, StateId, StateMachine};
pub use registers::RegisterStore;
pub use timers::{Clock, MonotonicClock, Timer, TimerBank};
