//! Orchestration layer: worker loops, the queue scheduler, the runtime
//! shell, and OS signal handling.

mod runtime;
mod scheduler;
mod shutdown;
mod worker;

pub use runtime::{Runtime, RuntimeHandle};
pub use scheduler::Scheduler;
pub use shutdown::wait_for_shutdown_signal;
pub use worker::{Worker, WorkerHandle, spawn_worker};
