//! # Worker loops: cooperative cycles with stop tokens and join handles.
//!
//! Both halves of the runtime — the queue scheduler and the state machine —
//! are [`Worker`]s: cheap, non-blocking `cycle()` implementations driven by
//! [`spawn_worker`] in a tight loop with a fixed inter-cycle sleep.
//!
//! ## Rules
//! - The stop token is checked at the top of every cycle; cancellation is
//!   cooperative. A callable that blocks indefinitely prevents shutdown.
//! - The first `cycle()` error terminates the loop; the terminal error is
//!   retrievable exactly once through [`WorkerHandle::join`].
//! - The inter-cycle sleep is cancellable, so a stop request does not wait
//!   out the sleep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

/// A cooperative cyclic unit driven by [`spawn_worker`].
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Stable worker name, used in diagnostics and panic reports.
    fn name(&self) -> &'static str;

    /// Runs one cycle of non-blocking work.
    ///
    /// An `Err` terminates the worker's loop with that error.
    async fn cycle(&self) -> Result<(), RuntimeError>;

    /// Final cleanup, invoked once when the stop token is observed.
    ///
    /// Not invoked when the loop terminates with an error.
    fn on_stop(&self) {}
}

/// Handle to a running worker loop.
///
/// Stopping is cooperative (`stop()` cancels the loop's token); the loop's
/// terminal result resolves through `join()`.
pub struct WorkerHandle {
    name: &'static str,
    token: CancellationToken,
    done: CancellationToken,
    join: JoinHandle<Result<(), RuntimeError>>,
}

impl WorkerHandle {
    /// The worker's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Requests a cooperative stop, observed at the top of the next cycle.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// True once the worker's loop has returned (any outcome).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Completes when the worker's loop has returned, without consuming the
    /// handle or the terminal result.
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }

    /// Waits for the loop to return and yields its terminal result.
    ///
    /// A panicked worker joins as [`RuntimeError::WorkerPanicked`].
    pub async fn join(self) -> Result<(), RuntimeError> {
        match self.join.await {
            Ok(res) => res,
            Err(_) => Err(RuntimeError::WorkerPanicked { worker: self.name }),
        }
    }
}

/// Spawns `worker`'s driver loop and returns its handle.
///
/// Each iteration: check the stop token, run `cycle()`, then sleep `period`
/// (cancellable). On stop, `on_stop()` runs once before the loop returns
/// `Ok(())`; on a cycle error the loop returns that error immediately.
pub fn spawn_worker(worker: Arc<dyn Worker>, period: Duration) -> WorkerHandle {
    let token = CancellationToken::new();
    let done = CancellationToken::new();
    let name = worker.name();

    let loop_token = token.clone();
    let join = tokio::spawn({
        // Signals completion even if a cycle panics.
        let guard = done.clone().drop_guard();
        async move {
            let _guard = guard;
            loop {
                if loop_token.is_cancelled() {
                    worker.on_stop();
                    return Ok(());
                }
                worker.cycle().await?;
                tokio::select! {
                    _ = loop_token.cancelled() => {
                        worker.on_stop();
                        return Ok(());
                    }
                    _ = tokio::time::sleep(period) => {}
                }
            }
        }
    });

    WorkerHandle {
        name,
        token,
        done,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        cycles: AtomicUsize,
        stops: AtomicUsize,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl Worker for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn cycle(&self) -> Result<(), RuntimeError> {
            let n = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_at == Some(n) {
                return Err(RuntimeError::QueueFull);
            }
            Ok(())
        }

        fn on_stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_stop_then_join_terminates_with_on_stop_once() {
        let w = Arc::new(Counting {
            cycles: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_at: None,
        });
        let handle = spawn_worker(w.clone(), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();
        assert_eq!(handle.join().await, Ok(()));
        assert!(w.cycles.load(Ordering::SeqCst) >= 1);
        assert_eq!(w.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_error_terminates_loop() {
        let w = Arc::new(Counting {
            cycles: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_at: Some(3),
        });
        let handle = spawn_worker(w.clone(), Duration::from_millis(1));
        assert_eq!(handle.join().await, Err(RuntimeError::QueueFull));
        assert_eq!(w.cycles.load(Ordering::SeqCst), 3);
        // on_stop is reserved for cooperative stops.
        assert_eq!(w.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finished_signal_fires() {
        let w = Arc::new(Counting {
            cycles: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            fail_at: Some(1),
        });
        let handle = spawn_worker(w, Duration::from_millis(1));
        handle.finished().await;
        assert!(handle.is_finished());
        assert_eq!(handle.join().await, Err(RuntimeError::QueueFull));
    }
}
