//! # Runtime: the orchestration shell around the two workers.
//!
//! [`Runtime`] wires the scheduler and the state machine to one diagnostics
//! bus, fans bus events out to registered observers, and drives start-up and
//! graceful shutdown.
//!
//! ## High-level architecture
//! ```text
//! EventTable + TimerBank ──► Scheduler ──┐
//!                                        ├──► spawn_worker() per half
//! State table            ──► StateMachine┘          │
//!                                                   ▼
//!                       DiagBus ◄── publishes ── worker cycles
//!                          │
//!                          ▼
//!                 observer listener ──► Observe::handle() per observer
//!
//! Shutdown path:
//!   wait_for_shutdown_signal() ─► publish ShutdownRequested
//!                              ─► cancel both stop tokens
//!                              ─► join with grace:
//!                                   ├─ all joined  → AllStoppedWithin
//!                                   └─ timeout     → GraceExceeded { stuck }
//! ```
//!
//! The two workers never call into each other; they share only the register
//! store and the event queue. The runtime shell owns nothing they cycle on —
//! it only holds their handles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use crate::config::RuntimeConfig;
use crate::core::scheduler::Scheduler;
use crate::core::shutdown;
use crate::core::worker::WorkerHandle;
use crate::diag::{DiagBus, DiagEvent, DiagKind, Observe};
use crate::error::RuntimeError;
use crate::fsm::StateMachine;

/// Orchestrates the queue worker, the machine worker, and diagnostics.
pub struct Runtime {
    cfg: RuntimeConfig,
    scheduler: Arc<Scheduler>,
    machine: Arc<StateMachine>,
    bus: DiagBus,
    observers: Vec<Arc<dyn Observe>>,
}

impl Runtime {
    /// Creates the runtime shell and attaches the diagnostics bus to both
    /// halves.
    pub fn new(cfg: RuntimeConfig, scheduler: Arc<Scheduler>, machine: Arc<StateMachine>) -> Self {
        let bus = DiagBus::new(cfg.bus_capacity_clamped());
        scheduler.attach_bus(bus.clone());
        machine.attach_bus(bus.clone());
        Self {
            cfg,
            scheduler,
            machine,
            bus,
            observers: Vec::new(),
        }
    }

    /// Registers an observer for diagnostic events.
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// The diagnostics bus (for external subscribers).
    pub fn bus(&self) -> &DiagBus {
        &self.bus
    }

    /// The queue worker's scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// The machine worker's state machine.
    pub fn machine(&self) -> &Arc<StateMachine> {
        &self.machine
    }

    /// Subscribes to the bus and forwards events to the observers in
    /// registration order (fire-and-forget).
    fn spawn_observer_listener(&self) {
        if self.observers.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let observers = self.observers.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        for obs in &observers {
                            obs.handle(&ev).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Spawns both worker loops and the observer listener.
    pub fn start(&self) -> RuntimeHandle {
        self.spawn_observer_listener();

        let scheduler = self.scheduler.start(self.cfg.queue_cycle);
        let machine = self.machine.start(self.cfg.machine_cycle);
        for h in [&scheduler, &machine] {
            self.bus
                .publish(DiagEvent::new(DiagKind::WorkerStarted).with_reason(h.name()));
        }

        RuntimeHandle {
            bus: self.bus.clone(),
            grace: self.cfg.grace,
            scheduler,
            machine,
        }
    }

    /// Runs until either worker terminates on its own or an OS termination
    /// signal arrives, then shuts down gracefully.
    ///
    /// The first worker error becomes the result; a shutdown that exceeds the
    /// grace period yields [`RuntimeError::GraceExceeded`].
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let handle = self.start();
        tokio::select! {
            _ = shutdown::wait_for_shutdown_signal() => handle.stop(),
            _ = handle.finished() => {}
        }
        handle.join().await
    }
}

/// Handle to a started runtime: both worker handles plus the bus.
pub struct RuntimeHandle {
    bus: DiagBus,
    grace: Duration,
    scheduler: WorkerHandle,
    machine: WorkerHandle,
}

impl RuntimeHandle {
    /// Requests a cooperative stop of both workers.
    ///
    /// Each observes its token at the top of its next cycle; the machine then
    /// forces the active state's exit one final time.
    pub fn stop(&self) {
        self.bus.publish(DiagEvent::new(DiagKind::ShutdownRequested));
        self.scheduler.stop();
        self.machine.stop();
    }

    /// Completes once both worker loops have returned (any outcome).
    pub async fn finished(&self) {
        self.scheduler.finished().await;
        self.machine.finished().await;
    }

    /// Waits for both workers within the grace period and yields the first
    /// worker error, if any.
    ///
    /// Workers that miss the deadline are reported in
    /// [`RuntimeError::GraceExceeded`] and left to the executor (they cannot
    /// be preempted; only their next token check would stop them).
    pub async fn join(self) -> Result<(), RuntimeError> {
        let RuntimeHandle {
            bus,
            grace,
            scheduler,
            machine,
        } = self;
        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck: Vec<&'static str> = Vec::new();
        let mut first_err: Option<RuntimeError> = None;

        for handle in [scheduler, machine] {
            let name = handle.name();
            match tokio::time::timeout_at(deadline, handle.join()).await {
                Ok(Ok(())) => {
                    bus.publish(DiagEvent::new(DiagKind::WorkerStopped).with_reason(name));
                }
                Ok(Err(e)) => {
                    bus.publish(
                        DiagEvent::new(DiagKind::WorkerFailed)
                            .with_reason(format!("{name}: {}", e.as_label())),
                    );
                    first_err.get_or_insert(e);
                }
                Err(_) => stuck.push(name),
            }
        }

        if !stuck.is_empty() {
            bus.publish(DiagEvent::new(DiagKind::GraceExceeded).with_reason(stuck.join(",")));
            return Err(RuntimeError::GraceExceeded { grace, stuck });
        }
        bus.publish(DiagEvent::new(DiagKind::AllStoppedWithin));
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Convenience: `stop()` followed by `join()`.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        self.stop();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTableBuilder;
    use crate::registers::RegisterStore;
    use crate::timers::MonotonicClock;
    use std::sync::Arc;

    fn small_runtime(grace: Duration) -> Runtime {
        let mut cfg = RuntimeConfig::default();
        cfg.grace = grace;
        let regs = Arc::new(RegisterStore::new(cfg.register_slots));
        let sched = Scheduler::new(
            &cfg,
            EventTableBuilder::new().finish(),
            Arc::new(MonotonicClock::new()),
            regs,
        )
        .unwrap();
        let machine = StateMachine::new(1);
        machine.bind_loop(0, || None).unwrap();
        Runtime::new(cfg, sched, machine)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_joins_both_workers() {
        let rt = small_runtime(Duration::from_secs(5));
        let handle = rt.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.shutdown().await, Ok(()));
        assert!(rt.machine().is_stopped());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_grace_exceeded_names_stuck_worker() {
        let rt = small_runtime(Duration::from_millis(10));
        // A hook that outlives the grace period stalls the queue worker.
        rt.scheduler()
            .set_software_interrupt(Some(Arc::new(|| {
                std::thread::sleep(Duration::from_millis(300));
            })))
            .unwrap();

        let handle = rt.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = handle.shutdown().await.unwrap_err();
        match err {
            RuntimeError::GraceExceeded { stuck, .. } => {
                assert!(stuck.contains(&"queue-scheduler"));
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_machine_error_surfaces_through_run_path() {
        let mut cfg = RuntimeConfig::default();
        cfg.grace = Duration::from_secs(1);
        let regs = Arc::new(RegisterStore::new(cfg.register_slots));
        let sched = Scheduler::new(
            &cfg,
            EventTableBuilder::new().finish(),
            Arc::new(MonotonicClock::new()),
            regs,
        )
        .unwrap();
        // State 1 never gets a loop function: persistent not-initialized.
        let machine = StateMachine::new(2);
        machine.bind_loop(0, || None).unwrap();

        let rt = Runtime::new(cfg, sched, machine);
        let handle = rt.start();
        handle.machine.finished().await;
        let err = handle.shutdown().await.unwrap_err();
        assert_eq!(err, RuntimeError::MachineNotInitialized { state: 1 });
    }
}
