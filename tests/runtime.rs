//! End-to-end lifecycle of the two-worker runtime: events flow from the
//! queue worker into registers, the machine worker polls them and
//! transitions, timers fire through the running scheduler, and shutdown is
//! cooperative and bounded.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use beatcore::{
    Callable, DiagKind, EventTableBuilder, MonotonicClock, RegisterStore, Runtime, RuntimeConfig,
    RuntimeError, Scheduler, StateMachine,
};

fn fast_config() -> RuntimeConfig {
    let mut cfg = RuntimeConfig::default();
    cfg.queue_cycle = Duration::from_millis(1);
    cfg.machine_cycle = Duration::from_millis(1);
    cfg.grace = Duration::from_secs(2);
    cfg
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_event_flow_drives_machine_transition() {
    let cfg = fast_config();
    let regs = Arc::new(RegisterStore::new(cfg.register_slots));

    // One event whose result lands in register 0: the "beat detected" flag.
    let mut b = EventTableBuilder::new();
    let mark = b.event(Callable::int_out(|| 1)).unwrap();
    let table = b.finish();

    let scheduler =
        Scheduler::new(&cfg, table, Arc::new(MonotonicClock::new()), regs.clone()).unwrap();

    let exits = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];
    let entries = Arc::new(AtomicUsize::new(0));

    let machine = StateMachine::new(2);
    let r = regs.clone();
    machine
        .bind_loop(0, move || {
            if r.get_int(mark) == 1 { Some(1) } else { None }
        })
        .unwrap();
    machine.bind_loop(1, || None).unwrap();
    for (id, counter) in exits.iter().enumerate() {
        let c = counter.clone();
        machine
            .bind_exit(id, move || {
                c.fetch_add(1, Ordering::SeqCst);
                None
            })
            .unwrap();
    }
    let e = entries.clone();
    machine
        .bind_entry(1, move || {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let rt = Runtime::new(cfg, scheduler, machine);
    let mut rx = rt.bus().subscribe();
    let handle = rt.start();

    // Hand the flag to the queue worker; the machine worker polls it.
    rt.scheduler().send(mark).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(rt.machine().active_state(), 1);
    assert_eq!(rt.machine().previous_state(), Some(0));
    assert_eq!(entries.load(Ordering::SeqCst), 1);
    assert_eq!(exits[0].load(Ordering::SeqCst), 1);

    assert_eq!(handle.shutdown().await, Ok(()));
    assert!(rt.machine().is_stopped());
    // Final exit of the then-active state (1) ran exactly once.
    assert_eq!(exits[1].load(Ordering::SeqCst), 1);
    assert_eq!(exits[0].load(Ordering::SeqCst), 1);

    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&DiagKind::StateChanged));
    assert!(kinds.contains(&DiagKind::ShutdownRequested));
    assert!(kinds.contains(&DiagKind::AllStoppedWithin));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timer_fires_once_through_running_scheduler() {
    let cfg = fast_config();
    let regs = Arc::new(RegisterStore::new(cfg.register_slots));

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    let mut b = EventTableBuilder::new().timers();
    let blink = b
        .timer(
            Callable::no_arg(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(5),
        )
        .unwrap();
    let table = b.finish();

    let scheduler = Scheduler::new(&cfg, table, Arc::new(MonotonicClock::new()), regs).unwrap();
    let machine = StateMachine::new(1);
    machine.bind_loop(0, || None).unwrap();

    let rt = Runtime::new(cfg, scheduler, machine);
    let handle = rt.start();

    rt.scheduler().start_timer(blink).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Single-shot: exactly one dispatch despite many cycles since.
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!rt.scheduler().is_timer_started(blink));
    assert_eq!(handle.shutdown().await, Ok(()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_register_handoff_clear_on_read() {
    let cfg = fast_config();
    let regs = Arc::new(RegisterStore::new(cfg.register_slots));

    // The callable publishes a one-shot BPM estimate.
    let mut b = EventTableBuilder::new();
    let bpm = b
        .event_with(
            Callable::float_out(|| 127.5),
            beatcore::ArgValue::None,
            true,
        )
        .unwrap();
    let table = b.finish();

    let scheduler =
        Scheduler::new(&cfg, table, Arc::new(MonotonicClock::new()), regs.clone()).unwrap();
    let machine = StateMachine::new(1);
    machine.bind_loop(0, || None).unwrap();

    let rt = Runtime::new(cfg, scheduler, machine);
    let handle = rt.start();

    rt.scheduler().send(bpm).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // One consumer read observes the value; the slot then reads as zero
    // until the next dispatch.
    assert_eq!(regs.get_float(bpm), 127.5);
    assert_eq!(regs.get_float(bpm), 0.0);

    assert_eq!(handle.shutdown().await, Ok(()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_queue_full_is_caller_visible_backpressure() {
    let mut cfg = fast_config();
    cfg.queue_capacity = 2;
    let regs = Arc::new(RegisterStore::new(cfg.register_slots));

    let mut b = EventTableBuilder::new();
    let ev = b.event(Callable::no_arg(|| {})).unwrap();
    let table = b.finish();

    let scheduler = Scheduler::new(&cfg, table, Arc::new(MonotonicClock::new()), regs).unwrap();

    // Worker not started: pushes accumulate until the ring is full.
    scheduler.send(ev).unwrap();
    scheduler.send(ev).unwrap();
    assert_eq!(scheduler.send(ev), Err(RuntimeError::QueueFull));
    assert!(scheduler.is_queue_full());
    assert_eq!(scheduler.queue_len(), 2);
}
