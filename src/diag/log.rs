//! # Observer trait and the built-in logging observer.
//!
//! [`Observe`] is the hook for consuming diagnostic events; the runtime fans
//! bus events out to every registered observer sequentially. [`LogWriter`]
//! prints events to stdout in a human-readable format — useful for
//! development and demos; implement a custom [`Observe`] for structured
//! logging or metrics collection.
//!
//! ## Output format
//! ```text
//! [worker-started] queue-scheduler
//! [timer-fired] id=5
//! [state-changed] 0 -> 1
//! [shutdown-requested]
//! [grace-exceeded] stuck=state-machine
//! ```

use async_trait::async_trait;

use super::event::{DiagEvent, DiagKind};

/// Consumer of diagnostic events.
///
/// Handlers run on the runtime's observer listener task and should return
/// quickly; a slow observer delays delivery to the ones after it.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Processes one diagnostic event.
    async fn handle(&self, ev: &DiagEvent);
}

/// Simple stdout logging observer.
pub struct LogWriter;

#[async_trait]
impl Observe for LogWriter {
    async fn handle(&self, ev: &DiagEvent) {
        match ev.kind {
            DiagKind::WorkerStarted => {
                println!("[worker-started] {}", ev.reason.as_deref().unwrap_or("?"));
            }
            DiagKind::WorkerStopped => {
                println!("[worker-stopped] {}", ev.reason.as_deref().unwrap_or("?"));
            }
            DiagKind::WorkerFailed => {
                println!("[worker-failed] {}", ev.reason.as_deref().unwrap_or("?"));
            }
            DiagKind::StateChanged => {
                println!(
                    "[state-changed] {} -> {}",
                    ev.prev_state.map_or(-1, |s| s as i64),
                    ev.state.map_or(-1, |s| s as i64),
                );
            }
            DiagKind::MachineStalled => {
                println!(
                    "[machine-stalled] unready_state={}",
                    ev.state.unwrap_or_default()
                );
            }
            DiagKind::TimerFired => {
                println!("[timer-fired] id={}", ev.event_id.unwrap_or_default());
            }
            DiagKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            DiagKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            DiagKind::GraceExceeded => {
                println!(
                    "[grace-exceeded] stuck={}",
                    ev.reason.as_deref().unwrap_or("?")
                );
            }
        }
    }
}
