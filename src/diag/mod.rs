//! Diagnostics: broadcast bus, event metadata, and observers.

mod bus;
mod event;
mod log;

pub use bus::DiagBus;
pub use event::{DiagEvent, DiagKind};
pub use log::{LogWriter, Observe};
