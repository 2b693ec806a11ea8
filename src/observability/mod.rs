//! Observability module
//!
//! Logging and the structured JSONL event stream.

pub mod events;
pub mod logging;

pub use events::{Event, EventEmitter, SessionEvent, StopReason, spawn_forwarder};
pub use logging::{LogFormat, init_logging};
