//! Structured event stream.
//!
//! Machine events and session lifecycle markers serialized as
//! newline-delimited JSON (JSONL), each with a timestamp and a
//! monotonically increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::phase::MachineEvent;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Input ended or the requested rounds were played.
    Completed,
    /// Stopped by SIGINT or SIGTERM.
    Cancelled,
}

/// Session lifecycle markers written around the machine events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The machine was started.
    SessionStarted {
        /// Number of distinct icons in the pool.
        pool_size: usize,
        /// Selector seed, when one was given.
        #[serde(skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    /// The session ended.
    SessionStopped {
        /// Why it ended.
        reason: StopReason,
    },
}

/// Anything the emitter can write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Event {
    /// Session lifecycle marker.
    Session(SessionEvent),
    /// Event broadcast by the phase machine.
    Machine(MachineEvent),
}

impl From<SessionEvent> for Event {
    fn from(event: SessionEvent) -> Self {
        Self::Session(event)
    }
}

impl From<MachineEvent> for Event {
    fn from(event: MachineEvent) -> Self {
        Self::Machine(event)
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    timestamp: DateTime<Utc>,
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; the event stream never
/// interrupts a game.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Writes one event as a single JSONL line.
    pub fn emit(&self, event: impl Into<Event>) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            event: event.into(),
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events written so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Forwards machine events to `emitter` until the channel closes or
/// `cancel` fires. Events already broadcast are written before a
/// cancellation is observed.
///
/// Events dropped because the receiver lagged are logged and skipped.
pub fn spawn_forwarder(
    emitter: Arc<EventEmitter>,
    events: broadcast::Receiver<MachineEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut stream = BroadcastStream::new(events);
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                item = stream.next() => match item {
                    Some(Ok(event)) => emitter.emit(event),
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "event stream lagged; events dropped");
                    }
                    None => break,
                },
                () = cancel.cancelled() => break,
            }
        }
    })
}
