//! # Event Sinks
//!
//! Destinations for [`EventEnvelope`]s. Sinks must not fail the data path, so
//! `emit` is infallible; write problems are logged and dropped.

use log::{info, warn};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::event::EventEnvelope;

/// Consumer of tiering events.
pub trait EventSink: Send + Sync {
    fn emit(&self, envelope: &EventEnvelope);

    fn flush(&self) {}
}

/// Writes each event as one JSON line on the `tiervault::events` log target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        match serde_json::to_string(envelope) {
            Ok(json) => info!(target: "tiervault::events", "{}", json),
            Err(e) => warn!("Failed to serialize tier event: {}", e),
        }
    }
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _envelope: &EventEnvelope) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<EventEnvelope>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().clone()
    }

    /// Number of captured events with the given [`TierEvent::name`](super::TierEvent::name).
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event.name() == name)
            .count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        self.events.lock().push(envelope.clone());
    }
}

/// Appends events as JSON lines to a file.
pub struct JsonlEventSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    immediate_flush: bool,
}

impl std::fmt::Debug for JsonlEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlEventSink")
            .field("path", &self.path)
            .field("immediate_flush", &self.immediate_flush)
            .finish()
    }
}

impl JsonlEventSink {
    /// Open (or create) the event file in append mode.
    pub fn open<P: AsRef<Path>>(path: P, immediate_flush: bool) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
            immediate_flush,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&self, envelope: &EventEnvelope) {
        let json = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize tier event: {}", e);
                return;
            }
        };

        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", json) {
            warn!("Failed to write tier event to {}: {}", self.path.display(), e);
            return;
        }
        if self.immediate_flush {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush tier events: {}", e);
            }
        }
    }

    fn flush(&self) {
        if let Err(e) = self.writer.lock().flush() {
            warn!("Failed to flush tier events: {}", e);
        }
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        self.writer.get_mut().flush().ok();
    }
}
