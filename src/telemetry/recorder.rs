//! # Event Recorder
//!
//! Thread-safe event fan-out with running counters.

use parking_lot::RwLock;
use std::sync::Arc;

use super::event::{EventEnvelope, TierEvent};
use super::sink::{EventSink, LogEventSink};

/// Counters over every event seen by a recorder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub not_found: u64,
    pub served_from_cold: u64,
    pub migrations_succeeded: u64,
    pub migrations_failed: u64,
    pub archival_runs: u64,
}

/// Stamps events, updates counters, and forwards to a sink.
pub struct EventRecorder {
    sink: Arc<dyn EventSink>,
    stats: RwLock<TelemetryStats>,
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("stats", &*self.stats.read())
            .finish()
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(Arc::new(LogEventSink))
    }
}

impl EventRecorder {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            stats: RwLock::new(TelemetryStats::default()),
        }
    }

    pub fn record(&self, event: TierEvent) {
        {
            let mut stats = self.stats.write();
            match &event {
                TierEvent::RecordNotFound { .. } => stats.not_found += 1,
                TierEvent::ServedFromCold { .. } => stats.served_from_cold += 1,
                TierEvent::MigrationSucceeded { .. } => stats.migrations_succeeded += 1,
                TierEvent::MigrationFailed { .. } => stats.migrations_failed += 1,
                TierEvent::ArchivalRunCompleted { .. } => stats.archival_runs += 1,
            }
        }
        self.sink.emit(&EventEnvelope::now(event));
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats.read().clone()
    }

    pub fn flush(&self) {
        self.sink.flush();
    }
}
