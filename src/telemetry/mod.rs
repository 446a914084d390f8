//! # Telemetry Module
//!
//! Structured events for the tiering core:
//! - Records not found in either tier
//! - Reads served from the cold tier
//! - Per-record migration success and failure
//! - Archival run summaries
//!
//! Events go to an [`EventSink`]; alerting and dashboards live outside this crate.

pub mod event;
pub mod recorder;
pub mod sink;

pub use event::{EventEnvelope, MigrationStage, TierEvent};
pub use recorder::{EventRecorder, TelemetryStats};
pub use sink::{EventSink, JsonlEventSink, LogEventSink, MemoryEventSink, NullEventSink};
