//! # Tier Events
//!
//! Structured events emitted by the read path and the archival job.

use serde::Serialize;

use crate::types::now_ms;

/// Stage of a migration at which a record failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStage {
    /// The cold write was not confirmed; the record is still only in hot
    ColdWrite,
    /// The cold copy exists but the hot copy could not be removed
    HotDelete,
}

/// A structured tiering event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TierEvent {
    RecordNotFound {
        partition_key: String,
        id: String,
    },
    ServedFromCold {
        partition_key: String,
        id: String,
    },
    MigrationSucceeded {
        partition_key: String,
        id: String,
        /// The hot copy was already gone when the job tried to delete it
        already_absent: bool,
    },
    MigrationFailed {
        partition_key: String,
        id: String,
        stage: MigrationStage,
        error: String,
    },
    ArchivalRunCompleted {
        scanned: usize,
        migrated: usize,
        failed: usize,
        cancelled: bool,
        duration_ms: u64,
    },
}

impl TierEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TierEvent::RecordNotFound { .. } => "record_not_found",
            TierEvent::ServedFromCold { .. } => "served_from_cold",
            TierEvent::MigrationSucceeded { .. } => "migration_succeeded",
            TierEvent::MigrationFailed { .. } => "migration_failed",
            TierEvent::ArchivalRunCompleted { .. } => "archival_run_completed",
        }
    }
}

/// An event stamped with its emission time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub event: TierEvent,
}

impl EventEnvelope {
    pub fn now(event: TierEvent) -> Self {
        Self {
            timestamp_ms: now_ms(),
            event,
        }
    }
}
