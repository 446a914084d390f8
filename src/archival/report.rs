//! Results of an archival run.

use serde::Serialize;
use std::fmt;

use crate::error::MigrationFault;
use crate::storage::DeleteOutcome;
use crate::types::RecordKey;

/// Terminal state of one record's migration attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Cold copy confirmed and hot copy gone
    Migrated(DeleteOutcome),
    /// Attempt stopped at a failure exit
    Failed(MigrationFault),
}

/// Outcome for a single candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordReport {
    pub key: RecordKey,
    pub outcome: MigrationOutcome,
}

/// Aggregate counts of an archival run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ArchivalSummary {
    /// Records with `timestamp_ms` below this were eligible
    pub cutoff_ms: u64,
    pub started_at: u64,
    pub duration_ms: u64,
    /// Candidates returned by the hot-tier scan
    pub scanned: usize,
    /// Candidates now held only by the cold tier
    pub migrated: usize,
    /// Subset of `migrated` whose hot copy was already gone
    pub already_absent: usize,
    /// Candidates left untouched in the hot tier
    pub cold_write_failed: usize,
    /// Candidates temporarily held by both tiers
    pub hot_delete_failed: usize,
    /// Candidates not attempted because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
    /// Why the scan stopped early, if it did
    pub scan_error: Option<String>,
}

impl fmt::Display for ArchivalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} migrated={} already_absent={} cold_write_failed={} hot_delete_failed={} skipped={} cancelled={} duration_ms={}",
            self.scanned,
            self.migrated,
            self.already_absent,
            self.cold_write_failed,
            self.hot_delete_failed,
            self.skipped,
            self.cancelled,
            self.duration_ms
        )?;
        if let Some(err) = &self.scan_error {
            write!(f, " scan_error={:?}", err)?;
        }
        Ok(())
    }
}

/// Everything an archival run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchivalReport {
    pub summary: ArchivalSummary,
    pub records: Vec<RecordReport>,
}

impl ArchivalReport {
    pub(crate) fn new(cutoff_ms: u64, started_at: u64) -> Self {
        Self {
            summary: ArchivalSummary {
                cutoff_ms,
                started_at,
                ..ArchivalSummary::default()
            },
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, report: RecordReport) {
        match &report.outcome {
            MigrationOutcome::Migrated(DeleteOutcome::Deleted) => self.summary.migrated += 1,
            MigrationOutcome::Migrated(DeleteOutcome::AlreadyAbsent) => {
                self.summary.migrated += 1;
                self.summary.already_absent += 1;
            }
            MigrationOutcome::Failed(MigrationFault::PartialMigration { .. }) => {
                self.summary.cold_write_failed += 1
            }
            MigrationOutcome::Failed(MigrationFault::DuplicatedAfterFault { .. }) => {
                self.summary.hot_delete_failed += 1
            }
        }
        self.records.push(report);
    }

    pub fn migrated(&self) -> usize {
        self.summary.migrated
    }

    pub fn failed(&self) -> usize {
        self.summary.cold_write_failed + self.summary.hot_delete_failed
    }

    /// Every scanned candidate was migrated and nothing cut the run short.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
            && self.summary.skipped == 0
            && !self.summary.cancelled
            && self.summary.scan_error.is_none()
    }

    /// Faults of all failed candidates.
    pub fn faults(&self) -> impl Iterator<Item = &MigrationFault> {
        self.records.iter().filter_map(|r| match &r.outcome {
            MigrationOutcome::Failed(fault) => Some(fault),
            MigrationOutcome::Migrated(_) => None,
        })
    }
}
