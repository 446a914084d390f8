//! Archival job - moves aged records from the hot tier to the cold tier.
//!
//! Per-record protocol:
//!
//! ```text
//! Eligible -> ColdWritePending -> ColdWriteConfirmed -> HotDeletePending -> Migrated
//!                   |                                         |
//!                   v                                         v
//!             ColdWriteFailed                           HotDeleteFailed
//!        (record stays hot only)                (record in both tiers)
//! ```
//!
//! The hot delete is issued only after the cold write is acknowledged; that
//! ordering is what prevents data loss. Both steps are idempotent (cold puts
//! overwrite, deleting an absent hot key is success), so overlapping runs and
//! retries of half-finished records are safe without any locking.
//!
//! A run never fails as a whole. Per-record faults land in the
//! [`ArchivalReport`], and a failing scan ends the run early with the report so far.

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::report::{ArchivalReport, MigrationOutcome, RecordReport};
use crate::codec::encode_record;
use crate::config::TieringConfig;
use crate::error::MigrationFault;
use crate::locator::cold_key;
use crate::storage::{with_timeout, ColdStore, DeleteOutcome, HotStore, ScanCursor};
use crate::telemetry::{EventRecorder, MigrationStage, TierEvent};
use crate::types::{now_ms, Clock, Record, SystemClock};

/// Execution settings for [`ArchivalJob`].
#[derive(Clone, Debug)]
pub struct JobSettings {
    /// Timeout applied to each store call
    pub op_timeout: Duration,
    /// Records migrated concurrently
    pub parallelism: usize,
    /// Records fetched per scan page
    pub scan_page_size: usize,
    /// Confirm cold writes with an `exists` check
    pub verify_cold_writes: bool,
    /// Gzip archived bodies
    pub compress_cold: bool,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self::from(&TieringConfig::default())
    }
}

impl From<&TieringConfig> for JobSettings {
    fn from(config: &TieringConfig) -> Self {
        Self {
            op_timeout: config.op_timeout(),
            parallelism: config.parallelism.max(1),
            scan_page_size: config.scan_page_size.max(1),
            verify_cold_writes: config.verify_cold_writes,
            compress_cold: config.compress_cold,
        }
    }
}

/// Migrates records older than an age threshold from hot to cold.
pub struct ArchivalJob {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    clock: Arc<dyn Clock>,
    events: Arc<EventRecorder>,
    settings: JobSettings,
}

impl std::fmt::Debug for ArchivalJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchivalJob")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ArchivalJob {
    pub fn new(hot: Arc<dyn HotStore>, cold: Arc<dyn ColdStore>) -> Self {
        Self {
            hot,
            cold,
            clock: Arc::new(SystemClock),
            events: Arc::new(EventRecorder::default()),
            settings: JobSettings::default(),
        }
    }

    pub fn from_config(
        hot: Arc<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
        config: &TieringConfig,
    ) -> Self {
        Self::new(hot, cold).with_settings(JobSettings::from(config))
    }

    pub fn with_settings(mut self, settings: JobSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<EventRecorder>) -> Self {
        self.events = events;
        self
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Migrate up to `batch_size` records whose age exceeds `age_threshold`.
    pub async fn run(&self, age_threshold: Duration, batch_size: usize) -> ArchivalReport {
        let (_shutdown_tx, shutdown) = watch::channel(false);
        self.run_until(age_threshold, batch_size, &shutdown).await
    }

    /// Like [`run`](Self::run), but stops starting new records once `shutdown`
    /// reads `true`. Records already in flight finish their current attempt.
    pub async fn run_until(
        &self,
        age_threshold: Duration,
        batch_size: usize,
        shutdown: &watch::Receiver<bool>,
    ) -> ArchivalReport {
        let started_at = now_ms();
        let threshold_ms = u64::try_from(age_threshold.as_millis()).unwrap_or(u64::MAX);
        let cutoff_ms = self.clock.now_ms().saturating_sub(threshold_ms);
        let mut report = ArchivalReport::new(cutoff_ms, started_at);

        debug!(
            "Archival run starting: cutoff_ms={} batch_size={}",
            cutoff_ms, batch_size
        );

        let mut cursor: Option<ScanCursor> = None;
        while report.summary.scanned < batch_size {
            if *shutdown.borrow() {
                report.summary.cancelled = true;
                break;
            }

            let limit = self
                .settings
                .scan_page_size
                .min(batch_size - report.summary.scanned);
            let page = match with_timeout(
                self.settings.op_timeout,
                self.hot.scan_older_than(cutoff_ms, cursor.as_ref(), limit),
            )
            .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!("Archival scan failed: {}", e);
                    report.summary.scan_error = Some(e.to_string());
                    break;
                }
            };

            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            cursor = page.last().map(ScanCursor::after);
            report.summary.scanned += page_len;

            let outcomes: Vec<RecordReport> = stream::iter(page)
                .take_while(|_| futures::future::ready(!*shutdown.borrow()))
                .map(|record| self.migrate(record))
                .buffer_unordered(self.settings.parallelism)
                .collect()
                .await;

            if outcomes.len() < page_len {
                report.summary.cancelled = true;
                report.summary.skipped += page_len - outcomes.len();
            }
            for outcome in outcomes {
                report.push(outcome);
            }

            if report.summary.cancelled || page_len < limit {
                break;
            }
        }

        report.summary.duration_ms = now_ms().saturating_sub(started_at);
        let summary = &report.summary;
        info!("Archival run completed: {}", summary);
        self.events.record(TierEvent::ArchivalRunCompleted {
            scanned: summary.scanned,
            migrated: summary.migrated,
            failed: report.failed(),
            cancelled: summary.cancelled,
            duration_ms: summary.duration_ms,
        });
        report
    }

    /// Move one record. Never returns early without a terminal outcome.
    async fn migrate(&self, record: Record) -> RecordReport {
        let key = record.key();
        let object_key = cold_key(&key);

        // ColdWritePending
        let confirmed = match key.validate() {
            Ok(()) => self.write_cold(&record, &object_key).await,
            Err(e) => Err(format!("invalid record key: {}", e)),
        };
        if let Err(reason) = confirmed {
            warn!("Cold write failed for {}: {}", object_key, reason);
            self.events.record(TierEvent::MigrationFailed {
                partition_key: key.partition_key.clone(),
                id: key.id.clone(),
                stage: MigrationStage::ColdWrite,
                error: reason.clone(),
            });
            return RecordReport {
                key,
                outcome: MigrationOutcome::Failed(MigrationFault::PartialMigration {
                    key: object_key,
                    reason,
                }),
            };
        }

        // ColdWriteConfirmed -> HotDeletePending
        match with_timeout(self.settings.op_timeout, self.hot.delete(&key)).await {
            Ok(deleted) => {
                debug!("Migrated {} ({:?})", object_key, deleted);
                self.events.record(TierEvent::MigrationSucceeded {
                    partition_key: key.partition_key.clone(),
                    id: key.id.clone(),
                    already_absent: deleted == DeleteOutcome::AlreadyAbsent,
                });
                RecordReport {
                    key,
                    outcome: MigrationOutcome::Migrated(deleted),
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    "Hot delete failed for {} after cold write, record is duplicated: {}",
                    object_key, reason
                );
                self.events.record(TierEvent::MigrationFailed {
                    partition_key: key.partition_key.clone(),
                    id: key.id.clone(),
                    stage: MigrationStage::HotDelete,
                    error: reason.clone(),
                });
                RecordReport {
                    key,
                    outcome: MigrationOutcome::Failed(MigrationFault::DuplicatedAfterFault {
                        key: object_key,
                        reason,
                    }),
                }
            }
        }
    }

    /// Write the record to the cold tier and confirm it landed.
    async fn write_cold(&self, record: &Record, object_key: &str) -> Result<(), String> {
        let blob =
            encode_record(record, self.settings.compress_cold).map_err(|e| e.to_string())?;

        with_timeout(self.settings.op_timeout, self.cold.put(object_key, blob))
            .await
            .map_err(|e| e.to_string())?;

        if self.settings.verify_cold_writes {
            let present = with_timeout(self.settings.op_timeout, self.cold.exists(object_key))
                .await
                .map_err(|e| format!("verify failed: {}", e))?;
            if !present {
                return Err("object missing after acknowledged write".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryColdStore, MemoryHotStore};
    use crate::types::ManualClock;
    use serde_json::json;

    const DAY: Duration = Duration::from_secs(86_400);

    struct Fixture {
        hot: Arc<MemoryHotStore>,
        cold: Arc<MemoryColdStore>,
        clock: Arc<ManualClock>,
        job: ArchivalJob,
    }

    fn fixture(settings: JobSettings) -> Fixture {
        let hot = Arc::new(MemoryHotStore::new());
        let cold = Arc::new(MemoryColdStore::new());
        let clock = Arc::new(ManualClock::new(1_000 * DAY.as_millis() as u64));
        let job = ArchivalJob::new(hot.clone(), cold.clone())
            .with_settings(settings)
            .with_clock(clock.clone());
        Fixture {
            hot,
            cold,
            clock,
            job,
        }
    }

    async fn seed(f: &Fixture, id: &str, age: Duration) {
        let ts = f.clock.now_ms() - age.as_millis() as u64;
        f.hot
            .put(&Record::with_timestamp(id, "c1", ts, json!({"id": id})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_only_aged_records_move() {
        let f = fixture(JobSettings::default());
        seed(&f, "old", 100 * DAY).await;
        seed(&f, "young", 10 * DAY).await;

        let report = f.job.run(90 * DAY, 100).await;

        assert!(report.is_clean());
        assert_eq!(report.migrated(), 1);
        assert_eq!(f.cold.keys(), vec!["c1/old".to_string()]);
        assert_eq!(f.hot.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_size_bounds_work_across_pages() {
        let f = fixture(JobSettings {
            scan_page_size: 2,
            parallelism: 3,
            ..JobSettings::default()
        });
        for i in 0..7 {
            seed(&f, &format!("r{}", i), 100 * DAY + Duration::from_secs(i)).await;
        }

        let report = f.job.run(90 * DAY, 5).await;
        assert_eq!(report.summary.scanned, 5);
        assert_eq!(report.migrated(), 5);
        assert_eq!(f.hot.len().await.unwrap(), 2);

        let report = f.job.run(90 * DAY, 5).await;
        assert_eq!(report.migrated(), 2);
        assert_eq!(f.hot.len().await.unwrap(), 0);
        assert_eq!(f.cold.keys().len(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_run_touches_nothing() {
        let f = fixture(JobSettings::default());
        seed(&f, "old", 100 * DAY).await;

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let report = f.job.run_until(90 * DAY, 10, &rx).await;

        assert!(report.summary.cancelled);
        assert_eq!(report.migrated(), 0);
        assert_eq!(f.hot.len().await.unwrap(), 1);
        assert!(f.cold.keys().is_empty());
    }

    #[tokio::test]
    async fn test_cold_failure_keeps_hot_copy() {
        let f = fixture(JobSettings::default());
        seed(&f, "old", 100 * DAY).await;
        f.cold.close().await.unwrap();

        let report = f.job.run(90 * DAY, 10).await;

        assert_eq!(report.summary.cold_write_failed, 1);
        assert!(matches!(
            report.faults().next(),
            Some(MigrationFault::PartialMigration { .. })
        ));
        assert_eq!(f.hot.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scan_failure_ends_run_with_report() {
        let f = fixture(JobSettings::default());
        f.hot.close().await.unwrap();

        let report = f.job.run(90 * DAY, 10).await;
        assert!(report.summary.scan_error.is_some());
        assert_eq!(report.summary.scanned, 0);
        assert!(!report.is_clean());
    }
}
