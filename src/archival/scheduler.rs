//! Scheduled archival - a fixed-interval trigger for [`ArchivalJob`].
//!
//! The job itself owns no background task; something outside it has to call
//! `run` periodically. Deployments may use cron with `tiervault archive`, or
//! this scheduler when the process is long-lived.
//!
//! # Production Configuration
//!
//! The default interval is 1 hour. Each tick runs one bounded archival pass
//! (`batch_size` candidates at most), so a backlog drains over several ticks
//! rather than in one long run. Ticks missed while a run is still going are
//! skipped, not queued, so one scheduler never overlaps itself. Two schedulers
//! against the same stores are still safe: migration is idempotent.

use log::{error, info};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use super::job::ArchivalJob;
use super::report::ArchivalSummary;
use crate::config::TieringConfig;

/// Configuration for the archival scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between archival runs
    pub interval: Duration,
    /// Whether the scheduler is enabled
    pub enabled: bool,
    /// Age past which records are archived
    pub age_threshold: Duration,
    /// Candidates per run
    pub batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&TieringConfig::default())
    }
}

impl From<&TieringConfig> for SchedulerConfig {
    fn from(config: &TieringConfig) -> Self {
        Self {
            interval: config.schedule_interval(),
            enabled: true,
            age_threshold: config.age_threshold(),
            batch_size: config.batch_size,
        }
    }
}

/// Runs an [`ArchivalJob`] on a fixed interval until shut down.
pub struct ArchivalScheduler {
    job: Arc<ArchivalJob>,
    config: SchedulerConfig,
    /// Summary of the most recent run
    last_run: RwLock<Option<ArchivalSummary>>,
    runs: AtomicU64,
}

impl ArchivalScheduler {
    pub fn new(job: Arc<ArchivalJob>, config: SchedulerConfig) -> Self {
        Self {
            job,
            config,
            last_run: RwLock::new(None),
            runs: AtomicU64::new(0),
        }
    }

    /// Summary of the most recent run, if any.
    pub fn last_run(&self) -> Option<ArchivalSummary> {
        self.last_run.read().clone()
    }

    /// Number of completed runs.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Tick until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// The first run starts immediately. A shutdown during a run cancels it
    /// between records.
    pub async fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("Scheduled archival is disabled, skipping");
            return;
        }

        info!(
            "Starting scheduled archival with {}-second interval",
            self.config.interval.as_secs()
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(&shutdown).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Scheduled archival stopped after {} runs", self.runs());
    }

    /// Execute one archival pass and remember its summary.
    pub async fn run_once(&self, shutdown: &watch::Receiver<bool>) -> ArchivalSummary {
        let report = self
            .job
            .run_until(self.config.age_threshold, self.config.batch_size, shutdown)
            .await;
        let summary = report.summary;

        if let Some(err) = &summary.scan_error {
            error!("Scheduled archival scan failed: {}", err);
        }
        *self.last_run.write() = Some(summary.clone());
        self.runs.fetch_add(1, Ordering::Relaxed);
        summary
    }
}
