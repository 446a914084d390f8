//! # tiervault
//!
//! Transparent two-tier storage for immutable records.
//!
//! New records land in a low-latency hot store. An [`ArchivalJob`] later moves
//! records older than an age threshold into a cheaper, durable cold store. Reads
//! go through [`TieredStore`], which checks the hot tier and then the cold tier,
//! so callers never name a tier.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tiervault::{ArchivalJob, MemoryColdStore, MemoryHotStore, TieredStore};
//!
//! # async fn demo() -> Result<(), tiervault::TierError> {
//! let hot = Arc::new(MemoryHotStore::new());
//! let cold = Arc::new(MemoryColdStore::new());
//!
//! let store = TieredStore::new(hot.clone(), cold.clone());
//! store.insert("r1", "c1", serde_json::json!({"total": 42})).await?;
//!
//! let job = ArchivalJob::new(hot, cold);
//! let report = job.run(Duration::from_secs(90 * 86_400), 1000).await;
//! println!("{}", report.summary);
//!
//! assert!(store.get("r1", "c1").await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod archival;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod locator;
pub mod storage;
pub mod telemetry;
pub mod types;

pub use archival::{
    ArchivalJob, ArchivalReport, ArchivalScheduler, ArchivalSummary, JobSettings,
    MigrationOutcome, RecordReport, SchedulerConfig,
};
pub use config::TieringConfig;
pub use error::{ConfigError, MigrationFault, StoreError, StoreResult, TierError};
pub use facade::TieredStore;
pub use locator::{cold_key, Locator};
pub use storage::{
    ColdStore, DeleteOutcome, FsColdStore, HotStore, MemoryColdStore, MemoryHotStore,
    ScanCursor, SqliteHotStore,
};
pub use telemetry::{EventRecorder, EventSink, TierEvent};
pub use types::{Clock, ManualClock, Record, RecordKey, SystemClock, Tier};
