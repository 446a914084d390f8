//! Archival - migration of aged records from the hot tier to the cold tier.
//!
//! - [`ArchivalJob`]: one bounded, idempotent migration pass
//! - [`ArchivalScheduler`]: optional fixed-interval trigger for the job

pub mod job;
pub mod report;
pub mod scheduler;

pub use job::{ArchivalJob, JobSettings};
pub use report::{ArchivalReport, ArchivalSummary, MigrationOutcome, RecordReport};
pub use scheduler::{ArchivalScheduler, SchedulerConfig};
