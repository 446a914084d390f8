//! Tier adapters.
//!
//! Two-tier architecture:
//! - **Hot**: point lookups, upserts, deletes and an age-ordered range scan
//!   ([`HotStore`]; [`SqliteHotStore`], [`MemoryHotStore`])
//! - **Cold**: durable object store addressed by `partition_key/id`
//!   ([`ColdStore`]; [`FsColdStore`], [`MemoryColdStore`])
//!
//! Adapters report lookups as explicit values: `Ok(Some(_))` for found,
//! `Ok(None)` for a definitive miss, `Err(_)` for a fault. Callers branch on
//! those values; a miss is never signalled through an error.
//!
//! Adapters are constructed explicitly and shared as `Arc<dyn HotStore>` /
//! `Arc<dyn ColdStore>`. `close` ends their lifecycle; any later call fails
//! with [`StoreError::Closed`].

pub mod cold_store;
pub mod hot_store;
pub mod memory;
pub mod types;

pub use cold_store::FsColdStore;
pub use hot_store::SqliteHotStore;
pub use memory::{MemoryColdStore, MemoryHotStore};
pub use types::{DeleteOutcome, ScanCursor};

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::types::{Record, RecordKey};

/// Low-latency store holding recently written records.
#[async_trait]
pub trait HotStore: Send + Sync {
    /// Point read by `(partition_key, id)`.
    async fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>>;

    /// Upsert a record.
    async fn put(&self, record: &Record) -> StoreResult<()>;

    /// Point delete. Deleting an absent key is not an error.
    async fn delete(&self, key: &RecordKey) -> StoreResult<DeleteOutcome>;

    /// Records with `timestamp_ms < cutoff_ms` across all partitions, ordered by
    /// [`ScanCursor`] order, strictly after `after`, at most `limit` of them.
    async fn scan_older_than(
        &self,
        cutoff_ms: u64,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> StoreResult<Vec<Record>>;

    /// Number of records currently held.
    async fn len(&self) -> StoreResult<usize>;

    /// Release underlying resources.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Durable object store holding archived records.
#[async_trait]
pub trait ColdStore: Send + Sync {
    /// Write an object, replacing any existing object at `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Run a store call under a deadline. Elapsed deadlines become [`StoreError::Timeout`].
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}
