//! In-process adapters backed by `parking_lot` locked maps.
//!
//! Used by tests, benchmarks and embedders that want tiering semantics without
//! external stores.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{ColdStore, DeleteOutcome, HotStore, ScanCursor};
use crate::error::{StoreError, StoreResult};
use crate::types::{Record, RecordKey};

/// In-memory hot tier.
#[derive(Debug, Default)]
pub struct MemoryHotStore {
    records: RwLock<HashMap<RecordKey, Record>>,
    closed: AtomicBool,
}

impl MemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record is present, bypassing the async interface.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.read().contains_key(key)
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl HotStore for MemoryHotStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.check_open()?;
        Ok(self.records.read().get(key).cloned())
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        self.check_open()?;
        self.records.write().insert(record.key(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<DeleteOutcome> {
        self.check_open()?;
        Ok(match self.records.write().remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::AlreadyAbsent,
        })
    }

    async fn scan_older_than(
        &self,
        cutoff_ms: u64,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        self.check_open()?;
        let records = self.records.read();
        let mut eligible: Vec<Record> = records
            .values()
            .filter(|r| r.timestamp_ms < cutoff_ms)
            .filter(|r| after.map_or(true, |cursor| cursor.precedes(r)))
            .cloned()
            .collect();
        drop(records);

        eligible.sort_by(|a, b| {
            (a.timestamp_ms, &a.partition_key, &a.id).cmp(&(b.timestamp_ms, &b.partition_key, &b.id))
        });
        eligible.truncate(limit);
        Ok(eligible)
    }

    async fn len(&self) -> StoreResult<usize> {
        self.check_open()?;
        Ok(self.records.read().len())
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// In-memory cold tier.
#[derive(Debug, Default)]
pub struct MemoryColdStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryColdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of all stored objects, in order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl ColdStore for MemoryColdStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.check_open()?;
        self.objects.write().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.objects.read().get(key).cloned())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check_open()?;
        Ok(self.objects.read().contains_key(key))
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
