//! Shared fixtures: fault-injecting adapters and a clocked test harness.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use tiervault::telemetry::MemoryEventSink;
use tiervault::{
    ArchivalJob, ColdStore, DeleteOutcome, EventRecorder, HotStore, JobSettings, ManualClock,
    MemoryColdStore, MemoryHotStore, Record, RecordKey, ScanCursor, StoreError, StoreResult,
    TieredStore,
};

pub const DAY: Duration = Duration::from_secs(86_400);
pub const THRESHOLD: Duration = Duration::from_secs(90 * 86_400);
pub const T0: u64 = 1_700_000_000_000;

/// Hot store wrapper that can fail or stall deletes.
#[derive(Default)]
pub struct FaultyHotStore {
    pub inner: MemoryHotStore,
    /// Number of upcoming deletes that fail
    failing_deletes: AtomicUsize,
    /// Extra latency injected into every delete
    delete_delay: Mutex<Option<Duration>>,
    pub deletes_attempted: AtomicUsize,
}

impl FaultyHotStore {
    pub fn fail_next_deletes(&self, n: usize) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    pub fn stall_deletes(&self, delay: Duration) {
        *self.delete_delay.lock() = Some(delay);
    }

    pub fn contains(&self, partition_key: &str, id: &str) -> bool {
        self.inner
            .contains(&RecordKey::new(partition_key, id).expect("valid key"))
    }
}

#[async_trait]
impl HotStore for FaultyHotStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        self.inner.get(key).await
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        self.inner.put(record).await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<DeleteOutcome> {
        self.deletes_attempted.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delete_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let should_fail = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete(key).await
    }

    async fn scan_older_than(
        &self,
        cutoff_ms: u64,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        self.inner.scan_older_than(cutoff_ms, after, limit).await
    }

    async fn len(&self) -> StoreResult<usize> {
        self.inner.len().await
    }
}

/// Cold store wrapper that rejects writes for chosen keys and counts puts.
#[derive(Default)]
pub struct FaultyColdStore {
    pub inner: MemoryColdStore,
    failing_keys: Mutex<HashSet<String>>,
    pub puts: AtomicUsize,
    /// Signal shutdown once the put count reaches this value
    shutdown_after: Mutex<Option<(usize, watch::Sender<bool>)>>,
}

impl FaultyColdStore {
    pub fn fail_puts_for(&self, key: &str) {
        self.failing_keys.lock().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing_keys.lock().clear();
    }

    /// Returns a receiver that flips to `true` when a successful write brings the
    /// put count to `puts`.
    pub fn shutdown_after_puts(&self, puts: usize) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        *self.shutdown_after.lock() = Some((puts, tx));
        rx
    }
}

#[async_trait]
impl ColdStore for FaultyColdStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.lock().contains(key) {
            return Err(StoreError::Unavailable(format!("injected put failure for {}", key)));
        }
        self.inner.put(key, bytes).await?;

        let count = self.puts.load(Ordering::SeqCst);
        if let Some((after, tx)) = &*self.shutdown_after.lock() {
            if count >= *after {
                tx.send(true).ok();
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key).await
    }
}

/// Facade, job, and stores wired to one manual clock and one event sink.
pub struct Harness {
    pub hot: Arc<FaultyHotStore>,
    pub cold: Arc<FaultyColdStore>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<MemoryEventSink>,
    pub store: TieredStore,
    pub job: ArchivalJob,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(JobSettings::default())
    }

    pub fn with_settings(settings: JobSettings) -> Self {
        let hot = Arc::new(FaultyHotStore::default());
        let cold = Arc::new(FaultyColdStore::default());
        let clock = Arc::new(ManualClock::new(T0));
        let sink = Arc::new(MemoryEventSink::new());
        let events = Arc::new(EventRecorder::new(sink.clone()));

        let store = TieredStore::new(hot.clone(), cold.clone())
            .with_clock(clock.clone())
            .with_events(events.clone());
        let job = ArchivalJob::new(hot.clone(), cold.clone())
            .with_settings(settings)
            .with_clock(clock.clone())
            .with_events(events);

        Self {
            hot,
            cold,
            clock,
            sink,
            store,
            job,
        }
    }

    pub fn cold_keys(&self) -> Vec<String> {
        self.cold.inner.keys()
    }
}
