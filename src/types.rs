//! Core record types and time helpers shared by both tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ================================================================================================
// RECORD
// ================================================================================================

/// The unit of storage.
///
/// A record is immutable once written. It lives in the hot tier until it ages
/// past the archival threshold, then in the cold tier indefinitely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier, unique within a partition
    pub id: String,
    /// Tenant identifier, first segment of the cold key
    pub partition_key: String,
    /// Creation time (Unix timestamp ms)
    pub timestamp_ms: u64,
    /// Opaque structured document
    pub payload: serde_json::Value,
}

impl Record {
    /// Create a record stamped with the current wall-clock time.
    pub fn new(
        id: impl Into<String>,
        partition_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_timestamp(id, partition_key, now_ms(), payload)
    }

    /// Create a record with an explicit creation timestamp.
    pub fn with_timestamp(
        id: impl Into<String>,
        partition_key: impl Into<String>,
        timestamp_ms: u64,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            partition_key: partition_key.into(),
            timestamp_ms,
            payload,
        }
    }

    /// Identity of this record, unvalidated.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            partition_key: self.partition_key.clone(),
            id: self.id.clone(),
        }
    }
}

// ================================================================================================
// RECORD KEY
// ================================================================================================

/// `(partition_key, id)`: a record's identity across both tiers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub partition_key: String,
    pub id: String,
}

impl RecordKey {
    /// Build a validated key.
    ///
    /// Components must be non-empty, must not contain `/` or NUL, and must not
    /// be `.` or `..`. This keeps `partition_key/id` injective and usable as a
    /// relative object path.
    pub fn new(partition_key: impl Into<String>, id: impl Into<String>) -> Result<Self, String> {
        let key = Self {
            partition_key: partition_key.into(),
            id: id.into(),
        };
        key.validate()?;
        Ok(key)
    }

    /// Check both components against the key rules.
    pub fn validate(&self) -> Result<(), String> {
        validate_component("partition_key", &self.partition_key)?;
        validate_component("id", &self.id)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.id)
    }
}

fn validate_component(name: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} must not be empty", name));
    }
    if value == "." || value == ".." {
        return Err(format!("{} must not be '{}'", name, value));
    }
    if value.contains('/') {
        return Err(format!("{} must not contain '/': {:?}", name, value));
    }
    if value.contains('\0') {
        return Err(format!("{} must not contain NUL", name));
    }
    Ok(())
}

// ================================================================================================
// TIERS
// ================================================================================================

/// Storage tier levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Low-latency primary store for recent records
    Hot,
    /// Durable, lower-cost store for archived records
    Cold,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Hot => write!(f, "hot"),
            Tier::Cold => write!(f, "cold"),
        }
    }
}

// ================================================================================================
// CLOCK
// ================================================================================================

/// Source of "now" for age-threshold decisions and default timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
