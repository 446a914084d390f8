//! Error types.
//!
//! - [`StoreError`]: a single adapter call failed (I/O, timeout, closed store, bad bytes).
//! - [`TierError`]: what facade callers see. "Not found" is never an error; it is `Ok(None)`.
//! - [`MigrationFault`]: one record's archival attempt failed; reported, never propagated.
//! - [`ConfigError`]: configuration could not be loaded or is invalid.

use std::time::Duration;
use thiserror::Error;

use crate::types::Tier;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of one store adapter operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) | StoreError::Io(_) => true,
            StoreError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            StoreError::Closed | StoreError::Codec(_) | StoreError::InvalidKey(_) => false,
        }
    }
}

/// Error returned by [`TieredStore`](crate::facade::TieredStore).
#[derive(Debug, Error)]
pub enum TierError {
    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("transient fault in {tier} store: {source}")]
    TransientStoreFault {
        tier: Tier,
        #[source]
        source: StoreError,
    },

    #[error("corrupt archived record at {key}: {reason}")]
    CorruptArchive { key: String, reason: String },
}

impl TierError {
    pub(crate) fn store(tier: Tier, source: StoreError) -> Self {
        TierError::TransientStoreFault { tier, source }
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            TierError::TransientStoreFault { source, .. } => source.is_retryable(),
            TierError::InvalidKey(_) | TierError::CorruptArchive { .. } => false,
        }
    }
}

/// Per-record archival failure, as recorded in an archival report.
///
/// Neither variant loses data; at least one tier holds the record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MigrationFault {
    /// The cold write was not confirmed. The record is untouched in the hot
    /// tier and the next run retries it whole.
    #[error("cold write failed for {key}: {reason}")]
    PartialMigration { key: String, reason: String },

    /// The cold copy is confirmed but the hot delete failed. The record is
    /// readable from both tiers until a later run deletes the hot copy.
    #[error("hot delete failed for {key} after cold write: {reason}")]
    DuplicatedAfterFault { key: String, reason: String },
}

/// Failure to load or validate [`TieringConfig`](crate::config::TieringConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Timeout(Duration::from_millis(5)).is_retryable());
        assert!(StoreError::Unavailable("down".into()).is_retryable());
        assert!(!StoreError::Closed.is_retryable());
        assert!(!StoreError::Codec("bad magic".into()).is_retryable());

        let err = TierError::store(Tier::Hot, StoreError::Timeout(Duration::from_secs(1)));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("hot store"));
    }
}
