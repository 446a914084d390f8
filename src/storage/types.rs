//! Storage data structures shared by hot and cold adapters.

use serde::{Deserialize, Serialize};

use crate::types::Record;

/// Result of a hot-tier delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    /// The record was present and has been removed
    Deleted,
    /// Nothing was stored under the key; equivalent to success
    AlreadyAbsent,
}

/// Position within an age-ordered scan of the hot tier.
///
/// Scans order records by `(timestamp_ms, partition_key, id)`, so the cursor is
/// the last record seen. It lives only for one archival run.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScanCursor {
    pub timestamp_ms: u64,
    pub partition_key: String,
    pub id: String,
}

impl ScanCursor {
    pub fn after(record: &Record) -> Self {
        Self {
            timestamp_ms: record.timestamp_ms,
            partition_key: record.partition_key.clone(),
            id: record.id.clone(),
        }
    }

    /// Whether `record` sorts strictly after this cursor.
    pub fn precedes(&self, record: &Record) -> bool {
        (self.timestamp_ms, self.partition_key.as_str(), self.id.as_str())
            < (record.timestamp_ms, record.partition_key.as_str(), record.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_ordering() {
        let a = Record::with_timestamp("a", "p1", 10, json!(null));
        let b = Record::with_timestamp("b", "p1", 10, json!(null));
        let c = Record::with_timestamp("a", "p0", 11, json!(null));

        let cursor = ScanCursor::after(&a);
        assert!(!cursor.precedes(&a));
        assert!(cursor.precedes(&b));
        assert!(cursor.precedes(&c));
        assert!(!ScanCursor::after(&c).precedes(&b));
    }
}
