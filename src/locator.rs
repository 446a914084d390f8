//! Record location across tiers.
//!
//! The hot tier is always consulted first; the cold tier only after a
//! definitive hot miss. A hot fault stops the lookup: falling through to the
//! cold tier then could serve an archived copy while a live hot copy exists.
//!
//! A record mid-migration is safe to read: the cold copy is written before the
//! hot copy is deleted, so a hot miss that races a migration still finds the
//! cold copy.

use std::time::Duration;

use crate::codec::decode_record;
use crate::error::TierError;
use crate::storage::{with_timeout, ColdStore, HotStore};
use crate::types::{Record, RecordKey, Tier};

/// Tiers in lookup order.
pub const LOOKUP_ORDER: [Tier; 2] = [Tier::Hot, Tier::Cold];

/// Cold-store object key for a record identity: `partition_key/id`.
pub fn cold_key(key: &RecordKey) -> String {
    format!("{}/{}", key.partition_key, key.id)
}

/// Inverse of [`cold_key`] for validated keys.
pub fn parse_cold_key(object_key: &str) -> Option<RecordKey> {
    let (partition_key, id) = object_key.split_once('/')?;
    RecordKey::new(partition_key, id).ok()
}

/// A record together with the tier that served it.
#[derive(Clone, Debug, PartialEq)]
pub struct Located {
    pub record: Record,
    pub tier: Tier,
}

/// Resolves records across the hot and cold tiers.
pub struct Locator<'a> {
    hot: &'a dyn HotStore,
    cold: &'a dyn ColdStore,
    op_timeout: Duration,
}

impl<'a> Locator<'a> {
    pub fn new(hot: &'a dyn HotStore, cold: &'a dyn ColdStore, op_timeout: Duration) -> Self {
        Self {
            hot,
            cold,
            op_timeout,
        }
    }

    /// Find a record, hot tier first.
    ///
    /// `Ok(None)` means both tiers definitively reported a miss.
    pub async fn locate(&self, key: &RecordKey) -> Result<Option<Located>, TierError> {
        for tier in LOOKUP_ORDER {
            let found = match tier {
                Tier::Hot => self.lookup_hot(key).await?,
                Tier::Cold => self.lookup_cold(key).await?,
            };
            if let Some(record) = found {
                return Ok(Some(Located { record, tier }));
            }
        }
        Ok(None)
    }

    async fn lookup_hot(&self, key: &RecordKey) -> Result<Option<Record>, TierError> {
        with_timeout(self.op_timeout, self.hot.get(key))
            .await
            .map_err(|e| TierError::store(Tier::Hot, e))
    }

    async fn lookup_cold(&self, key: &RecordKey) -> Result<Option<Record>, TierError> {
        let object_key = cold_key(key);
        let bytes = with_timeout(self.op_timeout, self.cold.get(&object_key))
            .await
            .map_err(|e| TierError::store(Tier::Cold, e))?;

        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let record = decode_record(&bytes).map_err(|e| TierError::CorruptArchive {
            key: object_key.clone(),
            reason: e.to_string(),
        })?;
        if record.partition_key != key.partition_key || record.id != key.id {
            return Err(TierError::CorruptArchive {
                key: object_key,
                reason: format!("object holds {}/{}", record.partition_key, record.id),
            });
        }
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_record;
    use crate::storage::{MemoryColdStore, MemoryHotStore};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn test_cold_key_derivation() {
        let key = RecordKey::new("c1", "r1").unwrap();
        assert_eq!(cold_key(&key), "c1/r1");
        assert_eq!(parse_cold_key("c1/r1"), Some(key));
        assert_eq!(parse_cold_key("c1"), None);
        assert_eq!(parse_cold_key("c1/r1/x"), None);
    }

    #[test]
    fn test_lookup_order_is_hot_first() {
        assert_eq!(LOOKUP_ORDER, [Tier::Hot, Tier::Cold]);
    }

    #[tokio::test]
    async fn test_locate_prefers_hot() {
        let hot = MemoryHotStore::new();
        let cold = MemoryColdStore::new();
        let record = Record::with_timestamp("r1", "c1", 1, json!({"v": "hot"}));
        hot.put(&record).await.unwrap();

        let mut stale = record.clone();
        stale.payload = json!({"v": "cold"});
        cold.put("c1/r1", encode_record(&stale, false).unwrap())
            .await
            .unwrap();

        let locator = Locator::new(&hot, &cold, TIMEOUT);
        let found = locator.locate(&record.key()).await.unwrap().unwrap();
        assert_eq!(found.tier, Tier::Hot);
        assert_eq!(found.record.payload, json!({"v": "hot"}));
    }

    #[tokio::test]
    async fn test_locate_falls_back_to_cold() {
        let hot = MemoryHotStore::new();
        let cold = MemoryColdStore::new();
        let record = Record::with_timestamp("r1", "c1", 1, json!([1, 2]));
        cold.put("c1/r1", encode_record(&record, true).unwrap())
            .await
            .unwrap();

        let locator = Locator::new(&hot, &cold, TIMEOUT);
        let found = locator.locate(&record.key()).await.unwrap().unwrap();
        assert_eq!(found, Located { record, tier: Tier::Cold });
    }

    #[tokio::test]
    async fn test_locate_miss_in_both_tiers() {
        let hot = MemoryHotStore::new();
        let cold = MemoryColdStore::new();
        let locator = Locator::new(&hot, &cold, TIMEOUT);
        let key = RecordKey::new("c1", "missing").unwrap();
        assert_eq!(locator.locate(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hot_fault_does_not_fall_back() {
        let hot = MemoryHotStore::new();
        let cold = MemoryColdStore::new();
        let record = Record::with_timestamp("r1", "c1", 1, json!(1));
        cold.put("c1/r1", encode_record(&record, false).unwrap())
            .await
            .unwrap();
        hot.close().await.unwrap();

        let locator = Locator::new(&hot, &cold, TIMEOUT);
        let err = locator.locate(&record.key()).await.unwrap_err();
        assert!(matches!(
            err,
            TierError::TransientStoreFault { tier: Tier::Hot, .. }
        ));
    }

    #[tokio::test]
    async fn test_mismatched_cold_object_is_corrupt() {
        let hot = MemoryHotStore::new();
        let cold = MemoryColdStore::new();
        let other = Record::with_timestamp("r2", "c1", 1, json!(1));
        cold.put("c1/r1", encode_record(&other, false).unwrap())
            .await
            .unwrap();

        let locator = Locator::new(&hot, &cold, TIMEOUT);
        let key = RecordKey::new("c1", "r1").unwrap();
        assert!(matches!(
            locator.locate(&key).await,
            Err(TierError::CorruptArchive { .. })
        ));
    }
}
