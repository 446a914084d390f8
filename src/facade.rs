//! Unified read/write surface over both tiers.
//!
//! Callers address records by `(id, partition_key)` only. Writes always land in
//! the hot tier; reads go through the [`Locator`]. Which tier answered is never
//! part of the result.
//!
//! The facade does not retry. A store fault comes back as
//! [`TierError::TransientStoreFault`] so read latency stays bounded by one
//! timeout per tier.

use log::debug;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TieringConfig;
use crate::error::{StoreResult, TierError};
use crate::locator::Locator;
use crate::storage::{with_timeout, ColdStore, HotStore};
use crate::telemetry::{EventRecorder, TierEvent};
use crate::types::{Clock, Record, RecordKey, SystemClock, Tier};

/// Transparent two-tier record store.
pub struct TieredStore {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    clock: Arc<dyn Clock>,
    events: Arc<EventRecorder>,
    op_timeout: Duration,
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("op_timeout", &self.op_timeout)
            .field("events", &self.events)
            .finish()
    }
}

impl TieredStore {
    /// Create a facade over the given adapters with default settings.
    pub fn new(hot: Arc<dyn HotStore>, cold: Arc<dyn ColdStore>) -> Self {
        Self {
            hot,
            cold,
            clock: Arc::new(SystemClock),
            events: Arc::new(EventRecorder::default()),
            op_timeout: TieringConfig::default().op_timeout(),
        }
    }

    /// Create a facade using the timeout from `config`.
    pub fn from_config(
        hot: Arc<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
        config: &TieringConfig,
    ) -> Self {
        Self::new(hot, cold).with_op_timeout(config.op_timeout())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<EventRecorder>) -> Self {
        self.events = events;
        self
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn events(&self) -> &Arc<EventRecorder> {
        &self.events
    }

    /// Store a record in the hot tier.
    ///
    /// Once this returns `Ok`, `get` with the same identity returns the record.
    pub async fn put(&self, record: Record) -> Result<(), TierError> {
        record.key().validate().map_err(TierError::InvalidKey)?;
        with_timeout(self.op_timeout, self.hot.put(&record))
            .await
            .map_err(|e| TierError::store(Tier::Hot, e))
    }

    /// Store a new record stamped with the facade clock's current time.
    pub async fn insert(
        &self,
        id: impl Into<String>,
        partition_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Record, TierError> {
        let record = Record::with_timestamp(id, partition_key, self.clock.now_ms(), payload);
        self.put(record.clone()).await?;
        Ok(record)
    }

    /// Fetch a record from whichever tier holds it.
    ///
    /// `Ok(None)` means neither tier has the record; that is a normal outcome.
    pub async fn get(&self, id: &str, partition_key: &str) -> Result<Option<Record>, TierError> {
        let key = RecordKey::new(partition_key, id).map_err(TierError::InvalidKey)?;
        let locator = Locator::new(self.hot.as_ref(), self.cold.as_ref(), self.op_timeout);

        match locator.locate(&key).await? {
            Some(located) => {
                if located.tier == Tier::Cold {
                    debug!("Served {} from cold tier", key);
                    self.events.record(TierEvent::ServedFromCold {
                        partition_key: key.partition_key,
                        id: key.id,
                    });
                }
                Ok(Some(located.record))
            }
            None => {
                debug!("Record {} not found in any tier", key);
                self.events.record(TierEvent::RecordNotFound {
                    partition_key: key.partition_key,
                    id: key.id,
                });
                Ok(None)
            }
        }
    }

    /// Close both adapters.
    pub async fn close(&self) -> StoreResult<()> {
        let hot = self.hot.close().await;
        let cold = self.cold.close().await;
        hot.and(cold)
    }
}
