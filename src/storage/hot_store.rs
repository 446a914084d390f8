//! Hot storage - SQLite table keyed by `(partition_key, id)`.
//!
//! # Schema
//! ```text
//! records(
//!   partition_key TEXT, id TEXT, timestamp_ms INTEGER, payload TEXT,
//!   PRIMARY KEY (partition_key, id)
//! )
//! idx_records_age ON records(timestamp_ms, partition_key, id)
//! ```
//!
//! The age index serves the archival scan, which walks records in
//! `(timestamp_ms, partition_key, id)` order and resumes from a [`ScanCursor`].
//!
//! `rusqlite` is blocking, so every call runs on the tokio blocking pool while
//! holding the connection mutex.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DeleteOutcome, HotStore, ScanCursor};
use crate::error::{StoreError, StoreResult};
use crate::types::{Record, RecordKey};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        partition_key TEXT NOT NULL,
        id TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (partition_key, id)
    );
    CREATE INDEX IF NOT EXISTS idx_records_age
        ON records (timestamp_ms, partition_key, id);
";

/// SQLite-backed hot tier.
pub struct SqliteHotStore {
    /// Database file, or `None` for an in-memory database
    path: Option<PathBuf>,
    /// `None` once closed
    conn: Arc<Mutex<Option<Connection>>>,
}

impl std::fmt::Debug for SqliteHotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHotStore")
            .field("path", &self.path)
            .field("open", &self.conn.lock().is_some())
            .finish()
    }
}

impl SqliteHotStore {
    /// Open or create the hot store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn, Some(path))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            match guard.as_ref() {
                Some(conn) => f(conn),
                None => Err(StoreError::Closed),
            }
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("hot store task failed: {}", e)))?
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(String, String, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_row(
    (partition_key, id, timestamp_ms, payload): (String, String, i64, String),
) -> StoreResult<Record> {
    let payload = serde_json::from_str(&payload)
        .map_err(|e| StoreError::Codec(format!("payload of {}/{}: {}", partition_key, id, e)))?;
    Ok(Record {
        id,
        partition_key,
        timestamp_ms: timestamp_ms.max(0) as u64,
        payload,
    })
}

/// Scan bounds above the storable range compare as "everything".
fn to_sql_ts(ts: u64) -> i64 {
    i64::try_from(ts).unwrap_or(i64::MAX)
}

#[async_trait]
impl HotStore for SqliteHotStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<Option<Record>> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT partition_key, id, timestamp_ms, payload FROM records
                     WHERE partition_key = ?1 AND id = ?2",
                    params![key.partition_key, key.id],
                    row_to_record,
                )
                .optional()?;
            row.map(decode_row).transpose()
        })
        .await
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        let timestamp_ms = i64::try_from(record.timestamp_ms).map_err(|_| {
            StoreError::Codec(format!(
                "timestamp_ms of {} out of range: {}",
                record.key(),
                record.timestamp_ms
            ))
        })?;
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::Codec(format!("serialize payload: {}", e)))?;
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO records (partition_key, id, timestamp_ms, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.partition_key,
                    record.id,
                    timestamp_ms,
                    payload
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &RecordKey) -> StoreResult<DeleteOutcome> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM records WHERE partition_key = ?1 AND id = ?2",
                params![key.partition_key, key.id],
            )?;
            Ok(if removed > 0 {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::AlreadyAbsent
            })
        })
        .await
    }

    async fn scan_older_than(
        &self,
        cutoff_ms: u64,
        after: Option<&ScanCursor>,
        limit: usize,
    ) -> StoreResult<Vec<Record>> {
        let after = after.cloned();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let rows: Vec<(String, String, i64, String)> = match after {
                None => {
                    let mut stmt = conn.prepare_cached(
                        "SELECT partition_key, id, timestamp_ms, payload FROM records
                         WHERE timestamp_ms < ?1
                         ORDER BY timestamp_ms, partition_key, id
                         LIMIT ?2",
                    )?;
                    let rows = stmt
                        .query_map(params![to_sql_ts(cutoff_ms), limit], row_to_record)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                Some(cursor) => {
                    let mut stmt = conn.prepare_cached(
                        "SELECT partition_key, id, timestamp_ms, payload FROM records
                         WHERE timestamp_ms < ?1
                           AND (timestamp_ms, partition_key, id) > (?2, ?3, ?4)
                         ORDER BY timestamp_ms, partition_key, id
                         LIMIT ?5",
                    )?;
                    let rows = stmt
                        .query_map(
                            params![
                                to_sql_ts(cutoff_ms),
                                to_sql_ts(cursor.timestamp_ms),
                                cursor.partition_key,
                                cursor.id,
                                limit
                            ],
                            row_to_record,
                        )?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            rows.into_iter().map(decode_row).collect()
        })
        .await
    }

    async fn len(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }

    async fn close(&self) -> StoreResult<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            if let Some(conn) = conn.lock().take() {
                conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("hot store task failed: {}", e)))?
    }
}
