//! Tiering configuration.
//!
//! Values are resolved in three layers: built-in defaults, an optional JSON file,
//! then `TIERVAULT_*` environment variables. The result is validated before use.
//!
//! Store locations are opaque to the tiering core; they only reach the concrete
//! adapters built by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Configuration for the tiering core and its default adapters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieringConfig {
    /// Records older than this become migration-eligible
    pub age_threshold_days: u64,
    /// Max candidates processed per archival run
    pub batch_size: usize,
    /// Rows fetched per hot-store scan page
    pub scan_page_size: usize,
    /// Records migrated concurrently within one run
    pub parallelism: usize,
    /// Timeout applied to every individual store call
    pub op_timeout_ms: u64,
    /// Confirm each cold write with an `exists` check before deleting from hot
    pub verify_cold_writes: bool,
    /// Gzip archived record bodies
    pub compress_cold: bool,
    /// SQLite database backing the hot tier
    pub hot_store_path: PathBuf,
    /// Root directory of the cold object store
    pub cold_store_root: PathBuf,
    /// Interval used by the bundled scheduler
    pub schedule_interval_secs: u64,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            age_threshold_days: 90,
            batch_size: 1000,
            scan_page_size: 256,
            parallelism: 8,
            op_timeout_ms: 5_000,
            verify_cold_writes: false,
            compress_cold: true,
            hot_store_path: PathBuf::from("./var/data/hot_store.db"),
            cold_store_root: PathBuf::from("./var/data/cold"),
            schedule_interval_secs: 60 * 60,
        }
    }
}

impl TieringConfig {
    /// Load from an optional JSON file, apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Apply `TIERVAULT_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TIERVAULT_AGE_THRESHOLD_DAYS") {
            self.age_threshold_days = parse_var("TIERVAULT_AGE_THRESHOLD_DAYS", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_BATCH_SIZE") {
            self.batch_size = parse_var("TIERVAULT_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_SCAN_PAGE_SIZE") {
            self.scan_page_size = parse_var("TIERVAULT_SCAN_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_PARALLELISM") {
            self.parallelism = parse_var("TIERVAULT_PARALLELISM", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_OP_TIMEOUT_MS") {
            self.op_timeout_ms = parse_var("TIERVAULT_OP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_VERIFY_COLD_WRITES") {
            self.verify_cold_writes = parse_var("TIERVAULT_VERIFY_COLD_WRITES", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_COMPRESS_COLD") {
            self.compress_cold = parse_var("TIERVAULT_COMPRESS_COLD", &v)?;
        }
        if let Some(v) = lookup("TIERVAULT_HOT_STORE_PATH") {
            self.hot_store_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TIERVAULT_COLD_STORE_ROOT") {
            self.cold_store_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("TIERVAULT_SCHEDULE_INTERVAL_SECS") {
            self.schedule_interval_secs = parse_var("TIERVAULT_SCHEDULE_INTERVAL_SECS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be > 0".into()));
        }
        if self.scan_page_size == 0 {
            return Err(ConfigError::Invalid("scan_page_size must be > 0".into()));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid("parallelism must be > 0".into()));
        }
        if self.op_timeout_ms == 0 {
            return Err(ConfigError::Invalid("op_timeout_ms must be > 0".into()));
        }
        if self.schedule_interval_secs == 0 {
            return Err(ConfigError::Invalid("schedule_interval_secs must be > 0".into()));
        }
        if self.age_threshold_days.checked_mul(DAY_MS).is_none() {
            return Err(ConfigError::Invalid("age_threshold_days is too large".into()));
        }
        Ok(())
    }

    pub fn age_threshold(&self) -> Duration {
        Duration::from_millis(self.age_threshold_days.saturating_mul(DAY_MS))
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{}={:?}: {}", name, value, e)))
}
