//! Cold storage - filesystem object store.
//!
//! Object key `"c1/r1"` maps to `<root>/c1/r1.obj`. Writes are whole-object
//! replacements:
//!
//! 1. write bytes to a uniquely named temp file beside the target
//! 2. `fsync` the temp file
//! 3. atomically rename over the target
//!
//! A reader therefore sees either the previous object or the new one, never a
//! partial write, and concurrent writers of the same key do not clobber each
//! other's temp files. A put that fails before the rename leaves no object.

use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::ColdStore;
use crate::error::{StoreError, StoreResult};

const OBJECT_EXTENSION: &str = "obj";

/// Directory-backed cold tier.
#[derive(Debug)]
pub struct FsColdStore {
    root: PathBuf,
    closed: Arc<AtomicBool>,
}

impl FsColdStore {
    /// Open or create a cold store rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for an object key.
    ///
    /// Keys are `/`-separated relative paths made of normal components only.
    pub fn object_path(&self, key: &str) -> StoreResult<PathBuf> {
        let bad_segment = key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\0'));
        let relative = Path::new(key);
        if bad_segment
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.join(relative);
        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("{}.{}", name, OBJECT_EXTENSION),
            None => return Err(StoreError::InvalidKey(key.to_string())),
        };
        path.set_file_name(file_name);
        Ok(path)
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn blocking<T, F>(f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> StoreResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| StoreError::Unavailable(format!("cold store task failed: {}", e)))?
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    let result = (|| -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        fs::remove_file(&tmp_path).ok();
    }
    result
}

#[async_trait]
impl ColdStore for FsColdStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.check_open()?;
        let path = self.object_path(key)?;
        Self::blocking(move || write_atomically(&path, &bytes)).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_open()?;
        let path = self.object_path(key)?;
        Self::blocking(move || match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        })
        .await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check_open()?;
        let path = self.object_path(key)?;
        Self::blocking(move || match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        })
        .await
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
