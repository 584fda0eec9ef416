//! Durable local key-value persistence.
//!
//! Values are whole JSON documents keyed by string. The file store writes
//! each value to a temp file and renames it into place, so a crash mid-write
//! leaves the previous value intact.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{Result, ZkShareError};

/// A string-keyed store of JSON documents.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Raw bytes stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value under `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Read and deserialize a JSON document.
pub async fn get_json<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON document.
pub async fn put_json<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    store.put(key, &bytes).await
}

/// One file per key under a base directory.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    base_dir: PathBuf,
}

impl FileKvStore {
    /// Open (and create if needed) a store rooted at `base_dir`.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| ZkShareError::LocalStore(format!("{}: {e}", base_dir.display())))?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
        if !valid {
            return Err(ZkShareError::LocalStore(format!("invalid key: {key:?}")));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ZkShareError::LocalStore(format!("{}: {e}", path.display()))),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = path.with_extension("json.tmp");
        let io_err = |e: std::io::Error| ZkShareError::LocalStore(format!("{}: {e}", path.display()));

        let mut file = File::create(&temp_path).await.map_err(io_err)?;
        file.write_all(value).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        fs::rename(&temp_path, &path).await.map_err(io_err)?;
        debug!(key, bytes = value.len(), "wrote local document");
        Ok(())
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ZkShareError::LocalStore("memory store poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ZkShareError::LocalStore("memory store poisoned".into()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
