//! Locally persisted gallery of published circuits.
//!
//! The whole collection is one document in the [`KvStore`]. Every mutation
//! reads, modifies and writes it back while holding the index lock, so
//! concurrent publishers never interleave and a failed write leaves the
//! previously persisted collection untouched.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::artifact::{GalleryEntry, SharedCircuit};
use crate::error::{Result, ZkShareError};
use crate::kv::{get_json, put_json, KvStore};

const GALLERY_KEY: &str = "gallery";

/// Sort order for [`GalleryIndex::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryOrder {
    /// Newest first.
    Recent,
    /// Highest `views + likes` first; ties keep storage order.
    Popular,
}

impl FromStr for GalleryOrder {
    type Err = ZkShareError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "recent" => Ok(Self::Recent),
            "popular" => Ok(Self::Popular),
            other => Err(ZkShareError::Other(anyhow::anyhow!(
                "unknown gallery order: {other} (supported: recent, popular)"
            ))),
        }
    }
}

/// Rankable, searchable list of published circuits.
pub struct GalleryIndex {
    store: Arc<dyn KvStore>,
    lock: Mutex<()>,
}

impl GalleryIndex {
    /// Maximum number of retained entries.
    pub const MAX_ENTRIES: usize = 100;

    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Up to `limit` entries in `order`.
    pub async fn list(&self, order: GalleryOrder, limit: usize) -> Result<Vec<GalleryEntry>> {
        let mut entries = {
            let _guard = self.lock.lock().await;
            self.load().await?
        };
        match order {
            GalleryOrder::Recent => entries.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            GalleryOrder::Popular => entries.sort_by(|a, b| b.popularity().cmp(&a.popularity())),
        }
        entries.truncate(limit);
        Ok(entries)
    }

    /// Insert or update the entry for a published circuit, keyed by its id.
    ///
    /// Updates keep the entry's position and counters. New entries go to the
    /// front; the collection is then cut back to [`Self::MAX_ENTRIES`].
    pub async fn add(&self, circuit: &SharedCircuit) -> Result<()> {
        let id = circuit.id.as_deref().ok_or_else(|| {
            ZkShareError::Other(anyhow::anyhow!("cannot list an unpublished circuit"))
        })?;

        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;

        match entries.iter_mut().find(|e| e.id == id) {
            Some(existing) => {
                debug!(id, "updating gallery entry");
                existing.update_from(circuit);
            }
            None => {
                debug!(id, "adding gallery entry");
                entries.insert(0, GalleryEntry::from_circuit(id, circuit));
                entries.truncate(Self::MAX_ENTRIES);
            }
        }

        self.save(&entries).await
    }

    /// Count a view. Returns `false` (and writes nothing) if `id` is not listed.
    pub async fn increment_views(&self, id: &str) -> Result<bool> {
        self.bump(id, |e| e.views = e.views.saturating_add(1)).await
    }

    /// Count a like. Returns `false` (and writes nothing) if `id` is not listed.
    pub async fn increment_likes(&self, id: &str) -> Result<bool> {
        self.bump(id, |e| e.likes = e.likes.saturating_add(1)).await
    }

    /// Entries whose title, description or any tag contains `query`, ignoring case.
    pub async fn search(&self, query: &str) -> Result<Vec<GalleryEntry>> {
        let needle = query.to_lowercase();
        let entries = {
            let _guard = self.lock.lock().await;
            self.load().await?
        };
        Ok(entries.into_iter().filter(|e| e.matches(&needle)).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<GalleryEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|e| e.id == id))
    }

    pub async fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn bump(&self, id: &str, apply: impl FnOnce(&mut GalleryEntry)) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return Ok(false);
        };
        apply(entry);
        self.save(&entries).await?;
        Ok(true)
    }

    async fn load(&self) -> Result<Vec<GalleryEntry>> {
        Ok(get_json(self.store.as_ref(), GALLERY_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, entries: &[GalleryEntry]) -> Result<()> {
        put_json(self.store.as_ref(), GALLERY_KEY, entries).await
    }
}
