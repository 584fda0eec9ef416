//! CLI command implementations for zkshare.
//!
//! Each module corresponds to a subcommand (`zkshare <command>`). Services
//! are built per invocation from a [`Context`].

pub mod account;
pub mod deploy;
pub mod estimate;
pub mod fetch;
pub mod gallery;
pub mod publish;
pub mod status;
pub mod verify;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use zkshare_core::chain::{ChainClient, NetworkEnvironment};
use zkshare_core::config::ZkShareConfig;
use zkshare_core::gallery::GalleryIndex;
use zkshare_core::kv::{FileKvStore, KvStore};
use zkshare_core::store::ContentStore;

/// Loaded configuration plus the directory it was found in.
pub struct Context {
    pub config: ZkShareConfig,
    pub project_dir: PathBuf,
}

impl Context {
    /// Load the config file (or defaults) and apply a `--network` override.
    pub fn load(config_path: &Path, network: Option<NetworkEnvironment>) -> Result<Self> {
        let mut config = ZkShareConfig::load_or_default(config_path)?;
        if let Some(network) = network {
            config.chain.environment = network;
        }
        let project_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Ok(Self {
            config,
            project_dir,
        })
    }

    /// `target/` next to the config file; deployment records live here.
    pub fn target_dir(&self) -> PathBuf {
        self.project_dir.join("target")
    }

    pub fn chain(&self) -> Arc<ChainClient> {
        Arc::new(ChainClient::new(self.config.chain.clone()))
    }

    async fn kv(&self) -> Result<Arc<dyn KvStore>> {
        let dir = self.project_dir.join(&self.config.storage.data_dir);
        let kv = FileKvStore::open(dir.clone())
            .await
            .with_context(|| format!("failed to open local store at {}", dir.display()))?;
        Ok(Arc::new(kv))
    }

    /// Content store and gallery sharing one local store.
    pub async fn content(&self) -> Result<(ContentStore, GalleryIndex)> {
        let kv = self.kv().await?;
        let store = ContentStore::new(&self.config.storage, kv.clone())?;
        Ok((store, GalleryIndex::new(kv)))
    }

    pub async fn gallery(&self) -> Result<GalleryIndex> {
        Ok(GalleryIndex::new(self.kv().await?))
    }
}
