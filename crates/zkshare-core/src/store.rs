//! Content-addressed publish and retrieve.
//!
//! Uploads go to the remote IPFS provider first. If that fails for any
//! reason the store derives a local identifier ([`CidHasher`]) and persists
//! the artifact in the durable [`KvStore`]. Either way the artifact lands in
//! the in-memory cache, so an uploaded id always resolves for the lifetime
//! of the process.
//!
//! Downloads resolve in a fixed order: cache, local store, then each gateway
//! in priority order with a per-gateway timeout. A failing gateway is skipped
//! and not retried within the same call.
//!
//! The cache is unbounded and never evicted; use
//! [`ContentStore::download_uncached`] when fresh data is required.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::artifact::SharedCircuit;
use crate::cid::CidHasher;
use crate::config::StorageConfig;
use crate::error::{Result, ZkShareError};
use crate::kv::KvStore;

/// Read-only retrieval endpoints, in fixed priority order.
#[derive(Debug, Clone)]
pub struct GatewaySet {
    bases: Vec<String>,
    timeout: Duration,
}

impl GatewaySet {
    pub fn new<I, S>(bases: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bases: bases
                .into_iter()
                .map(|b| b.into().trim_end_matches('/').to_string())
                .collect(),
            timeout,
        }
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Public URL of `id` on the highest-priority gateway.
    pub fn url_for(&self, id: &str) -> Option<String> {
        self.bases.first().map(|base| format!("{base}/{id}"))
    }
}

/// Which path stored an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredVia {
    Remote,
    Local,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub id: String,
    pub url: String,
    pub via: StoredVia,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Publish and retrieve [`SharedCircuit`]s by content identifier.
pub struct ContentStore {
    client: reqwest::Client,
    api_url: String,
    api_token: Option<String>,
    gateways: GatewaySet,
    local: Arc<dyn KvStore>,
    cache: DashMap<String, SharedCircuit>,
}

impl ContentStore {
    /// Build a store from configuration and a durable local backend.
    pub fn new(config: &StorageConfig, local: Arc<dyn KvStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.upload_timeout_ms))
            .build()
            .map_err(|e| ZkShareError::Other(anyhow::anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            gateways: GatewaySet::new(
                config.gateways.iter().cloned(),
                Duration::from_millis(config.gateway_timeout_ms),
            ),
            local,
            cache: DashMap::new(),
        })
    }

    pub fn gateways(&self) -> &GatewaySet {
        &self.gateways
    }

    /// Store `artifact`, falling back to local persistence if the provider fails.
    ///
    /// Errors only when the remote provider and the local store both fail.
    #[instrument(skip(self, artifact), fields(title = %artifact.title))]
    pub async fn upload(&self, artifact: &SharedCircuit) -> Result<Stored> {
        let bytes = artifact.content_bytes()?;

        let remote_err = match self.upload_remote(&bytes).await {
            Ok(id) => {
                info!(id = %id, "stored on remote provider");
                self.cache.insert(id.clone(), artifact.clone().with_id(&id));
                let url = self.public_url(&id);
                return Ok(Stored {
                    id,
                    url,
                    via: StoredVia::Remote,
                });
            }
            Err(e) => e,
        };
        warn!(error = %remote_err, "remote upload failed, storing locally");

        let id = CidHasher::cid(&bytes);
        let stored = artifact.clone().with_id(&id);
        if let Err(local_err) = self.local.put(&local_key(&id), &bytes).await {
            return Err(ZkShareError::UploadFailed {
                remote: remote_err.to_string(),
                local: local_err.to_string(),
            });
        }
        self.cache.insert(id.clone(), stored);
        info!(id = %id, "stored locally");

        Ok(Stored {
            url: format!("local://{id}"),
            id,
            via: StoredVia::Local,
        })
    }

    /// Resolve `id` via cache, local store, then gateways.
    pub async fn download(&self, id: &str) -> Result<SharedCircuit> {
        if let Some(hit) = self.cache.get(id) {
            debug!(id, "cache hit");
            return Ok(hit.value().clone());
        }
        self.download_uncached(id).await
    }

    /// Resolve `id` skipping the in-memory cache. A successful result refreshes the cache.
    #[instrument(skip(self))]
    pub async fn download_uncached(&self, id: &str) -> Result<SharedCircuit> {
        match self.read_local(id).await {
            Ok(Some(artifact)) => {
                debug!("local store hit");
                self.cache.insert(id.to_string(), artifact.clone());
                return Ok(artifact);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "local store read failed"),
        }

        for base in self.gateways.bases() {
            match self.fetch_gateway(base, id).await {
                Ok(artifact) => {
                    debug!(gateway = %base, "gateway hit");
                    self.cache.insert(id.to_string(), artifact.clone());
                    return Ok(artifact);
                }
                Err(e) => warn!(gateway = %base, error = %e, "gateway failed, trying next"),
            }
        }

        Err(ZkShareError::NotFound(id.to_string()))
    }

    /// Ask the provider to pin `id`. Best effort: any failure yields `false`.
    pub async fn pin(&self, id: &str) -> bool {
        let url = format!("{}/api/v0/pin/add", self.api_url);
        let request = self.authorized(self.client.post(&url).query(&[("arg", id)]));
        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(id, "pinned");
                true
            }
            Ok(resp) => {
                warn!(id, status = %resp.status(), "pin rejected");
                false
            }
            Err(e) => {
                warn!(id, error = %e, "pin request failed");
                false
            }
        }
    }

    async fn upload_remote(&self, bytes: &[u8]) -> Result<String> {
        let url = format!("{}/api/v0/add", self.api_url);
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name("circuit.json")
            .mime_str("application/json")
            .map_err(|e| remote_err(&url, e))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .authorized(self.client.post(&url).multipart(form))
            .send()
            .await
            .map_err(|e| remote_err(&url, e))?;

        if !resp.status().is_success() {
            return Err(ZkShareError::NetworkUnreachable {
                endpoint: url,
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let body: AddResponse = resp.json().await.map_err(|e| remote_err(&url, e))?;
        Ok(body.hash)
    }

    async fn read_local(&self, id: &str) -> Result<Option<SharedCircuit>> {
        match self.local.get(&local_key(id)).await? {
            Some(bytes) => {
                let artifact: SharedCircuit = serde_json::from_slice(&bytes)?;
                Ok(Some(artifact.with_id(id)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_gateway(&self, base: &str, id: &str) -> Result<SharedCircuit> {
        let url = format!("{base}/{id}");
        let resp = self
            .client
            .get(&url)
            .timeout(self.gateways.timeout())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ZkShareError::NetworkUnreachable {
                        endpoint: url.clone(),
                        reason: format!("gateway timeout after {:?}", self.gateways.timeout()),
                    }
                } else {
                    remote_err(&url, e)
                }
            })?;

        if !resp.status().is_success() {
            return Err(ZkShareError::NetworkUnreachable {
                endpoint: url,
                reason: format!("HTTP {}", resp.status()),
            });
        }

        let artifact: SharedCircuit = resp.json().await.map_err(|e| remote_err(&url, e))?;
        Ok(artifact.with_id(id))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn public_url(&self, id: &str) -> String {
        self.gateways
            .url_for(id)
            .unwrap_or_else(|| format!("ipfs://{id}"))
    }
}

fn local_key(id: &str) -> String {
    format!("circuit-{id}")
}

fn remote_err(endpoint: &str, e: reqwest::Error) -> ZkShareError {
    ZkShareError::NetworkUnreachable {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}
