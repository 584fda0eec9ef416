//! `zkshare.config.json`: storage and chain settings.
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chain::rpc::Commitment;
use crate::chain::NetworkEnvironment;
use crate::error::{Result, ZkShareError};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "zkshare.config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZkShareConfig {
    pub storage: StorageConfig,
    pub chain: ChainConfig,
}

impl ZkShareConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ZkShareError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| ZkShareError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ZkShareError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Content provider, gateways and local persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the IPFS HTTP API used for add and pin.
    pub api_url: String,
    /// Bearer token for the provider, if it requires one.
    pub api_token: Option<String>,
    /// Gateway base URLs, highest priority first. `{base}/{cid}` must serve the content.
    pub gateways: Vec<String>,
    /// Per-gateway request timeout.
    pub gateway_timeout_ms: u64,
    /// Timeout for provider requests (add, pin).
    pub upload_timeout_ms: u64,
    /// Directory for the durable local store and gallery.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_url: "https://ipfs.infura.io:5001".into(),
            api_token: None,
            gateways: vec![
                "https://ipfs.io/ipfs".into(),
                "https://dweb.link/ipfs".into(),
                "https://cloudflare-ipfs.com/ipfs".into(),
                "https://gateway.pinata.cloud/ipfs".into(),
            ],
            gateway_timeout_ms: 5_000,
            upload_timeout_ms: 30_000,
            data_dir: PathBuf::from(".zkshare"),
        }
    }
}

/// Ledger environment and transaction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Environment used unless overridden on the command line.
    pub environment: NetworkEnvironment,
    /// RPC endpoint overrides, keyed by environment.
    pub endpoints: BTreeMap<NetworkEnvironment, String>,
    /// Program that owns verifier accounts and executes `verify`.
    pub verifier_program_id: String,
    /// Commitment a submitted transaction must reach to count as confirmed.
    pub commitment: Commitment,
    /// Upper bound on waiting for a submitted transaction to confirm.
    pub confirmation_timeout_secs: u64,
    /// Delay between signature status polls.
    pub poll_interval_ms: u64,
    /// Bytes added to the payload when sizing the verifier account.
    pub account_overhead_bytes: u64,
    /// Flat fee added to cost estimates, in lamports.
    pub nominal_fee_lamports: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            environment: NetworkEnvironment::Devnet,
            endpoints: BTreeMap::new(),
            verifier_program_id: "ZkVer1fier111111111111111111111111111111111".into(),
            commitment: Commitment::Finalized,
            confirmation_timeout_secs: 30,
            poll_interval_ms: 500,
            account_overhead_bytes: 128,
            nominal_fee_lamports: 5_000,
        }
    }
}

impl ChainConfig {
    /// RPC endpoint for `env`: the override if configured, else the public default.
    pub fn endpoint(&self, env: NetworkEnvironment) -> String {
        self.endpoints
            .get(&env)
            .cloned()
            .unwrap_or_else(|| env.default_rpc_url().to_string())
    }
}
