//! Unified error types for the zkshare toolkit.

use std::path::PathBuf;
use thiserror::Error;

use crate::chain::NetworkEnvironment;
use crate::progress::Stage;

/// All errors that can occur during zkshare operations.
#[derive(Error, Debug)]
pub enum ZkShareError {
    // --- Configuration ---

    /// The configuration file (`zkshare.config.json`) was not found.
    #[error("config file not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file exists but contains invalid JSON.
    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The specified network is not one of: `devnet`, `testnet`, `mainnet`.
    #[error("unknown network: {0} (supported: devnet, testnet, mainnet)")]
    UnknownNetwork(String),

    // --- Content store ---

    /// The identifier is absent from the cache, the local store and every gateway.
    #[error("content not found: {0}")]
    NotFound(String),

    /// Both the remote provider and the local fallback failed to store an artifact.
    #[error("upload failed (remote: {remote}; local: {local})")]
    UploadFailed { remote: String, local: String },

    /// The durable local store could not be read or written.
    #[error("local store error: {0}")]
    LocalStore(String),

    /// An artifact or collection could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Chain ---

    /// The RPC endpoint could not be reached (connect error, timeout, non-2xx).
    #[error("network unreachable at {endpoint}: {reason}")]
    NetworkUnreachable { endpoint: String, reason: String },

    /// The RPC endpoint answered with a JSON-RPC error or a malformed body.
    #[error("rpc {method} failed: {reason}")]
    Rpc { method: String, reason: String },

    /// An account reference is not a valid base58 32-byte key.
    #[error("invalid account reference: {0}")]
    InvalidAccount(String),

    /// The environment's RPC endpoint did not report itself healthy.
    #[error("environment {0} is not ready")]
    EnvironmentNotReady(NetworkEnvironment),

    /// The operation is refused on this environment (e.g. airdrop on mainnet).
    #[error("{operation} is not available on {environment}")]
    InvalidEnvironment {
        operation: String,
        environment: NetworkEnvironment,
    },

    /// A transaction cannot be encoded (too many accounts, or a length
    /// beyond its compact-u16 prefix).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The serialized transaction exceeds the network's size limit.
    #[error("transaction is {size} bytes, over the {max}-byte limit")]
    TransactionTooLarge { size: usize, max: usize },

    // --- Orchestration ---

    /// The external signer declined, failed, or returned an unusable transaction.
    #[error("signer rejected the transaction: {0}")]
    SignerRejected(String),

    /// The network refused the signed transaction.
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// The transaction was submitted but not confirmed in time. Poll `signature` later.
    #[error("transaction {signature} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { signature: String, waited_secs: u64 },

    /// The transaction landed but the ledger reports it as failed.
    #[error("transaction {signature} failed on-chain: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// The confirmed transaction carries no decodable verification outcome.
    #[error("transaction {signature} produced no recognizable verification outcome")]
    UnrecognizedOutcome { signature: String },

    /// An orchestrated operation failed at `stage`; the remaining stages were not run.
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<ZkShareError>,
    },

    // --- General ---

    /// A filesystem I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A catch-all for errors from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ZkShareError {
    /// Attribute this error to an orchestration stage.
    pub fn at(self, stage: Stage) -> Self {
        Self::StageFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage an orchestrated call failed at, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage attribution stripped.
    pub fn root(&self) -> &ZkShareError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Alias for `Result<T, ZkShareError>`.
pub type Result<T> = std::result::Result<T, ZkShareError>;
