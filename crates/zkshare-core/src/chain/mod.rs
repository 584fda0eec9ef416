//! Ledger client: environment selection, cost estimates and queries.
//!
//! A [`ChainClient`] holds one active [`NetworkEnvironment`] and a lazily
//! built connection to it. [`ChainClient::set_environment`] swaps both for
//! subsequent calls. Work already in flight keeps the [`ChainSession`] it
//! started with and completes (or fails) against the old environment.
//!
//! Known constraint: a caller that switches environments while another
//! task is between two calls of one logical operation races with it. The
//! orchestrators avoid this by binding a single session per call.

pub mod rpc;
pub mod transaction;
pub mod verifier;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::error::{Result, ZkShareError};
use crate::estimator::CostEstimate;
use rpc::{HttpRpc, LedgerRpc, SignatureStatus, TransactionOutcome};
use transaction::{Blockhash, Pubkey, Signature, Transaction};

/// Lamports in one whole unit of the base currency.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// The ledger networks a client can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEnvironment {
    /// Primary test network.
    Devnet,
    /// Secondary test network.
    Testnet,
    /// Production.
    Mainnet,
}

impl NetworkEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::Testnet => "https://api.testnet.solana.com",
            Self::Mainnet => "https://api.mainnet-beta.solana.com",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Block explorer link. No network access.
    pub fn explorer_url(&self, item: ExplorerItem<'_>) -> String {
        let (kind, id) = match item {
            ExplorerItem::Transaction(sig) => ("tx", sig),
            ExplorerItem::Account(account) => ("address", account),
        };
        match self {
            Self::Mainnet => format!("https://explorer.solana.com/{kind}/{id}"),
            other => format!("https://explorer.solana.com/{kind}/{id}?cluster={}", other.as_str()),
        }
    }
}

impl fmt::Display for NetworkEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkEnvironment {
    type Err = ZkShareError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            other => Err(ZkShareError::UnknownNetwork(other.to_string())),
        }
    }
}

/// What an explorer link points at.
#[derive(Debug, Clone, Copy)]
pub enum ExplorerItem<'a> {
    Transaction(&'a str),
    Account(&'a str),
}

/// Builds an RPC handle for an environment and endpoint.
pub type Connector =
    Arc<dyn Fn(NetworkEnvironment, &str) -> Result<Arc<dyn LedgerRpc>> + Send + Sync>;

struct Connection {
    environment: NetworkEnvironment,
    rpc: Arc<dyn LedgerRpc>,
    ready: OnceCell<()>,
}

struct Active {
    environment: NetworkEnvironment,
    connection: Option<Arc<Connection>>,
}

/// Connection to one of several ledger environments.
pub struct ChainClient {
    config: ChainConfig,
    active: RwLock<Active>,
    connector: Connector,
}

impl ChainClient {
    /// A client using JSON-RPC over HTTP.
    pub fn new(config: ChainConfig) -> Self {
        let timeout = Duration::from_secs(config.confirmation_timeout_secs.max(10));
        let connector: Connector = Arc::new(move |_env: NetworkEnvironment, endpoint: &str| {
            Ok(Arc::new(HttpRpc::new(endpoint, timeout)?) as Arc<dyn LedgerRpc>)
        });
        Self::with_connector(config, connector)
    }

    /// A client whose connections come from `connector`.
    pub fn with_connector(config: ChainConfig, connector: Connector) -> Self {
        let environment = config.environment;
        Self {
            config,
            active: RwLock::new(Active {
                environment,
                connection: None,
            }),
            connector,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn environment(&self) -> NetworkEnvironment {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .environment
    }

    /// Switch environments. The connection is dropped and rebuilt on next use.
    pub fn set_environment(&self, environment: NetworkEnvironment) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active.environment != environment {
            info!(from = %active.environment, to = %environment, "switching environment");
            active.environment = environment;
            active.connection = None;
        }
    }

    /// Bind a session to the current environment's connection, creating it if
    /// needed. The first session on a new connection checks node health.
    pub async fn session(&self) -> Result<ChainSession> {
        let connection = self.connection()?;
        connection
            .ready
            .get_or_try_init(|| async {
                match connection.rpc.health().await {
                    Ok(()) => Ok(()),
                    Err(ZkShareError::Rpc { reason, .. }) => {
                        debug!(environment = %connection.environment, reason = %reason, "node not healthy");
                        Err(ZkShareError::EnvironmentNotReady(connection.environment))
                    }
                    Err(other) => Err(other),
                }
            })
            .await?;
        Ok(ChainSession {
            connection: connection.clone(),
            config: self.config.clone(),
        })
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        if let Some(conn) = &self
            .active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .connection
        {
            return Ok(conn.clone());
        }

        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = &active.connection {
            return Ok(conn.clone());
        }
        let environment = active.environment;
        let endpoint = self.config.endpoint(environment);
        debug!(%environment, endpoint = %endpoint, "connecting");
        let conn = Arc::new(Connection {
            environment,
            rpc: (self.connector)(environment, &endpoint)?,
            ready: OnceCell::new(),
        });
        active.connection = Some(conn.clone());
        Ok(conn)
    }

    /// Funding plus fee, in lamports, to deploy a payload of `payload_size` bytes.
    pub async fn estimate_cost(&self, payload_size: u64) -> Result<u64> {
        Ok(self.session().await?.estimate(payload_size).await?.total_lamports())
    }

    /// Itemized cost estimate for a payload of `payload_size` bytes.
    pub async fn estimate(&self, payload_size: u64) -> Result<CostEstimate> {
        self.session().await?.estimate(payload_size).await
    }

    pub async fn get_balance(&self, account: &str) -> Result<u64> {
        let account: Pubkey = account.parse()?;
        self.session().await?.balance(&account).await
    }

    /// Request test funds. Refused on production before any network call.
    pub async fn request_airdrop(&self, account: &str, lamports: u64) -> Result<String> {
        let environment = self.environment();
        if environment.is_production() {
            return Err(ZkShareError::InvalidEnvironment {
                operation: "airdrop".into(),
                environment,
            });
        }
        let account: Pubkey = account.parse()?;
        let session = self.session().await?;
        let signature = session.connection.rpc.request_airdrop(&account, lamports).await?;
        info!(%account, lamports, %signature, "airdrop requested");
        Ok(signature.to_string())
    }

    /// Poll a previously submitted transaction until it reaches the configured
    /// commitment or the confirmation timeout elapses.
    pub async fn wait_for_confirmation(&self, signature: &str) -> Result<SignatureStatus> {
        let signature: Signature = signature.parse()?;
        self.session().await?.wait_for_confirmation(&signature).await
    }

    pub fn explorer_url(&self, item: ExplorerItem<'_>) -> String {
        self.environment().explorer_url(item)
    }
}

/// A handle bound to one connection for the duration of an operation.
#[derive(Clone)]
pub struct ChainSession {
    connection: Arc<Connection>,
    config: ChainConfig,
}

impl ChainSession {
    pub fn environment(&self) -> NetworkEnvironment {
        self.connection.environment
    }

    pub fn endpoint(&self) -> &str {
        self.connection.rpc.endpoint()
    }

    /// Rent-exempt funding for `payload_size + overhead` bytes plus the nominal fee.
    pub async fn estimate(&self, payload_size: u64) -> Result<CostEstimate> {
        let account_size = payload_size + self.config.account_overhead_bytes;
        let rent = self
            .connection
            .rpc
            .minimum_balance_for_rent_exemption(account_size)
            .await?;
        Ok(CostEstimate::new(
            payload_size,
            account_size,
            rent,
            self.config.nominal_fee_lamports,
        ))
    }

    pub async fn balance(&self, account: &Pubkey) -> Result<u64> {
        self.connection.rpc.balance(account).await
    }

    pub async fn latest_blockhash(&self) -> Result<Blockhash> {
        self.connection.rpc.latest_blockhash().await
    }

    /// Submit a fully signed transaction.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        tx.ensure_fits()?;
        let wire = tx.serialize()?;
        let signature = self.connection.rpc.send_transaction(&wire).await?;
        info!(%signature, environment = %self.environment(), "transaction submitted");
        Ok(signature)
    }

    /// Poll until `signature` reaches the configured commitment.
    ///
    /// A transaction that landed but failed still counts as confirmed; its
    /// error is in the returned status. Gives up with `ConfirmationTimeout`.
    pub async fn wait_for_confirmation(&self, signature: &Signature) -> Result<SignatureStatus> {
        let timeout = Duration::from_secs(self.config.confirmation_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let target = self.config.commitment;

        let poll = async {
            loop {
                if let Some(status) = self.connection.rpc.signature_status(signature).await? {
                    if status.err.is_some() || status.commitment.is_some_and(|c| c >= target) {
                        return Ok::<_, ZkShareError>(status);
                    }
                }
                tokio::time::sleep(interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(ZkShareError::ConfirmationTimeout {
                signature: signature.to_string(),
                waited_secs: timeout.as_secs(),
            }),
        }
    }

    pub async fn transaction_outcome(&self, signature: &Signature) -> Result<Option<TransactionOutcome>> {
        self.connection.rpc.transaction_outcome(signature).await
    }
}
