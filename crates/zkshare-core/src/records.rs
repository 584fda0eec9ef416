//! Results of orchestrated ledger operations.
//!
//! The last [`DeploymentRecord`] is saved to `target/deployment.json` by
//! `deploy` and loaded by `verify` and `status`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::NetworkEnvironment;
use crate::error::{Result, ZkShareError};

const DEPLOYMENT_FILE: &str = "deployment.json";

/// A verifier account created by a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    account: String,
    signature: String,
    environment: NetworkEnvironment,
    funding_lamports: u64,
    fee_lamports: u64,
    deployed_at: DateTime<Utc>,
}

impl DeploymentRecord {
    pub(crate) fn new(
        account: String,
        signature: String,
        environment: NetworkEnvironment,
        funding_lamports: u64,
        fee_lamports: u64,
    ) -> Self {
        Self {
            account,
            signature,
            environment,
            funding_lamports,
            fee_lamports,
            deployed_at: Utc::now(),
        }
    }

    /// Address of the verifier account.
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn environment(&self) -> NetworkEnvironment {
        self.environment
    }

    /// Rent-exempt balance moved into the account.
    pub fn funding_lamports(&self) -> u64 {
        self.funding_lamports
    }

    pub fn fee_lamports(&self) -> u64 {
        self.fee_lamports
    }

    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.deployed_at
    }

    /// Total spent by the fee payer.
    pub fn cost_lamports(&self) -> u64 {
        self.funding_lamports.saturating_add(self.fee_lamports)
    }
}

/// The decoded result of a confirmed verification transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    valid: bool,
    account: String,
    signature: String,
    environment: NetworkEnvironment,
    completed_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub(crate) fn new(
        valid: bool,
        account: String,
        signature: String,
        environment: NetworkEnvironment,
    ) -> Self {
        Self {
            valid,
            account,
            signature,
            environment,
            completed_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn environment(&self) -> NetworkEnvironment {
        self.environment
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// Save a deployment record to `<target_dir>/deployment.json`.
pub fn save_deployment(record: &DeploymentRecord, target_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(target_dir)?;
    let path = target_dir.join(DEPLOYMENT_FILE);
    let json = serde_json::to_string_pretty(record).map_err(|e| ZkShareError::ConfigParse {
        path: path.clone(),
        source: e,
    })?;
    std::fs::write(&path, json)?;
    Ok(())
}

/// Load the deployment record from `<target_dir>/deployment.json`.
pub fn load_deployment(target_dir: &Path) -> Result<DeploymentRecord> {
    let path = target_dir.join(DEPLOYMENT_FILE);
    let contents = std::fs::read_to_string(&path).map_err(|e| ZkShareError::ConfigNotFound {
        path: path.clone(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| ZkShareError::ConfigParse { path, source: e })
}
