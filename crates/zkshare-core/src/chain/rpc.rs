//! JSON-RPC access to a ledger node.
//!
//! [`LedgerRpc`] is the seam between the chain client and the network;
//! [`HttpRpc`] implements it over HTTP. Each call is a single attempt:
//! retries are the caller's decision.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::transaction::{Blockhash, Pubkey, Signature};
use crate::error::{Result, ZkShareError};

/// How far a transaction has progressed towards finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

/// Status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub commitment: Option<Commitment>,
    /// Set when the transaction landed but its execution failed.
    pub err: Option<String>,
}

/// Execution details of a landed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub return_data: Option<Vec<u8>>,
}

/// The ledger node operations the chain client relies on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    fn endpoint(&self) -> &str;

    /// `Ok` when the node reports itself healthy.
    async fn health(&self) -> Result<()>;

    async fn balance(&self, account: &Pubkey) -> Result<u64>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: u64) -> Result<u64>;

    async fn latest_blockhash(&self) -> Result<Blockhash>;

    /// Submit wire-format transaction bytes. Rejections are `SubmissionFailed`.
    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature>;

    /// `None` while the node has not seen the signature.
    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>>;

    /// `None` while the transaction is not yet queryable.
    async fn transaction_outcome(&self, signature: &Signature) -> Result<Option<TransactionOutcome>>;

    async fn request_airdrop(&self, account: &Pubkey, lamports: u64) -> Result<Signature>;
}

/// JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRpc {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRpc {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ZkShareError::NetworkUnreachable {
                endpoint: endpoint.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, endpoint })
    }

    /// Send a request and return its `result` field.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ZkShareError::NetworkUnreachable {
                endpoint: self.endpoint.clone(),
                reason: if e.is_timeout() {
                    format!("{method}: request timed out")
                } else {
                    format!("{method}: {e}")
                },
            })?;

        if !resp.status().is_success() {
            return Err(ZkShareError::NetworkUnreachable {
                endpoint: self.endpoint.clone(),
                reason: format!("{method}: HTTP {}", resp.status()),
            });
        }

        let json: Value = resp.json().await.map_err(|e| ZkShareError::Rpc {
            method: method.to_string(),
            reason: format!("invalid JSON response: {e}"),
        })?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(ZkShareError::Rpc {
                method: method.to_string(),
                reason: message.to_string(),
            });
        }

        json.get("result").cloned().ok_or_else(|| ZkShareError::Rpc {
            method: method.to_string(),
            reason: "response missing 'result' field".into(),
        })
    }
}

fn malformed(method: &str, what: &str) -> ZkShareError {
    ZkShareError::Rpc {
        method: method.to_string(),
        reason: format!("malformed result: {what}"),
    }
}

fn error_text(err: &Value) -> Option<String> {
    match err {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl LedgerRpc for HttpRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn health(&self) -> Result<()> {
        let result = self.call("getHealth", json!([])).await?;
        match result.as_str() {
            Some("ok") => Ok(()),
            _ => Err(ZkShareError::Rpc {
                method: "getHealth".into(),
                reason: format!("node reports {result}"),
            }),
        }
    }

    async fn balance(&self, account: &Pubkey) -> Result<u64> {
        let result = self.call("getBalance", json!([account.to_string()])).await?;
        result["value"]
            .as_u64()
            .ok_or_else(|| malformed("getBalance", "value"))
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: u64) -> Result<u64> {
        let result = self
            .call("getMinimumBalanceForRentExemption", json!([data_len]))
            .await?;
        result
            .as_u64()
            .ok_or_else(|| malformed("getMinimumBalanceForRentExemption", "lamports"))
    }

    async fn latest_blockhash(&self) -> Result<Blockhash> {
        let result = self
            .call("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        result["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| malformed("getLatestBlockhash", "blockhash"))?
            .parse()
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature> {
        let params = json!([BASE64.encode(wire), { "encoding": "base64" }]);
        let result = self
            .call("sendTransaction", params)
            .await
            .map_err(|e| match e {
                ZkShareError::Rpc { reason, .. } => ZkShareError::SubmissionFailed(reason),
                other => other,
            })?;
        result
            .as_str()
            .ok_or_else(|| malformed("sendTransaction", "signature"))?
            .parse()
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let params = json!([[signature.to_string()], { "searchTransactionHistory": true }]);
        let result = self.call("getSignatureStatuses", params).await?;
        let status = &result["value"][0];
        if status.is_null() {
            return Ok(None);
        }
        let commitment = match status["confirmationStatus"].as_str() {
            Some("processed") => Some(Commitment::Processed),
            Some("confirmed") => Some(Commitment::Confirmed),
            Some("finalized") => Some(Commitment::Finalized),
            _ => None,
        };
        Ok(Some(SignatureStatus {
            commitment,
            err: error_text(&status["err"]),
        }))
    }

    async fn transaction_outcome(&self, signature: &Signature) -> Result<Option<TransactionOutcome>> {
        let params = json!([
            signature.to_string(),
            { "encoding": "json", "commitment": "confirmed", "maxSupportedTransactionVersion": 0 }
        ]);
        let result = self.call("getTransaction", params).await?;
        if result.is_null() {
            return Ok(None);
        }

        let meta = &result["meta"];
        let logs = meta["logMessages"]
            .as_array()
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let return_data = match meta["returnData"]["data"][0].as_str() {
            Some(encoded) => Some(
                BASE64
                    .decode(encoded)
                    .map_err(|_| malformed("getTransaction", "returnData"))?,
            ),
            None => None,
        };

        Ok(Some(TransactionOutcome {
            err: error_text(&meta["err"]),
            logs,
            return_data,
        }))
    }

    async fn request_airdrop(&self, account: &Pubkey, lamports: u64) -> Result<Signature> {
        let result = self
            .call("requestAirdrop", json!([account.to_string(), lamports]))
            .await?;
        result
            .as_str()
            .ok_or_else(|| malformed("requestAirdrop", "signature"))?
            .parse()
    }
}
