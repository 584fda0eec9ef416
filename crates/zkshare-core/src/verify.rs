//! Verifying a proof against a deployed verifier account.
//!
//! Validity is read from the confirmed transaction, never assumed:
//!
//! 1. return data: first byte `1` is valid, `0` invalid;
//! 2. otherwise the last `Program log: verification: valid|invalid` line;
//! 3. otherwise a transaction that failed on-chain is invalid.
//!
//! Anything else is [`ZkShareError::UnrecognizedOutcome`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::chain::rpc::TransactionOutcome;
use crate::chain::transaction::{Message, Pubkey, Signature, Transaction};
use crate::chain::{verifier, ChainClient};
use crate::error::{Result, ZkShareError};
use crate::progress::{Progress, ProgressReporter, Stage};
use crate::records::VerificationRecord;
use crate::signer::{request_signature, TransactionSigner};

const STAGES: &[(Stage, u8)] = &[
    (Stage::Preparing, 10),
    (Stage::TransactionBuilt, 30),
    (Stage::Signed, 50),
    (Stage::Submitted, 70),
    (Stage::Confirmed, 100),
];

const LOG_PREFIX: &str = "Program log: verification: ";

/// Drives proof verifications against a [`ChainClient`].
pub struct VerificationOrchestrator {
    chain: Arc<ChainClient>,
    program_id: Pubkey,
}

impl VerificationOrchestrator {
    pub fn new(chain: Arc<ChainClient>) -> Result<Self> {
        let program_id = chain.config().verifier_program_id.parse()?;
        Ok(Self { chain, program_id })
    }

    /// Submit `proof` and `public_inputs` to the verifier at `account`.
    ///
    /// An invalid proof is a successful call with `is_valid() == false`.
    pub async fn verify(
        &self,
        account: &str,
        proof: &[u8],
        public_inputs: &[String],
        signer: &dyn TransactionSigner,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<VerificationRecord> {
        let mut progress = ProgressReporter::new(STAGES, on_progress);
        let payer = signer.pubkey();

        progress.reach(Stage::Preparing);
        let account: Pubkey = account.parse().map_err(|e: ZkShareError| e.at(Stage::Preparing))?;
        let session = self.chain.session().await.map_err(|e| e.at(Stage::Preparing))?;
        info!(
            environment = %session.environment(),
            %account,
            proof_bytes = proof.len(),
            inputs = public_inputs.len(),
            "verifying proof"
        );

        let blockhash = session
            .latest_blockhash()
            .await
            .map_err(|e| e.at(Stage::TransactionBuilt))?;
        let ix = verifier::verify(&self.program_id, &account, proof, public_inputs);
        let message =
            Message::new(&[ix], &payer, blockhash).map_err(|e| e.at(Stage::TransactionBuilt))?;
        let unsigned = Transaction::new_unsigned(message);
        let size = unsigned.ensure_fits().map_err(|e| e.at(Stage::TransactionBuilt))?;
        debug!(size, "verify transaction built");
        progress.reach(Stage::TransactionBuilt);

        let signed = request_signature(signer, unsigned)
            .await
            .map_err(|e| e.at(Stage::Signed))?;
        progress.reach(Stage::Signed);

        let signature = session
            .send_transaction(&signed)
            .await
            .map_err(|e| e.at(Stage::Submitted))?;
        progress.reach(Stage::Submitted);

        let status = session
            .wait_for_confirmation(&signature)
            .await
            .map_err(|e| e.at(Stage::Confirmed))?;
        let outcome = session
            .transaction_outcome(&signature)
            .await
            .map_err(|e| e.at(Stage::Confirmed))?;
        let valid = decode_outcome(&signature, status.err.as_deref(), outcome.as_ref())
            .map_err(|e| e.at(Stage::Confirmed))?;
        progress.reach(Stage::Confirmed);

        info!(%signature, valid, "verification confirmed");
        Ok(VerificationRecord::new(
            valid,
            account.to_string(),
            signature.to_string(),
            session.environment(),
        ))
    }
}

/// Read the verifier's verdict from a confirmed transaction.
pub fn decode_outcome(
    signature: &Signature,
    status_err: Option<&str>,
    outcome: Option<&TransactionOutcome>,
) -> Result<bool> {
    if let Some(outcome) = outcome {
        match outcome.return_data.as_deref().and_then(<[u8]>::first).copied() {
            Some(1) => return Ok(true),
            Some(0) => return Ok(false),
            Some(other) => debug!(byte = other, "ignoring unknown return data"),
            None => {}
        }

        let verdict = outcome
            .logs
            .iter()
            .rev()
            .find_map(|line| line.strip_prefix(LOG_PREFIX))
            .map(str::trim);
        match verdict {
            Some("valid") => return Ok(true),
            Some("invalid") => return Ok(false),
            _ => {}
        }

        if outcome.err.is_some() {
            return Ok(false);
        }
    }

    if status_err.is_some() {
        return Ok(false);
    }

    Err(ZkShareError::UnrecognizedOutcome {
        signature: signature.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> Signature {
        Signature([4; 64])
    }

    fn outcome(return_data: Option<Vec<u8>>, logs: &[&str], err: Option<&str>) -> TransactionOutcome {
        TransactionOutcome {
            err: err.map(str::to_string),
            logs: logs.iter().map(|l| l.to_string()).collect(),
            return_data,
        }
    }

    #[test]
    fn test_return_data_decides_first() {
        let o = outcome(Some(vec![1]), &["Program log: verification: invalid"], None);
        assert!(decode_outcome(&sig(), None, Some(&o)).unwrap());
        let o = outcome(Some(vec![0]), &[], None);
        assert!(!decode_outcome(&sig(), None, Some(&o)).unwrap());
    }

    #[test]
    fn test_logs_decide_without_return_data() {
        let o = outcome(
            None,
            &["Program ZkVer invoke [1]", "Program log: verification: valid", "Program ZkVer success"],
            None,
        );
        assert!(decode_outcome(&sig(), None, Some(&o)).unwrap());

        let o = outcome(None, &["Program log: verification: invalid"], None);
        assert!(!decode_outcome(&sig(), None, Some(&o)).unwrap());
    }

    #[test]
    fn test_failed_transaction_is_invalid() {
        let o = outcome(None, &[], Some(r#"{"InstructionError":[0,{"Custom":1}]}"#));
        assert!(!decode_outcome(&sig(), None, Some(&o)).unwrap());
        assert!(!decode_outcome(&sig(), Some("failed"), None).unwrap());
    }

    #[test]
    fn test_silent_success_is_unrecognized() {
        let o = outcome(None, &["Program ZkVer success"], None);
        let err = decode_outcome(&sig(), None, Some(&o)).unwrap_err();
        assert!(matches!(err, ZkShareError::UnrecognizedOutcome { .. }));
        assert!(decode_outcome(&sig(), None, None).is_err());
    }
}
