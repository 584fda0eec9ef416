//! Deploying a verifier account that holds a verification key.
//!
//! One call creates a fresh account, funds it rent-exempt, assigns it to the
//! verifier program and stores the key in it, all in a single transaction.
//! Progress is reported through every stage in order; any failure aborts the
//! remaining stages and is attributed to the stage it happened in.

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tracing::{debug, info, warn};

use crate::chain::transaction::{create_account, Message, Pubkey, Transaction};
use crate::chain::{verifier, ChainClient};
use crate::error::{Result, ZkShareError};
use crate::progress::{Progress, ProgressReporter, Stage};
use crate::records::DeploymentRecord;
use crate::signer::{request_signature, TransactionSigner};

const STAGES: &[(Stage, u8)] = &[
    (Stage::Preparing, 10),
    (Stage::CostEstimated, 20),
    (Stage::AccountCreated, 30),
    (Stage::PayloadAttached, 40),
    (Stage::TransactionBuilt, 50),
    (Stage::Signed, 70),
    (Stage::Submitted, 85),
    (Stage::Confirmed, 100),
];

/// Drives verifier deployments against a [`ChainClient`].
pub struct DeploymentOrchestrator {
    chain: Arc<ChainClient>,
    program_id: Pubkey,
}

impl DeploymentOrchestrator {
    /// An orchestrator for the verifier program named in the client's config.
    pub fn new(chain: Arc<ChainClient>) -> Result<Self> {
        let program_id = chain.config().verifier_program_id.parse()?;
        Ok(Self { chain, program_id })
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Deploy `verification_key` to a new verifier account paid for by `signer`.
    ///
    /// `on_progress` runs inline and must not block. On success it has seen
    /// every stage, ending with `Confirmed` at 100.
    pub async fn deploy(
        &self,
        verification_key: &[u8],
        signer: &dyn TransactionSigner,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<DeploymentRecord> {
        let mut progress = ProgressReporter::new(STAGES, on_progress);
        let payer = signer.pubkey();

        progress.reach(Stage::Preparing);
        let session = self.chain.session().await.map_err(|e| e.at(Stage::Preparing))?;
        info!(
            environment = %session.environment(),
            %payer,
            vk_bytes = verification_key.len(),
            "deploying verifier"
        );

        let estimate = session
            .estimate(verification_key.len() as u64)
            .await
            .map_err(|e| e.at(Stage::CostEstimated))?;
        for w in &estimate.warnings {
            warn!("{w}");
        }
        progress.reach(Stage::CostEstimated);

        let account_key = SigningKey::generate(&mut OsRng);
        let account = Pubkey::from_signing_key(&account_key);
        let create = create_account(
            &payer,
            &account,
            estimate.rent_exempt_lamports,
            estimate.account_bytes,
            &self.program_id,
        );
        progress.reach(Stage::AccountCreated);

        let initialize = verifier::initialize(&self.program_id, &account, verification_key);
        progress.reach(Stage::PayloadAttached);

        let blockhash = session
            .latest_blockhash()
            .await
            .map_err(|e| e.at(Stage::TransactionBuilt))?;
        let message = Message::new(&[create, initialize], &payer, blockhash)
            .map_err(|e| e.at(Stage::TransactionBuilt))?;
        let unsigned = Transaction::new_unsigned(message);
        // Never ask the signer for something the network will refuse.
        let size = unsigned.ensure_fits().map_err(|e| e.at(Stage::TransactionBuilt))?;
        debug!(size, "deploy transaction built");
        progress.reach(Stage::TransactionBuilt);

        let mut signed = request_signature(signer, unsigned)
            .await
            .map_err(|e| e.at(Stage::Signed))?;
        signed
            .sign(&account_key)
            .map_err(|e| e.at(Stage::Signed))?;
        if !signed.is_fully_signed() {
            return Err(ZkShareError::SignerRejected("transaction is missing signatures".into())
                .at(Stage::Signed));
        }
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
        if let Some(reason) = status.err {
            return Err(ZkShareError::TransactionFailed {
                signature: signature.to_string(),
                reason,
            }
            .at(Stage::Confirmed));
        }
        progress.reach(Stage::Confirmed);

        info!(%account, %signature, "verifier deployed");
        Ok(DeploymentRecord::new(
            account.to_string(),
            signature.to_string(),
            session.environment(),
            estimate.rent_exempt_lamports,
            estimate.fee_lamports,
        ))
    }
}
