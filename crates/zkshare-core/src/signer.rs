//! The external authorization seam.
//!
//! Orchestrators never hold the user's key. They hand an unsigned
//! transaction to a [`TransactionSigner`] and check what comes back.

use async_trait::async_trait;
use tracing::debug;

use crate::chain::transaction::{Pubkey, Transaction};
use crate::error::{Result, ZkShareError};

/// Signs transactions on behalf of the fee payer.
///
/// Implementations may prompt a user, call a wallet or read a key file.
/// Declining should return [`ZkShareError::SignerRejected`];
/// any other error is reported as a rejection too.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// The fee payer's address.
    fn pubkey(&self) -> Pubkey;

    /// Return `transaction` with the fee payer's signature filled in.
    /// The message must come back unchanged.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;
}

/// Hand `transaction` to `signer` and check the result: same message, and a
/// fee-payer signature that verifies. Everything else is `SignerRejected`.
pub(crate) async fn request_signature(
    signer: &dyn TransactionSigner,
    transaction: Transaction,
) -> Result<Transaction> {
    let payer = signer.pubkey();
    if transaction.message.fee_payer() != Some(&payer) {
        return Err(ZkShareError::SignerRejected(format!(
            "{payer} is not the fee payer of this transaction"
        )));
    }
    let expected = transaction.message.clone();
    let slots = transaction.signatures.len();

    let signed = signer
        .sign_transaction(transaction)
        .await
        .map_err(|e| match e {
            rejected @ ZkShareError::SignerRejected(_) => rejected,
            other => ZkShareError::SignerRejected(other.to_string()),
        })?;

    if signed.message != expected {
        return Err(ZkShareError::SignerRejected(
            "signer returned a different message".into(),
        ));
    }
    if signed.signatures.len() != slots {
        return Err(ZkShareError::SignerRejected(format!(
            "expected {slots} signature slots, got {}",
            signed.signatures.len()
        )));
    }
    if !signed.is_signed_by(&payer) {
        return Err(ZkShareError::SignerRejected(format!(
            "no valid signature from fee payer {payer}"
        )));
    }
    debug!(%payer, "signer approved transaction");
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::transaction::{Blockhash, Instruction, Message};
    use ed25519_dalek::SigningKey;

    struct KeySigner(SigningKey);

    #[async_trait]
    impl TransactionSigner for KeySigner {
        fn pubkey(&self) -> Pubkey {
            Pubkey::from_signing_key(&self.0)
        }

        async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
            transaction.sign(&self.0)?;
            Ok(transaction)
        }
    }

    struct Tamperer(SigningKey);

    #[async_trait]
    impl TransactionSigner for Tamperer {
        fn pubkey(&self) -> Pubkey {
            Pubkey::from_signing_key(&self.0)
        }

        async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
            transaction.message.instructions[0].data.push(0xff);
            transaction.sign(&self.0)?;
            Ok(transaction)
        }
    }

    struct Failing;

    #[async_trait]
    impl TransactionSigner for Failing {
        fn pubkey(&self) -> Pubkey {
            Pubkey([3; 32])
        }

        async fn sign_transaction(&self, _transaction: Transaction) -> Result<Transaction> {
            Err(ZkShareError::Other(anyhow::anyhow!("wallet unavailable")))
        }
    }

    fn unsigned(payer: &Pubkey) -> Transaction {
        let ix = Instruction {
            program_id: Pubkey([5; 32]),
            accounts: vec![],
            data: vec![1],
        };
        Transaction::new_unsigned(Message::new(&[ix], payer, Blockhash([1; 32])).unwrap())
    }

    #[tokio::test]
    async fn test_accepts_honest_signature() {
        let signer = KeySigner(SigningKey::from_bytes(&[1; 32]));
        let tx = unsigned(&signer.pubkey());
        let signed = request_signature(&signer, tx).await.unwrap();
        assert!(signed.is_fully_signed());
    }

    #[tokio::test]
    async fn test_rejects_modified_message() {
        let signer = Tamperer(SigningKey::from_bytes(&[2; 32]));
        let tx = unsigned(&signer.pubkey());
        let err = request_signature(&signer, tx).await.unwrap_err();
        assert!(matches!(err, ZkShareError::SignerRejected(_)));
    }

    #[tokio::test]
    async fn test_signer_errors_become_rejections() {
        let tx = unsigned(&Failing.pubkey());
        let err = request_signature(&Failing, tx).await.unwrap_err();
        assert!(err.to_string().contains("wallet unavailable"));
        assert!(matches!(err, ZkShareError::SignerRejected(_)));
    }
}
