//! Keypair-file signer: the CLI's implementation of the external signer.
//!
//! Key files use the common JSON layout, an array of 64 numbers holding
//! the 32-byte secret followed by the 32-byte public key.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ed25519_dalek::SigningKey;

use zkshare_core::chain::transaction::{Pubkey, Transaction};
use zkshare_core::signer::TransactionSigner;

pub struct KeypairSigner {
    key: SigningKey,
}

impl KeypairSigner {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read keypair file {}", path.display()))?;
        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .with_context(|| format!("{} is not a JSON byte array", path.display()))?;
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow::anyhow!("keypair must be 64 bytes, got {}", v.len()))?;
        let key = SigningKey::from_keypair_bytes(&bytes)
            .map_err(|e| anyhow::anyhow!("invalid keypair in {}: {e}", path.display()))?;
        Ok(Self { key })
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        Pubkey::from_signing_key(&self.key)
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> zkshare_core::error::Result<Transaction> {
        transaction.sign(&self.key)?;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_keypair(dir: &Path, key: &SigningKey) -> std::path::PathBuf {
        let path = dir.join("id.json");
        let bytes = key.to_keypair_bytes().to_vec();
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_loads_keypair_file() {
        let dir = tempfile::tempdir().unwrap();
        let key = SigningKey::from_bytes(&[3; 32]);
        let signer = KeypairSigner::from_file(&write_keypair(dir.path(), &key)).unwrap();
        assert_eq!(signer.pubkey(), Pubkey::from_signing_key(&key));
    }

    #[test]
    fn test_rejects_short_keypair() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(KeypairSigner::from_file(&path).is_err());
    }

    #[test]
    fn test_rejects_mismatched_public_half() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = SigningKey::from_bytes(&[3; 32]).to_keypair_bytes();
        bytes[63] ^= 0xff;
        let path = dir.path().join("id.json");
        std::fs::write(&path, serde_json::to_string(&bytes.to_vec()).unwrap()).unwrap();
        assert!(KeypairSigner::from_file(&path).is_err());
    }
}
