//! Local content identifiers.
//!
//! When the remote provider is unavailable the store derives its own
//! identifier: a CIDv1 with the `json` codec and a sha2-256 multihash,
//! multibase-encoded as base32 lowercase (`b` prefix). The shape matches
//! what an IPFS provider issues, so local and remote ids travel through the
//! same code paths; the digests are not guaranteed to agree with the
//! provider's chunked DAG hash.

use sha2::{Digest, Sha256};

use crate::encoding::{base32_lower_decode, base32_lower_encode};

const CID_VERSION: u8 = 0x01;
/// Multicodec `json`, varint-encoded.
const JSON_CODEC: [u8; 2] = [0x80, 0x04];
/// Multihash `sha2-256` with a 32-byte digest.
const SHA2_256: [u8; 2] = [0x12, 0x20];
const MULTIBASE_BASE32: char = 'b';

/// Computes stable content identifiers from bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CidHasher;

impl CidHasher {
    /// Derive the identifier for `content`.
    pub fn cid(content: &[u8]) -> String {
        let digest = Sha256::digest(content);

        let mut raw = Vec::with_capacity(1 + JSON_CODEC.len() + SHA2_256.len() + digest.len());
        raw.push(CID_VERSION);
        raw.extend_from_slice(&JSON_CODEC);
        raw.extend_from_slice(&SHA2_256);
        raw.extend_from_slice(&digest);

        let mut cid = String::with_capacity(60);
        cid.push(MULTIBASE_BASE32);
        cid.push_str(&base32_lower_encode(&raw));
        cid
    }

    /// Whether `id` has the shape of a content identifier (CIDv0 or base32 CIDv1).
    pub fn looks_like_cid(id: &str) -> bool {
        let v0 = id.len() == 46 && id.starts_with("Qm");
        let v1 = id.len() > 8
            && id.starts_with(MULTIBASE_BASE32)
            && base32_lower_decode(&id[1..]).is_some_and(|raw| raw.first() == Some(&CID_VERSION));
        v0 || v1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cid_is_deterministic() {
        assert_eq!(CidHasher::cid(b"abc"), CidHasher::cid(b"abc"));
        assert_ne!(CidHasher::cid(b"abc"), CidHasher::cid(b"abd"));
    }

    #[test]
    fn test_cid_shape() {
        let cid = CidHasher::cid(b"{}");
        // 1 + 2 + 2 + 32 = 37 bytes -> 60 base32 chars, plus the multibase prefix.
        assert_eq!(cid.len(), 61);
        assert!(cid.starts_with("bagaaiera"));
        assert!(CidHasher::looks_like_cid(&cid));
    }

    #[test]
    fn test_looks_like_cid_accepts_v0() {
        assert!(CidHasher::looks_like_cid(
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        ));
        assert!(!CidHasher::looks_like_cid("../etc/passwd"));
        assert!(!CidHasher::looks_like_cid("bNOTBASE32ATALL"));
    }
}
