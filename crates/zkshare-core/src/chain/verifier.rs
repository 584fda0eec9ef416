//! Instructions understood by the on-chain verifier program.
//!
//! ```text
//! initialize := 0x00 verification_key
//! verify     := 0x01 u32le(len) proof u32le(count) { u32le(len) input }*
//! ```

use super::transaction::{AccountMeta, Instruction, Pubkey};

const INITIALIZE: u8 = 0;
const VERIFY: u8 = 1;

/// Store `verification_key` in `account`, which the program must own.
pub fn initialize(program_id: &Pubkey, account: &Pubkey, verification_key: &[u8]) -> Instruction {
    let mut data = Vec::with_capacity(1 + verification_key.len());
    data.push(INITIALIZE);
    data.extend_from_slice(verification_key);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*account, false)],
        data,
    }
}

/// Check `proof` against the key held in `account`.
pub fn verify(program_id: &Pubkey, account: &Pubkey, proof: &[u8], public_inputs: &[String]) -> Instruction {
    let inputs_len: usize = public_inputs.iter().map(|i| 4 + i.len()).sum();
    let mut data = Vec::with_capacity(1 + 4 + proof.len() + 4 + inputs_len);
    data.push(VERIFY);
    data.extend_from_slice(&(proof.len() as u32).to_le_bytes());
    data.extend_from_slice(proof);
    data.extend_from_slice(&(public_inputs.len() as u32).to_le_bytes());
    for input in public_inputs {
        data.extend_from_slice(&(input.len() as u32).to_le_bytes());
        data.extend_from_slice(input.as_bytes());
    }

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new_readonly(*account, false)],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_prefixes_key() {
        let ix = initialize(&Pubkey([9; 32]), &Pubkey([1; 32]), &[0xaa, 0xbb]);
        assert_eq!(ix.data, vec![0, 0xaa, 0xbb]);
        assert!(ix.accounts[0].is_writable);
    }

    #[test]
    fn test_verify_layout() {
        let ix = verify(&Pubkey([9; 32]), &Pubkey([1; 32]), &[7, 7, 7], &["42".into(), "x".into()]);
        let expected: Vec<u8> = [
            &[1u8][..],
            &3u32.to_le_bytes(),
            &[7, 7, 7],
            &2u32.to_le_bytes(),
            &2u32.to_le_bytes(),
            b"42",
            &1u32.to_le_bytes(),
            b"x",
        ]
        .concat();
        assert_eq!(ix.data, expected);
        assert!(!ix.accounts[0].is_writable);
    }
}
