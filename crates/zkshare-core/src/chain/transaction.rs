//! Ledger transactions in the legacy wire format.
//!
//! ```text
//! transaction := shortvec<signature[64]> message
//! message     := header[3] shortvec<pubkey[32]> blockhash[32] shortvec<instruction>
//! instruction := program_index[1] shortvec<u8 account_index> shortvec<u8 data>
//! ```
//!
//! Account keys are ordered writable signers, read-only signers, writable
//! non-signers, read-only non-signers, with the fee payer first.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::encoding::{base58_decode, base58_encode};
use crate::error::{Result, ZkShareError};

/// Maximum serialized transaction size accepted by the network.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

/// A 32-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey(pub [u8; 32]);

/// The system program, owner of fresh accounts.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey([0u8; 32]);

impl Pubkey {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    pub fn from_signing_key(key: &SigningKey) -> Self {
        Self::from_verifying_key(&key.verifying_key())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

impl FromStr for Pubkey {
    type Err = ZkShareError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = base58_decode(s).ok_or_else(|| ZkShareError::InvalidAccount(s.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ZkShareError::InvalidAccount(s.to_string()))?;
        Ok(Self(array))
    }
}

/// A 64-byte ed25519 signature; the first one identifies the transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl Signature {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = ZkShareError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ZkShareError::Rpc {
            method: "signature".into(),
            reason: format!("not a base58 64-byte signature: {s}"),
        };
        let bytes = base58_decode(s).ok_or_else(invalid)?;
        let array: [u8; 64] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(array))
    }
}

/// A recent blockhash, bounding how long a transaction stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Blockhash(pub [u8; 32]);

impl FromStr for Blockhash {
    type Err = ZkShareError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ZkShareError::Rpc {
            method: "getLatestBlockhash".into(),
            reason: format!("not a base58 32-byte hash: {s}"),
        };
        let bytes = base58_decode(s).ok_or_else(invalid)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(array))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58_encode(&self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// System program `CreateAccount`: fund `new_account` with `lamports`,
/// allocate `space` bytes and assign it to `owner`.
pub fn create_account(
    payer: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(4 + 8 + 8 + 32);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(&owner.0);

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![AccountMeta::new(*payer, true), AccountMeta::new(*new_account, true)],
        data,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile `instructions` with `payer` as fee payer.
    ///
    /// Fails when the accounts cannot be indexed by a byte or a length does
    /// not fit its compact-u16 prefix.
    pub fn new(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: Blockhash,
    ) -> Result<Self> {
        check_len("instructions", instructions.len())?;
        for ix in instructions {
            check_len("instruction accounts", ix.accounts.len())?;
            check_len("instruction data", ix.data.len())?;
        }

        // (key, is_signer, is_writable), first-seen order, payer first.
        let mut metas: Vec<(Pubkey, bool, bool)> = vec![(*payer, true, true)];
        let mut merge = |key: Pubkey, signer: bool, writable: bool| {
            match metas.iter_mut().find(|(k, _, _)| *k == key) {
                Some(existing) => {
                    existing.1 |= signer;
                    existing.2 |= writable;
                }
                None => metas.push((key, signer, writable)),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            merge(ix.program_id, false, false);
        }

        let class = |(_, signer, writable): &(Pubkey, bool, bool)| match (*signer, *writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        // Stable sort keeps the payer first among writable signers.
        metas.sort_by_key(class);

        if metas.len() > u8::MAX as usize {
            return Err(ZkShareError::InvalidTransaction(format!(
                "{} accounts exceed the {} a message can index",
                metas.len(),
                u8::MAX
            )));
        }

        let header = MessageHeader {
            num_required_signatures: metas.iter().filter(|m| m.1).count() as u8,
            num_readonly_signed_accounts: metas.iter().filter(|m| class(m) == 1).count() as u8,
            num_readonly_unsigned_accounts: metas.iter().filter(|m| class(m) == 3).count() as u8,
        };
        let account_keys: Vec<Pubkey> = metas.into_iter().map(|(k, _, _)| k).collect();

        let index_of = |key: &Pubkey| {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .unwrap_or_default()
        };
        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Keys whose signatures the transaction requires, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// The bytes every signer signs.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);
        encode_len(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(&key.0);
        }
        out.extend_from_slice(&self.recent_blockhash.0);
        encode_len(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_len(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            encode_len(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// A transaction with one empty signature slot per required signer.
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.signer_keys().len();
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// Sign with `key`, which must be one of the message's required signers.
    pub fn sign(&mut self, key: &SigningKey) -> Result<()> {
        let pubkey = Pubkey::from_signing_key(key);
        let index = self.signer_index(&pubkey).ok_or_else(|| {
            ZkShareError::SignerRejected(format!("{pubkey} is not a required signer"))
        })?;
        let signature = key.sign(&self.message.serialize()?);
        self.signatures[index] = Signature(signature.to_bytes());
        Ok(())
    }

    /// Whether `pubkey` has a signature that verifies against the message.
    pub fn is_signed_by(&self, pubkey: &Pubkey) -> bool {
        let Some(index) = self.signer_index(pubkey) else {
            return false;
        };
        let Some(signature) = self.signatures.get(index) else {
            return false;
        };
        if signature.is_empty() {
            return false;
        }
        let Ok(key) = VerifyingKey::from_bytes(&pubkey.0) else {
            return false;
        };
        let Ok(message) = self.message.serialize() else {
            return false;
        };
        key.verify(
            &message,
            &ed25519_dalek::Signature::from_bytes(&signature.0),
        )
        .is_ok()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == self.message.signer_keys().len()
            && self
                .message
                .signer_keys()
                .iter()
                .all(|key| self.is_signed_by(key))
    }

    /// The transaction id: the fee payer's signature.
    pub fn signature(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    /// Wire bytes for `sendTransaction`.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let message = self.message.serialize()?;
        let mut out = Vec::with_capacity(1 + self.signatures.len() * 64 + message.len());
        encode_len(&mut out, self.signatures.len())?;
        for signature in &self.signatures {
            out.extend_from_slice(&signature.0);
        }
        out.extend_from_slice(&message);
        Ok(out)
    }

    /// Serialized size, failing with `TransactionTooLarge` above
    /// [`MAX_TRANSACTION_SIZE`]. Empty signature slots count at full width,
    /// so an unsigned transaction measures the same as its signed form.
    pub fn ensure_fits(&self) -> Result<usize> {
        let size = self.serialize()?.len();
        if size > MAX_TRANSACTION_SIZE {
            return Err(ZkShareError::TransactionTooLarge {
                size,
                max: MAX_TRANSACTION_SIZE,
            });
        }
        Ok(size)
    }

    fn signer_index(&self, pubkey: &Pubkey) -> Option<usize> {
        self.message.signer_keys().iter().position(|k| k == pubkey)
    }
}

fn check_len(what: &str, len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        ZkShareError::InvalidTransaction(format!(
            "{what} length {len} exceeds the compact-u16 limit of {}",
            u16::MAX
        ))
    })
}

/// Compact-u16 length prefix: 7 bits per byte, high bit set on continuation.
fn encode_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let mut rem = check_len("field", len)?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        out.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    #[test]
    fn test_pubkey_parse_display() {
        let pk = Pubkey([9u8; 32]);
        let parsed: Pubkey = pk.to_string().parse().unwrap();
        assert_eq!(parsed, pk);
        assert!("not-base58!".parse::<Pubkey>().is_err());
        assert!("111".parse::<Pubkey>().is_err());
        assert_eq!(SYSTEM_PROGRAM_ID.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn test_encode_len() {
        let mut out = Vec::new();
        encode_len(&mut out, 0x7f).unwrap();
        assert_eq!(out, vec![0x7f]);
        out.clear();
        encode_len(&mut out, 0x80).unwrap();
        assert_eq!(out, vec![0x80, 0x01]);
        out.clear();
        encode_len(&mut out, 0x3fff).unwrap();
        assert_eq!(out, vec![0xff, 0x7f]);
        out.clear();
        encode_len(&mut out, u16::MAX as usize).unwrap();
        assert_eq!(out, vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn test_encode_len_rejects_overflow() {
        let mut out = Vec::new();
        let err = encode_len(&mut out, 70_000).unwrap_err();
        assert!(matches!(err, ZkShareError::InvalidTransaction(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_message_rejects_oversized_data() {
        let payer = Pubkey([1; 32]);
        let ix = Instruction {
            program_id: Pubkey([5; 32]),
            accounts: vec![],
            data: vec![0; 70_000],
        };
        let err = Message::new(&[ix], &payer, Blockhash([1; 32])).unwrap_err();
        assert!(matches!(err, ZkShareError::InvalidTransaction(m) if m.contains("70000")));
    }

    #[test]
    fn test_message_rejects_too_many_accounts() {
        let payer = Pubkey([1; 32]);
        let accounts = (0..300u16)
            .map(|i| {
                let mut key = [0u8; 32];
                key[..2].copy_from_slice(&i.to_le_bytes());
                key[31] = 1;
                AccountMeta::new_readonly(Pubkey(key), false)
            })
            .collect();
        let ix = Instruction {
            program_id: Pubkey([5; 32]),
            accounts,
            data: vec![],
        };
        let err = Message::new(&[ix], &payer, Blockhash([1; 32])).unwrap_err();
        assert!(matches!(err, ZkShareError::InvalidTransaction(_)));
    }

    #[test]
    fn test_ensure_fits_measures_unsigned() {
        let payer = Pubkey::from_signing_key(&key(4));
        let small = Instruction {
            program_id: Pubkey([5; 32]),
            accounts: vec![],
            data: vec![0; 16],
        };
        let tx = Transaction::new_unsigned(Message::new(&[small], &payer, Blockhash([1; 32])).unwrap());
        assert_eq!(tx.ensure_fits().unwrap(), tx.serialize().unwrap().len());

        let big = Instruction {
            program_id: Pubkey([5; 32]),
            accounts: vec![],
            data: vec![0; MAX_TRANSACTION_SIZE],
        };
        let tx = Transaction::new_unsigned(Message::new(&[big], &payer, Blockhash([1; 32])).unwrap());
        match tx.ensure_fits().unwrap_err() {
            ZkShareError::TransactionTooLarge { size, max } => {
                assert!(size > max);
                assert_eq!(max, MAX_TRANSACTION_SIZE);
            }
            other => panic!("expected TransactionTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_create_account_data_layout() {
        let ix = create_account(&Pubkey([1; 32]), &Pubkey([2; 32]), 1_000, 64, &Pubkey([3; 32]));
        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(u64::from_le_bytes(ix.data[4..12].try_into().unwrap()), 1_000);
        assert_eq!(u64::from_le_bytes(ix.data[12..20].try_into().unwrap()), 64);
        assert_eq!(&ix.data[20..], &[3u8; 32]);
    }

    #[test]
    fn test_message_orders_accounts() {
        let payer = Pubkey::from_signing_key(&key(1));
        let account = Pubkey::from_signing_key(&key(2));
        let program = Pubkey([5; 32]);
        let ixs = [
            create_account(&payer, &account, 10, 8, &program),
            Instruction {
                program_id: program,
                accounts: vec![AccountMeta::new(account, false)],
                data: vec![0],
            },
        ];
        let msg = Message::new(&ixs, &payer, Blockhash([7; 32])).unwrap();

        assert_eq!(msg.account_keys, vec![payer, account, SYSTEM_PROGRAM_ID, program]);
        assert_eq!(msg.header.num_required_signatures, 2);
        assert_eq!(msg.header.num_readonly_signed_accounts, 0);
        assert_eq!(msg.header.num_readonly_unsigned_accounts, 2);
        assert_eq!(msg.instructions[0].program_id_index, 2);
        assert_eq!(msg.instructions[0].accounts, vec![0, 1]);
        assert_eq!(msg.instructions[1].program_id_index, 3);
        assert_eq!(msg.instructions[1].accounts, vec![1]);
    }

    #[test]
    fn test_sign_and_verify() {
        let payer_key = SigningKey::generate(&mut OsRng);
        let account_key = SigningKey::generate(&mut OsRng);
        let payer = Pubkey::from_signing_key(&payer_key);
        let account = Pubkey::from_signing_key(&account_key);
        let ix = create_account(&payer, &account, 10, 8, &Pubkey([5; 32]));
        let mut tx = Transaction::new_unsigned(Message::new(&[ix], &payer, Blockhash([1; 32])).unwrap());

        assert_eq!(tx.signatures.len(), 2);
        assert!(!tx.is_fully_signed());

        tx.sign(&payer_key).unwrap();
        assert!(tx.is_signed_by(&payer));
        assert!(!tx.is_signed_by(&account));

        tx.sign(&account_key).unwrap();
        assert!(tx.is_fully_signed());
        assert_eq!(tx.signature(), tx.signatures[0]);

        let stranger = SigningKey::generate(&mut OsRng);
        assert!(tx.sign(&stranger).is_err());
    }

    #[test]
    fn test_serialized_layout() {
        let payer_key = key(4);
        let payer = Pubkey::from_signing_key(&payer_key);
        let ix = Instruction {
            program_id: Pubkey([5; 32]),
            accounts: vec![],
            data: vec![1, 2, 3],
        };
        let mut tx = Transaction::new_unsigned(Message::new(&[ix], &payer, Blockhash([1; 32])).unwrap());
        tx.sign(&payer_key).unwrap();

        let wire = tx.serialize().unwrap();
        let message = tx.message.serialize().unwrap();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[1..65], &tx.signatures[0].0);
        assert_eq!(&wire[65..], &message[..]);
        // header(3) + len(1) + 2 keys + blockhash + len(1) + ix(1 + 1 + 1 + 3)
        assert_eq!(message.len(), 3 + 1 + 64 + 32 + 1 + 6);
    }
}
