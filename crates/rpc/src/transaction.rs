//! Legacy transaction format.
//!
//! Wire layout:
//!
//! ```text
//! transaction = compact_u16(n) || signature[n] || message
//! message     = header(3) || compact_u16(k) || key[k] || blockhash(32)
//!               || compact_u16(m) || instruction[m]
//! instruction = program_index(u8) || compact_u16(a) || account_index[a]
//!               || compact_u16(d) || data[d]
//! ```

use balance_core::{Hash, Instruction, Pubkey, Signature};
use balance_crypto::{sign_data, verify_signature, SigningKeypair};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Largest serialized transaction a node accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no instructions")]
    NoInstructions,
    #[error("too many account keys: {0}")]
    TooManyAccounts(usize),
    #[error("length {0} does not fit a compact-u16")]
    LengthOverflow(usize),
    #[error("missing signer for {0}")]
    MissingSigner(Pubkey),
    #[error("keypair {0} is not a required signer")]
    UnexpectedSigner(Pubkey),
    #[error("transaction is {0} bytes (max 1232)")]
    TooLarge(usize),
}

/// Append a compact-u16: 7 bits per byte, high bit set while more bytes follow.
pub fn encode_compact_u16(buf: &mut Vec<u8>, len: usize) -> Result<(), TransactionError> {
    let mut rem = u16::try_from(len).map_err(|_| TransactionError::LengthOverflow(len))?;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            buf.push(byte);
            return Ok(());
        }
        byte |= 0x80;
        buf.push(byte);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// An instruction with its keys replaced by indices into `Message::account_keys`.
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
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Clone, Copy)]
struct KeyFlags {
    key: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile instructions into a message paid for by `payer`.
    ///
    /// Keys are deduplicated (flags merged) and ordered payer first, then
    /// writable signers, readonly signers, writable non-signers, readonly
    /// non-signers, each group in first-seen order.
    pub fn compile(instructions: &[Instruction], payer: &Pubkey) -> Result<Self, TransactionError> {
        if instructions.is_empty() {
            return Err(TransactionError::NoInstructions);
        }

        let mut keys: Vec<KeyFlags> = vec![KeyFlags {
            key: *payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut merge = |key: Pubkey, is_signer: bool, is_writable: bool| {
            match keys.iter_mut().find(|k| k.key == key) {
                Some(existing) => {
                    existing.is_signer |= is_signer;
                    existing.is_writable |= is_writable;
                }
                None => keys.push(KeyFlags { key, is_signer, is_writable }),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            merge(ix.program_id, false, false);
        }

        // Stable sort keeps the payer at index 0 and first-seen order within groups.
        keys.sort_by_key(|k| (!k.is_signer, !k.is_writable));

        if keys.len() > usize::from(u8::MAX) + 1 {
            return Err(TransactionError::TooManyAccounts(keys.len()));
        }

        let header = MessageHeader {
            num_required_signatures: keys.iter().filter(|k| k.is_signer).count() as u8,
            num_readonly_signed_accounts: keys.iter().filter(|k| k.is_signer && !k.is_writable).count()
                as u8,
            num_readonly_unsigned_accounts: keys
                .iter()
                .filter(|k| !k.is_signer && !k.is_writable)
                .count() as u8,
        };
        let account_keys: Vec<Pubkey> = keys.iter().map(|k| k.key).collect();

        let index_of = |key: &Pubkey| -> u8 {
            account_keys.iter().position(|k| k == key).unwrap_or_default() as u8
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
            recent_blockhash: Hash::default(),
            instructions,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..usize::from(self.header.num_required_signatures)]
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let signed = usize::from(self.header.num_required_signatures);
        if index < signed {
            index < signed - usize::from(self.header.num_readonly_signed_accounts)
        } else {
            index < self.account_keys.len() - usize::from(self.header.num_readonly_unsigned_accounts)
        }
    }

    /// Serialize the message; this is the payload every signer signs.
    pub fn serialize(&self) -> Result<Vec<u8>, TransactionError> {
        let mut buf = Vec::with_capacity(256);
        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed_accounts);
        buf.push(self.header.num_readonly_unsigned_accounts);

        encode_compact_u16(&mut buf, self.account_keys.len())?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }
        buf.extend_from_slice(self.recent_blockhash.as_ref());

        encode_compact_u16(&mut buf, self.instructions.len())?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            encode_compact_u16(&mut buf, ix.accounts.len())?;
            buf.extend_from_slice(&ix.accounts);
            encode_compact_u16(&mut buf, ix.data.len())?;
            buf.extend_from_slice(&ix.data);
        }
        Ok(buf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    pub fn new_unsigned(message: Message) -> Self {
        let slots = usize::from(message.header.num_required_signatures);
        Self {
            signatures: vec![Signature::default(); slots],
            message,
        }
    }

    /// Set the blockhash and sign with every required signer.
    ///
    /// Each keypair must belong to a required signer and every required
    /// signer must be covered.
    pub fn sign(&mut self, signers: &[&SigningKeypair], recent_blockhash: Hash) -> Result<(), TransactionError> {
        if let Some(stray) = signers
            .iter()
            .map(|kp| kp.pubkey())
            .find(|pk| !self.message.signer_keys().contains(pk))
        {
            return Err(TransactionError::UnexpectedSigner(stray));
        }

        self.message.recent_blockhash = recent_blockhash;
        let payload = self.message.serialize()?;

        let signatures = self
            .message
            .signer_keys()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|kp| kp.pubkey() == *key)
                    .map(|kp| sign_data(kp, &payload))
                    .ok_or(TransactionError::MissingSigner(*key))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.signatures = signatures;
        Ok(())
    }

    /// The transaction id: the fee payer's signature.
    pub fn signature(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    /// Whether every signature verifies against its key.
    pub fn verify(&self) -> bool {
        let Ok(payload) = self.message.serialize() else {
            return false;
        };
        self.signatures.len() == self.message.signer_keys().len()
            && self
                .message
                .signer_keys()
                .iter()
                .zip(&self.signatures)
                .all(|(key, sig)| verify_signature(key, &payload, sig))
    }

    pub fn serialize(&self) -> Result<Vec<u8>, TransactionError> {
        let mut buf = Vec::with_capacity(PACKET_DATA_SIZE);
        encode_compact_u16(&mut buf, self.signatures.len())?;
        for sig in &self.signatures {
            buf.extend_from_slice(sig.as_ref());
        }
        buf.extend_from_slice(&self.message.serialize()?);
        if buf.len() > PACKET_DATA_SIZE {
            return Err(TransactionError::TooLarge(buf.len()));
        }
        Ok(buf)
    }

    /// Base64 wire form accepted by `sendTransaction`.
    pub fn to_base64(&self) -> Result<String, TransactionError> {
        Ok(STANDARD.encode(self.serialize()?))
    }
}
