//! ed25519 signing keypairs.

use balance_core::Pubkey;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid keypair length: expected 64 bytes, got {0}")]
    InvalidLength(usize),
    #[error("public key does not match secret key")]
    PublicKeyMismatch,
}

/// An ed25519 keypair able to sign transactions.
pub struct SigningKeypair {
    pub(crate) signing_key: SigningKey,
}

impl SigningKeypair {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build from the 32-byte secret seed.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Build from the 64-byte `secret || public` layout used by Solana keypair files.
    ///
    /// The trailing public half must match the key derived from the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes: &[u8; 64] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        let signing_key =
            SigningKey::from_keypair_bytes(bytes).map_err(|_| KeyError::PublicKeyMismatch)?;
        Ok(Self { signing_key })
    }

    /// The 64-byte `secret || public` encoding.
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.public_key_bytes())
    }
}

impl std::fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
