use balance_core::{Pubkey, Signature};
use ed25519_dalek::{Signer, Verifier, VerifyingKey};

use crate::keys::SigningKeypair;

/// Sign data with a signing keypair
pub fn sign_data(keypair: &SigningKeypair, data: &[u8]) -> Signature {
    let signature = keypair.signing_key.sign(data);
    Signature::new_from_array(signature.to_bytes())
}

/// Verify a signature
pub fn verify_signature(pubkey: &Pubkey, data: &[u8], signature: &Signature) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(pubkey.as_bytes()) {
        Ok(vk) => vk,
        Err(_) => return false,
    };

    let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());

    verifying_key.verify(data, &signature).is_ok()
}
