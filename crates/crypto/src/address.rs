//! Program-derived addresses.
//!
//! A program-derived address (PDA) is `sha256(seeds.. || program_id ||
//! "ProgramDerivedAddress")`, accepted only when the digest is not a valid
//! ed25519 point, so no private key can ever sign for it.

use balance_core::Pubkey;
use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Maximum number of seeds per derivation.
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("too many seeds: {0} (max 16)")]
    TooManySeeds(usize),
    #[error("seed {index} is {len} bytes (max 32)")]
    SeedTooLong { index: usize, len: usize },
    #[error("derived address lies on the ed25519 curve")]
    OnCurve,
    #[error("no viable bump seed found")]
    NoViableBump,
}

/// Whether `bytes` decodes to a point on the ed25519 curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// Derive the address for an exact seed list (bump included by the caller).
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, AddressError> {
    if seeds.len() > MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(AddressError::SeedTooLong { index, len: seed.len() });
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let digest: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&digest) {
        return Err(AddressError::OnCurve);
    }
    Ok(Pubkey::new_from_array(digest))
}

/// Search bumps from 255 down to 0 and return the first off-curve address.
///
/// The bump is appended as one extra seed, so callers may pass at most
/// `MAX_SEEDS - 1` seeds of their own.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), AddressError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(AddressError::TooManySeeds(seeds.len() + 1));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        with_bump.extend_from_slice(seeds);
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(AddressError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }
    Err(AddressError::NoViableBump)
}
