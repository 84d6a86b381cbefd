//! Balance Crypto
//!
//! Key handling, ed25519 signing and program-derived address derivation.
//! No knowledge of any particular on-chain program.

pub mod address;
pub mod keys;
pub mod sign;

pub use address::{create_program_address, find_program_address, is_on_curve, AddressError};
pub use keys::{KeyError, SigningKeypair};
pub use sign::{sign_data, verify_signature};
