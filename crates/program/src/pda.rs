//! PDA (Program Derived Address) derivation helpers.
//!
//! These mirror the on-chain PDA seeds so client code can derive
//! the same addresses the program expects.

use balance_core::Pubkey;
use balance_crypto::{create_program_address, find_program_address, AddressError};

/// Deployed balance program on devnet.
pub const PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    181, 120, 132, 71, 205, 183, 12, 81, 12, 219, 244, 164, 35, 175, 88, 184, 26, 47, 190, 130,
    12, 160, 68, 210, 63, 26, 3, 60, 114, 206, 133, 80,
]);

/// Seed prefixes matching the on-chain program.
pub mod seeds {
    pub const BALANCE_ACCOUNT: &[u8] = b"balance_account";
}

/// Derive a user's balance account PDA and its bump.
///
/// PDA seeds: `[b"balance_account", user_pubkey, bump]`
pub fn balance_account_pda(program_id: &Pubkey, user: &Pubkey) -> Result<(Pubkey, u8), AddressError> {
    find_program_address(&[seeds::BALANCE_ACCOUNT, user.as_ref()], program_id)
}

/// Recreate a balance account address from a known bump.
pub fn balance_account_address(
    program_id: &Pubkey,
    user: &Pubkey,
    bump: u8,
) -> Result<Pubkey, AddressError> {
    create_program_address(&[seeds::BALANCE_ACCOUNT, user.as_ref(), &[bump]], program_id)
}
