//! On-chain account types (client-side serialization).
//!
//! Serialized with bincode, whose fixed-width little-endian integers match
//! the program's 12-byte layout exactly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("balance account data must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("failed to decode balance account: {0}")]
    Decode(#[from] bincode::Error),
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u32, requested: u32 },
    #[error("arithmetic overflow")]
    Overflow,
}

/// Per-user balance record owned by the program.
///
/// PDA seeds: `[b"balance_account", user_pubkey, bump]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAccount {
    /// Sum of all credits.
    pub credited_amount: u32,
    /// Sum of all debits.
    pub debited_amount: u32,
    /// Current balance.
    pub balance: u32,
}

impl BalanceAccount {
    /// Serialized size; the program allocates exactly this much space.
    pub const LEN: usize = 12;

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AccountError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AccountError> {
        if data.len() != Self::LEN {
            return Err(AccountError::InvalidLength {
                expected: Self::LEN,
                actual: data.len(),
            });
        }
        Ok(bincode::deserialize(data)?)
    }

    /// `balance == credited_amount - debited_amount`. Held by convention, never enforced.
    pub fn is_consistent(&self) -> bool {
        self.credited_amount.checked_sub(self.debited_amount) == Some(self.balance)
    }

    /// Apply a credit. On error the account is left unchanged.
    pub fn apply_credit(&mut self, amount: u32) -> Result<(), AccountError> {
        let credited_amount = self.credited_amount.checked_add(amount).ok_or(AccountError::Overflow)?;
        let balance = self.balance.checked_add(amount).ok_or(AccountError::Overflow)?;
        self.credited_amount = credited_amount;
        self.balance = balance;
        Ok(())
    }

    /// Apply a debit. On error the account is left unchanged.
    pub fn apply_debit(&mut self, amount: u32) -> Result<(), AccountError> {
        if self.balance < amount {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.debited_amount = self.debited_amount.checked_add(amount).ok_or(AccountError::Overflow)?;
        self.balance -= amount;
        Ok(())
    }
}
