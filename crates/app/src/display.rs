//! Console rendering for balance accounts and submitted transactions.

use std::fmt;

use balance_core::{Pubkey, Signature};
use balance_program::BalanceAccount;

/// A balance account together with its address, as printed after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountReport {
    pub address: Pubkey,
    pub account: BalanceAccount,
}

impl AccountReport {
    pub fn new(address: Pubkey, account: BalanceAccount) -> Self {
        Self { address, account }
    }

    /// Report plus the raw account bytes in hex.
    pub fn detailed(&self) -> String {
        let raw = self
            .account
            .to_bytes()
            .map(hex::encode)
            .unwrap_or_else(|e| format!("<{e}>"));
        format!("{self}\n  raw:      {raw}")
    }
}

impl fmt::Display for AccountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "userBalanceAccount => {}", self.address)?;
        writeln!(f, "  credited: {}", self.account.credited_amount)?;
        writeln!(f, "  debited:  {}", self.account.debited_amount)?;
        write!(f, "  balance:  {}", self.account.balance)
    }
}

/// Line printed for every landed transaction.
pub fn tx_line(signature: &Signature) -> String {
    format!("Tx hash => {signature}")
}
