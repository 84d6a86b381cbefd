//! Client configuration persisted through `balance-settings`.

use std::path::PathBuf;
use std::time::Duration;

use balance_core::{Commitment, Pubkey};
use balance_program::PROGRAM_ID;
use balance_rpc::{ConfirmOptions, DEVNET_URL};
use serde::{Deserialize, Serialize};

/// Settings file contents. Missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub keypair_path: String,
    pub commitment: Commitment,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_URL.to_string(),
            program_id: PROGRAM_ID,
            keypair_path: "~/.config/solana/id.json".to_string(),
            commitment: Commitment::Confirmed,
            confirm_timeout_secs: 60,
            poll_interval_ms: 500,
        }
    }
}

impl ClientConfig {
    /// Keypair path with `~` expanded.
    pub fn keypair_path(&self) -> PathBuf {
        balance_keystore::expand_path(&self.keypair_path)
    }

    pub fn confirm_options(&self) -> ConfirmOptions {
        ConfirmOptions {
            timeout: Duration::from_secs(self.confirm_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
