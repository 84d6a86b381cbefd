//! Cluster backends.
//!
//! [`Cluster`] is the seam between the balance manager and wherever its
//! transactions land. [`RpcCluster`] talks to a real cluster over JSON-RPC.

use std::time::Duration;

use async_trait::async_trait;
use balance_core::{Instruction, Pubkey, Signature};
use balance_crypto::SigningKeypair;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::{AccountInfo, ClientError, RpcClient};
use crate::transaction::{Message, Transaction, TransactionError};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error("no signers provided")]
    NoSigners,
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Reads accounts and lands transactions.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Fetch an account, `None` if it does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ClusterError>;

    /// Build, sign and land one transaction. `signers[0]` pays the fee.
    async fn submit(
        &self,
        instructions: &[Instruction],
        signers: &[&SigningKeypair],
    ) -> Result<Signature, ClusterError>;

    /// Credit `lamports` to `address` from the cluster faucet.
    async fn airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature, ClusterError>;

    /// Lamport balance of `address`.
    async fn get_balance(&self, address: &Pubkey) -> Result<u64, ClusterError>;
}

/// Confirmation polling parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// JSON-RPC backed cluster.
pub struct RpcCluster {
    client: RpcClient,
    confirm: ConfirmOptions,
}

impl RpcCluster {
    pub fn new(client: RpcClient) -> Self {
        Self {
            client,
            confirm: ConfirmOptions::default(),
        }
    }

    pub fn with_confirm_options(mut self, confirm: ConfirmOptions) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

#[async_trait]
impl Cluster for RpcCluster {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, ClusterError> {
        Ok(self.client.get_account_info(address).await?)
    }

    async fn submit(
        &self,
        instructions: &[Instruction],
        signers: &[&SigningKeypair],
    ) -> Result<Signature, ClusterError> {
        let payer = signers.first().ok_or(ClusterError::NoSigners)?;
        let message = Message::compile(instructions, &payer.pubkey())?;

        let (blockhash, last_valid_block_height) = self.client.get_latest_blockhash().await?;
        debug!(%blockhash, last_valid_block_height, "fetched blockhash");

        let mut transaction = Transaction::new_unsigned(message);
        transaction.sign(signers, blockhash)?;

        let signature = self.client.send_transaction(&transaction).await?;
        info!(%signature, url = %self.client.url(), "transaction sent");

        self.client
            .confirm_transaction(
                &signature,
                Some(last_valid_block_height),
                self.confirm.timeout,
                self.confirm.poll_interval,
            )
            .await?;
        Ok(signature)
    }

    async fn airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature, ClusterError> {
        let signature = self.client.request_airdrop(address, lamports).await?;
        info!(%signature, %address, lamports, "airdrop requested");
        self.client
            .confirm_transaction(&signature, None, self.confirm.timeout, self.confirm.poll_interval)
            .await?;
        Ok(signature)
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, ClusterError> {
        Ok(self.client.get_balance(address).await?)
    }
}
