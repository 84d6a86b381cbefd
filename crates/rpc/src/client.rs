//! Solana JSON-RPC client
//!
//! Sends JSON-RPC 2.0 requests over HTTP and decodes the handful of
//! methods the balance manager needs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use balance_core::{Commitment, Hash, Pubkey, Signature};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::protocol::{RpcRequest, RpcResponse, SignatureStatus, UiAccount, UiBlockhash, WithContext};
use crate::transaction::{Transaction, TransactionError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("RPC error: code={code}, message={message}")]
    Rpc { code: i64, message: String },
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: Signature, reason: String },
    #[error("Transaction {0} was not confirmed in time")]
    ConfirmationTimeout(Signature),
    #[error("Transaction {signature} expired: block height passed {last_valid_block_height}")]
    BlockhashExpired {
        signature: Signature,
        last_valid_block_height: u64,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// An account as read from the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

impl TryFrom<UiAccount> for AccountInfo {
    type Error = ClientError;

    fn try_from(ui: UiAccount) -> Result<Self> {
        let (payload, encoding) = ui.data;
        if encoding != "base64" {
            return Err(ClientError::InvalidResponse(format!(
                "unexpected account encoding {encoding}"
            )));
        }
        let data = STANDARD
            .decode(payload)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(Self {
            lamports: ui.lamports,
            owner: ui.owner,
            data,
            executable: ui.executable,
        })
    }
}

/// HTTP JSON-RPC client for a Solana cluster.
pub struct RpcClient {
    http_client: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: &str) -> Self {
        Self::new_with_commitment(url, Commitment::default())
    }

    pub fn new_with_commitment(url: &str, commitment: Commitment) -> Self {
        // Use default client if builder fails - reqwest::Client::new() is infallible
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            url: url.to_string(),
            commitment,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Send a JSON-RPC request and decode its result.
    pub async fn send<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, Some(params), id);
        debug!(method, id, "RPC request");

        let response: RpcResponse = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ClientError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| ClientError::InvalidResponse("No result in response".to_string()))?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }

    /// Fetch an account, `None` if it does not exist.
    pub async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let response: WithContext<Option<UiAccount>> = self
            .send(
                "getAccountInfo",
                json!([address.to_string(), { "encoding": "base64", "commitment": self.commitment }]),
            )
            .await?;
        response.value.map(AccountInfo::try_from).transpose()
    }

    /// Lamport balance of an address.
    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let response: WithContext<u64> = self
            .send(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(response.value)
    }

    /// Latest blockhash and the last block height at which it is valid.
    pub async fn get_latest_blockhash(&self) -> Result<(Hash, u64)> {
        let response: WithContext<UiBlockhash> = self
            .send("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;
        let hash = response
            .value
            .blockhash
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("blockhash: {e}")))?;
        Ok((hash, response.value.last_valid_block_height))
    }

    /// Submit a signed transaction. Preflight runs at the client commitment.
    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let encoded = transaction.to_base64()?;
        let signature: String = self
            .send(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": self.commitment }]),
            )
            .await?;
        signature
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("signature: {e}")))
    }

    pub async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let encoded: Vec<String> = signatures.iter().map(ToString::to_string).collect();
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .send(
                "getSignatureStatuses",
                json!([encoded, { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(response.value)
    }

    /// Current block height at the client commitment.
    pub async fn get_block_height(&self) -> Result<u64> {
        self.send("getBlockHeight", json!([{ "commitment": self.commitment }]))
            .await
    }

    /// Ask a faucet-enabled cluster (devnet, testnet, local) for lamports.
    pub async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        let signature: String = self
            .send(
                "requestAirdrop",
                json!([address.to_string(), lamports, { "commitment": self.commitment }]),
            )
            .await?;
        signature
            .parse()
            .map_err(|e| ClientError::InvalidResponse(format!("signature: {e}")))
    }

    /// Poll until `signature` reaches the client commitment, fails, or `timeout` elapses.
    ///
    /// With `last_valid_block_height` set, polling also stops once the chain
    /// moves past it: the transaction can no longer land.
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        last_valid_block_height: Option<u64>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let statuses = self.get_signature_statuses(std::slice::from_ref(signature)).await?;
            if let Some(Some(status)) = statuses.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(ClientError::TransactionFailed {
                        signature: *signature,
                        reason: err.to_string(),
                    });
                }
                if status.satisfies(self.commitment) {
                    info!(%signature, slot = status.slot, commitment = %self.commitment, "transaction confirmed");
                    return Ok(());
                }
            } else if let Some(last_valid) = last_valid_block_height {
                let height = self.get_block_height().await?;
                if height > last_valid {
                    warn!(%signature, height, last_valid, "blockhash expired before confirmation");
                    return Err(ClientError::BlockhashExpired {
                        signature: *signature,
                        last_valid_block_height: last_valid,
                    });
                }
            }

            if Instant::now() >= deadline {
                warn!(%signature, ?last_valid_block_height, "confirmation timed out");
                return Err(ClientError::ConfirmationTimeout(*signature));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
