//! Balance RPC
//!
//! Solana JSON-RPC 2.0 client over HTTP, legacy transaction compilation and
//! signing, and the [`Cluster`] trait the balance manager submits through.

pub mod client;
pub mod cluster;
pub mod protocol;
pub mod transaction;

#[cfg(test)]
mod test_support;

pub use client::{AccountInfo, ClientError, RpcClient};
pub use cluster::{Cluster, ClusterError, ConfirmOptions, RpcCluster};
pub use protocol::{RpcError, RpcRequest, RpcResponse};
pub use transaction::{Message, Transaction, TransactionError, PACKET_DATA_SIZE};

/// Public devnet endpoint.
pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
