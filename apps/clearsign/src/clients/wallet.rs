//! # Wallet
//!
//! The user-controlled signing capability behind the chain anchor. The
//! pipeline only needs four requests of it; [`JsonRpcWallet`] forwards them
//! to an EIP-1193 style JSON-RPC endpoint.

use super::rpc::{JsonRpcClient, RpcError};
use crate::chain::{parse_quantity, to_quantity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// The user declined the request.
pub const USER_REJECTED: i64 = 4001;

/// The wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// A wallet request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct WalletError {
    /// Provider error code, when one was returned.
    pub code: Option<i64>,
    pub message: String,
}

impl WalletError {
    #[must_use]
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Remote { code, message } => Self::new(Some(code), message),
            other => Self::new(None, other.to_string()),
        }
    }
}

/// Contract call to be signed and sent by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    /// Hex quantity.
    pub gas: String,
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Accounts the user grants; may prompt.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Chain the wallet is currently on.
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// Ask the wallet to move to `chain_id`.
    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Sign and broadcast; returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, WalletError>;
}

// =============================================================================
// JSON-RPC WALLET
// =============================================================================

/// Wallet reached over JSON-RPC.
#[derive(Debug)]
pub struct JsonRpcWallet {
    rpc: JsonRpcClient,
}

impl JsonRpcWallet {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            rpc: JsonRpcClient::new(url),
        }
    }
}

#[async_trait]
impl Wallet for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let result = self.rpc.call("eth_requestAccounts", json!([])).await?;
        let accounts = result
            .as_array()
            .ok_or_else(|| WalletError::new(None, "accounts response is not a list"))?;
        Ok(accounts
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        let result = self.rpc.call("eth_chainId", json!([])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| WalletError::new(None, format!("invalid chain id: {result}")))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let params = json!([{ "chainId": to_quantity(u128::from(chain_id)) }]);
        self.rpc
            .call("wallet_switchEthereumChain", params)
            .await
            .map(|_| ())
            .map_err(WalletError::from)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, WalletError> {
        let result = self.rpc.call("eth_sendTransaction", json!([tx])).await?;
        result
            .as_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .ok_or_else(|| WalletError::new(None, "wallet returned no transaction hash"))
    }
}
