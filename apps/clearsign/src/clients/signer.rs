//! # Key Transactor
//!
//! Signs and submits knowledge-graph transactions with the configured
//! private key. There is no user prompt here, unlike the chain anchor.

use super::rpc::JsonRpcClient;
use crate::chain::transaction::transaction_hash;
use crate::chain::{LegacyTransaction, decode_hex_data, parse_quantity};
use crate::config::{PipelineConfig, SigningKey};
use crate::error::PublishError;
use async_trait::async_trait;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};

/// Target and calldata of a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    pub to: String,
    pub data: String,
}

#[async_trait]
pub trait KeyTransactor: Send + Sync {
    /// Account address controlled by `key`.
    fn address(&self, key: &SigningKey) -> Result<String, PublishError>;

    /// Sign `call` with `key`, broadcast it, return the transaction hash.
    async fn send_transaction(
        &self,
        key: &SigningKey,
        call: &ContractCall,
    ) -> Result<String, PublishError>;
}

fn ecdsa_key(key: &SigningKey) -> Result<k256::ecdsa::SigningKey, PublishError> {
    k256::ecdsa::SigningKey::from_slice(key.as_bytes())
        .map_err(|e| PublishError::ConfigurationInvalid(format!("signing key: {e}")))
}

/// `0x` address of the account controlled by `key`.
pub fn address_of(key: &SigningKey) -> Result<String, PublishError> {
    let signing = ecdsa_key(key)?;
    let point = signing.verifying_key().to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}

// =============================================================================
// LOCAL KEY TRANSACTOR
// =============================================================================

/// Signs locally and submits through `eth_sendRawTransaction`.
#[derive(Debug)]
pub struct LocalKeyTransactor {
    rpc: JsonRpcClient,
    chain_id: u64,
    gas_limit: u64,
}

impl LocalKeyTransactor {
    #[must_use]
    pub fn new(rpc_url: &str, chain_id: u64, gas_limit: u64) -> Self {
        Self {
            rpc: JsonRpcClient::new(rpc_url),
            chain_id,
            gas_limit,
        }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.kg_rpc_url, config.kg_chain_id, config.gas_limit)
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, PublishError> {
        let result = self.rpc.call(method, params).await?;
        result.as_str().and_then(parse_quantity).ok_or_else(|| {
            PublishError::MalformedResponse(format!("{method} returned {result}"))
        })
    }
}

#[async_trait]
impl KeyTransactor for LocalKeyTransactor {
    fn address(&self, key: &SigningKey) -> Result<String, PublishError> {
        address_of(key)
    }

    async fn send_transaction(
        &self,
        key: &SigningKey,
        call: &ContractCall,
    ) -> Result<String, PublishError> {
        let signing = ecdsa_key(key)?;
        let from = address_of(key)?;

        let to = decode_hex_data(&call.to)
            .ok()
            .filter(|b| b.len() == 20)
            .ok_or_else(|| {
                PublishError::MalformedResponse(format!("invalid call target: {}", call.to))
            })?;
        let data = decode_hex_data(&call.data)
            .map_err(|e| PublishError::MalformedResponse(format!("invalid calldata: {e}")))?;

        let nonce = self
            .quantity("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;

        let tx = LegacyTransaction {
            nonce: u64::try_from(nonce)
                .map_err(|_| PublishError::MalformedResponse(format!("nonce {nonce}")))?,
            gas_price,
            gas_limit: self.gas_limit,
            to,
            value: 0,
            data,
            chain_id: self.chain_id,
        };
        let raw = tx
            .sign(&signing)
            .map_err(|e| PublishError::ConfigurationInvalid(format!("signing failed: {e}")))?;
        let local_hash = transaction_hash(&raw);

        tracing::info!(from = %from, nonce = tx.nonce, tx = %local_hash, "Submitting knowledge-graph transaction");

        let result = self
            .rpc
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
            )
            .await?;
        Ok(result
            .as_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .unwrap_or(local_hash))
    }
}
