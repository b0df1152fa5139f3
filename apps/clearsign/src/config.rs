//! # Pipeline Configuration
//!
//! One explicit configuration struct, built once at startup and handed to
//! the pipeline and its clients by `Arc`.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config <path>`)
//! 3. Environment variables
//!
//! | option | env var |
//! | --- | --- |
//! | content store base URL | `CLEARSIGN_PUBLISHER_URL` |
//! | anchor chain id | `CLEARSIGN_CHAIN_ID` |
//! | anchor contract address | `CLEARSIGN_CONTRACT_ADDRESS` |
//! | wallet JSON-RPC endpoint | `CLEARSIGN_WALLET_RPC_URL` |
//! | knowledge-graph signing key | `CLEARSIGN_KG_PRIVATE_KEY` |
//! | knowledge-graph space id | `CLEARSIGN_KG_SPACE_ID` |
//! | knowledge-graph API base | `CLEARSIGN_KG_API_BASE` |
//! | knowledge-graph chain RPC | `CLEARSIGN_KG_RPC_URL` |
//! | knowledge-graph chain id | `CLEARSIGN_KG_CHAIN_ID` |
//! | anchor gas limit | `CLEARSIGN_GAS_LIMIT` |
//!
//! Missing stage requirements are not a startup error. They surface as
//! `ConfigurationMissing` when the stage that needs them runs.

use crate::error::PublishError;
use clearsign_core::deployment::parse_chain_id;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Public testnet publisher of the content store.
pub const DEFAULT_PUBLISHER_URL: &str = "https://publisher.walrus-testnet.walrus.space";

/// Knowledge-graph testnet API.
pub const DEFAULT_KG_API_BASE: &str = "https://hypergraph-v2-testnet.up.railway.app";

/// Space that receives contract entities.
pub const DEFAULT_KG_SPACE_ID: &str = "7f8a6c1e-3b2d-4e59-9a41-0c6d2b8e5f37";

/// Knowledge-graph testnet chain.
pub const DEFAULT_KG_RPC_URL: &str = "https://rpc-geo-test-zc16z3tcvf.t.conduit.xyz";

/// Chain id of [`DEFAULT_KG_RPC_URL`].
pub const DEFAULT_KG_CHAIN_ID: u64 = 19411;

/// Fixed gas placeholder for transactions; never estimated.
pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

/// Hex digits in a signing key.
pub const SIGNING_KEY_HEX_LEN: usize = 64;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config file: {0}")]
    Parse(String),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

// =============================================================================
// SIGNING KEY
// =============================================================================

/// Validated secp256k1 private key for knowledge-graph writes.
///
/// Accepts 64 hex characters with an optional `0x` prefix. `Debug` never
/// prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    bytes: [u8; 32],
}

impl SigningKey {
    /// Validate and normalize a raw key string.
    pub fn parse(raw: &str) -> Result<Self, PublishError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != SIGNING_KEY_HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PublishError::ConfigurationInvalid(format!(
                "signing key must be {SIGNING_KEY_HEX_LEN} hex characters with an optional 0x prefix"
            )));
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| PublishError::ConfigurationInvalid(format!("signing key: {e}")))?;
        Ok(Self { bytes })
    }

    /// Raw scalar bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

// =============================================================================
// FILE LAYER
// =============================================================================

/// Shape of the optional TOML file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub publisher_url: Option<String>,
    pub chain_id: Option<u64>,
    pub contract_address: Option<String>,
    pub wallet_rpc_url: Option<String>,
    pub kg_private_key: Option<String>,
    pub kg_space_id: Option<String>,
    pub kg_api_base: Option<String>,
    pub kg_rpc_url: Option<String>,
    pub kg_chain_id: Option<u64>,
    pub gas_limit: Option<u64>,
}

// =============================================================================
// PIPELINE CONFIG
// =============================================================================

/// Configuration of the pipeline and its clients.
#[derive(Clone)]
pub struct PipelineConfig {
    pub publisher_url: String,
    /// Chain the anchor transaction must be sent on.
    pub chain_id: Option<u64>,
    /// Contract receiving `publishMetadata`.
    pub contract_address: Option<String>,
    pub wallet_rpc_url: Option<String>,
    /// Raw key text; validated when stage 3 runs.
    pub kg_private_key: Option<String>,
    pub kg_space_id: String,
    pub kg_api_base: String,
    pub kg_rpc_url: String,
    pub kg_chain_id: u64,
    pub gas_limit: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            chain_id: None,
            contract_address: None,
            wallet_rpc_url: None,
            kg_private_key: None,
            kg_space_id: DEFAULT_KG_SPACE_ID.to_string(),
            kg_api_base: DEFAULT_KG_API_BASE.to_string(),
            kg_rpc_url: DEFAULT_KG_RPC_URL.to_string(),
            kg_chain_id: DEFAULT_KG_CHAIN_ID,
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("publisher_url", &self.publisher_url)
            .field("chain_id", &self.chain_id)
            .field("contract_address", &self.contract_address)
            .field("wallet_rpc_url", &self.wallet_rpc_url)
            .field(
                "kg_private_key",
                &self.kg_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("kg_space_id", &self.kg_space_id)
            .field("kg_api_base", &self.kg_api_base)
            .field("kg_chain_id", &self.kg_chain_id)
            .finish()
    }
}

impl PipelineConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Read {
                    path: p.display().to_string(),
                    reason: e.to_string(),
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(Self::default().with_file(file))
    }

    /// Overlay the file layer.
    #[must_use]
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.publisher_url {
            self.publisher_url = v;
        }
        if let Some(v) = file.kg_space_id {
            self.kg_space_id = v;
        }
        if let Some(v) = file.kg_api_base {
            self.kg_api_base = v;
        }
        if let Some(v) = file.kg_rpc_url {
            self.kg_rpc_url = v;
        }
        if let Some(v) = file.kg_chain_id {
            self.kg_chain_id = v;
        }
        if let Some(v) = file.gas_limit {
            self.gas_limit = v;
        }
        self.chain_id = file.chain_id.or(self.chain_id);
        self.contract_address = file.contract_address.or(self.contract_address);
        self.wallet_rpc_url = file.wallet_rpc_url.or(self.wallet_rpc_url);
        self.kg_private_key = file.kg_private_key.or(self.kg_private_key);
        self
    }

    /// Overlay variables read through `lookup`. Blank values count as unset.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = var("CLEARSIGN_PUBLISHER_URL") {
            self.publisher_url = v;
        }
        if let Some(v) = var("CLEARSIGN_CHAIN_ID") {
            self.chain_id = Some(parse_number("CLEARSIGN_CHAIN_ID", &v)?);
        }
        if let Some(v) = var("CLEARSIGN_CONTRACT_ADDRESS") {
            self.contract_address = Some(v);
        }
        if let Some(v) = var("CLEARSIGN_WALLET_RPC_URL") {
            self.wallet_rpc_url = Some(v);
        }
        if let Some(v) = var("CLEARSIGN_KG_PRIVATE_KEY") {
            self.kg_private_key = Some(v);
        }
        if let Some(v) = var("CLEARSIGN_KG_SPACE_ID") {
            self.kg_space_id = v;
        }
        if let Some(v) = var("CLEARSIGN_KG_API_BASE") {
            self.kg_api_base = v;
        }
        if let Some(v) = var("CLEARSIGN_KG_RPC_URL") {
            self.kg_rpc_url = v;
        }
        if let Some(v) = var("CLEARSIGN_KG_CHAIN_ID") {
            self.kg_chain_id = parse_number("CLEARSIGN_KG_CHAIN_ID", &v)?;
        }
        if let Some(v) = var("CLEARSIGN_GAS_LIMIT") {
            self.gas_limit = parse_number("CLEARSIGN_GAS_LIMIT", &v)?;
        }
        Ok(self)
    }

    /// Chain id and contract address required by the chain anchor.
    pub fn anchor_target(&self) -> Result<(u64, &str), PublishError> {
        let chain_id = self
            .chain_id
            .ok_or_else(|| PublishError::ConfigurationMissing("target chain id".to_string()))?;
        let contract = self
            .contract_address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| {
                PublishError::ConfigurationMissing("target contract address".to_string())
            })?;
        Ok((chain_id, contract))
    }

    /// The validated knowledge-graph signing key.
    pub fn signing_key(&self) -> Result<SigningKey, PublishError> {
        let raw = self
            .kg_private_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                PublishError::ConfigurationMissing("knowledge-graph signing key".to_string())
            })?;
        SigningKey::parse(raw)
    }
}

/// Decimal or `0x` number.
fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    parse_chain_id(&Value::String(value.to_string())).ok_or_else(|| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn defaults_leave_stage_requirements_empty() {
        let config = PipelineConfig::default();
        assert_eq!(config.publisher_url, DEFAULT_PUBLISHER_URL);
        assert!(matches!(
            config.anchor_target(),
            Err(PublishError::ConfigurationMissing(_))
        ));
        assert!(matches!(
            config.signing_key(),
            Err(PublishError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn signing_key_accepts_optional_prefix() {
        let plain = SigningKey::parse(KEY).expect("plain key");
        let prefixed = SigningKey::parse(&format!("0x{}", KEY.to_uppercase())).expect("prefixed");
        assert_eq!(plain, prefixed);
    }

    #[test]
    fn signing_key_rejects_bad_formats() {
        let non_hex = format!("{}zz", &KEY[..62]);
        for bad in ["", "0x1234", &KEY[..63], non_hex.as_str()] {
            assert!(matches!(
                SigningKey::parse(bad),
                Err(PublishError::ConfigurationInvalid(_))
            ));
        }
    }

    #[test]
    fn debug_redacts_keys() {
        let key = SigningKey::parse(KEY).expect("key");
        assert!(!format!("{key:?}").contains("4c08"));

        let config = PipelineConfig {
            kg_private_key: Some(KEY.to_string()),
            ..PipelineConfig::default()
        };
        assert!(!format!("{config:?}").contains("4c08"));
    }

    #[test]
    fn overrides_win_and_blanks_are_ignored() {
        let config = PipelineConfig::default()
            .with_overrides(|var| match var {
                "CLEARSIGN_CHAIN_ID" => Some("0x89".to_string()),
                "CLEARSIGN_CONTRACT_ADDRESS" => Some("0xabc".to_string()),
                "CLEARSIGN_PUBLISHER_URL" => Some("   ".to_string()),
                _ => None,
            })
            .expect("overrides");
        assert_eq!(config.anchor_target().expect("target"), (137, "0xabc"));
        assert_eq!(config.publisher_url, DEFAULT_PUBLISHER_URL);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = PipelineConfig::default()
            .with_overrides(|var| (var == "CLEARSIGN_CHAIN_ID").then(|| "mainnet".to_string()))
            .expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "CLEARSIGN_CHAIN_ID",
                ..
            }
        ));
    }
}
