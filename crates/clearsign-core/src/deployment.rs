//! # Deployments
//!
//! `{chainId, address}` pairs read from the document, in priority order of
//! [`crate::primitives::DEPLOYMENT_PATHS`], de-duplicated by address.

use crate::document::{SchemaDocument, first_key_text};
use crate::primitives::DEPLOYMENT_PATHS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One on-chain deployment of the described contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Chain id, when it could be read as a decimal or `0x` number.
    pub chain_id: Option<u64>,
    pub address: String,
}

impl Deployment {
    /// Node label: the address, suffixed by its chain when known.
    #[must_use]
    pub fn label(&self) -> String {
        match self.chain_id {
            Some(chain) => format!("{} @ {}", short_address(&self.address), chain),
            None => short_address(&self.address),
        }
    }

    fn from_entry(entry: &Value) -> Option<Self> {
        let address = first_key_text(entry, &["address"])?;
        Some(Self {
            chain_id: entry.get("chainId").and_then(parse_chain_id),
            address,
        })
    }
}

/// All deployments of a document; the first occurrence of an address wins.
///
/// Addresses compare case-insensitively (checksummed vs. lowercase).
#[must_use]
pub fn collect_deployments(doc: &SchemaDocument) -> Vec<Deployment> {
    let mut seen = BTreeSet::new();
    DEPLOYMENT_PATHS
        .iter()
        .filter_map(|path| doc.lookup(path).and_then(Value::as_array))
        .flatten()
        .filter_map(Deployment::from_entry)
        .filter(|d| seen.insert(d.address.to_ascii_lowercase()))
        .collect()
}

/// Read a chain id written as a number, a decimal string or a `0x` string.
#[must_use]
pub fn parse_chain_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

/// `0x1234…abcd` form of long addresses.
fn short_address(address: &str) -> String {
    if address.len() > 12 && address.is_ascii() {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
