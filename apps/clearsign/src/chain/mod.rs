//! # Chain Encoding
//!
//! Byte-level encodings needed to talk to EVM chains:
//! - `abi`: calldata for `publishMetadata(string,string)`
//! - `rlp`: recursive length prefix
//! - `transaction`: EIP-155 legacy transactions signed with secp256k1

pub mod abi;
pub mod rlp;
pub mod transaction;

pub use abi::{PUBLISH_METADATA_SIGNATURE, publish_metadata_calldata};
pub use transaction::LegacyTransaction;

/// Parse a `0x` hex quantity such as `"0x1a"`.
#[must_use]
pub fn parse_quantity(text: &str) -> Option<u128> {
    let digits = text.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}

/// Render a number as a minimal `0x` hex quantity.
#[must_use]
pub fn to_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

/// Decode `0x` hex data.
pub fn decode_hex_data(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = text.trim();
    hex::decode(digits.strip_prefix("0x").unwrap_or(digits))
}
