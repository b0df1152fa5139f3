//! # ABI Calldata
//!
//! Solidity ABI encoding for calls whose arguments are all `string`.
//! Dynamic arguments are laid out as a head of 32-byte offsets followed by
//! a tail of length-prefixed, zero-padded payloads.

use clearsign_core::signature::selector_bytes;

/// Function anchoring a content reference on-chain.
pub const PUBLISH_METADATA_SIGNATURE: &str = "publishMetadata(string,string)";

const WORD: usize = 32;

/// `0x` calldata of `publishMetadata(blob_id, contract_id)`.
#[must_use]
pub fn publish_metadata_calldata(blob_id: &str, contract_id: &str) -> String {
    format!(
        "0x{}",
        hex::encode(encode_call(PUBLISH_METADATA_SIGNATURE, &[blob_id, contract_id]))
    )
}

/// Selector of `signature` followed by the encoded string arguments.
#[must_use]
pub fn encode_call(signature: &str, args: &[&str]) -> Vec<u8> {
    let mut out = selector_bytes(signature).to_vec();
    out.extend(encode_strings(args));
    out
}

/// Encode a tuple of strings.
#[must_use]
pub fn encode_strings(args: &[&str]) -> Vec<u8> {
    let head_len = WORD * args.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        head.extend_from_slice(&word(head_len + tail.len()));
        tail.extend_from_slice(&word(arg.len()));
        tail.extend_from_slice(arg.as_bytes());
        let padding = (WORD - arg.len() % WORD) % WORD;
        tail.resize(tail.len() + padding, 0);
    }

    head.extend(tail);
    head
}

/// Big-endian 32-byte word.
fn word(value: usize) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    out
}
