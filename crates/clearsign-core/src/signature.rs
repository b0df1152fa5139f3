//! # Signature Keys
//!
//! Operations are identified by a normalized signature string
//! `name(type1,type2,...)`. ABI entries and display-format keys describe the
//! same function in different spellings (display keys usually carry
//! parameter names, ABI entries carry tuple components), so both are reduced
//! to the canonical form here before the builder compares them.

use crate::primitives::SELECTOR_LENGTH;
use serde_json::Value;
use sha3::{Digest, Keccak256};

// =============================================================================
// ABI SIDE
// =============================================================================

/// Canonical type of one ABI parameter descriptor.
///
/// `tuple` types are expanded into `(t1,t2)` using their `components`,
/// keeping any array suffix (`tuple[]` → `(t1,t2)[]`).
#[must_use]
pub fn canonical_param_type(param: &Value) -> String {
    let ty = param.get("type").and_then(Value::as_str).unwrap_or("").trim();

    if let Some(suffix) = ty.strip_prefix("tuple") {
        let components = param
            .get("components")
            .and_then(Value::as_array)
            .map(|c| {
                c.iter()
                    .map(canonical_param_type)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();
        return format!("({components}){suffix}");
    }

    canonical_type_name(ty)
}

/// Signature of an ABI function entry from its name and `inputs`.
#[must_use]
pub fn abi_signature(name: &str, inputs: &[Value]) -> String {
    let types: Vec<String> = inputs.iter().map(canonical_param_type).collect();
    format!("{}({})", name.trim(), types.join(","))
}

// =============================================================================
// DISPLAY-KEY SIDE
// =============================================================================

/// Normalize a human-written signature such as
/// `transfer(address _to, uint256 _value)` into `transfer(address,uint256)`.
///
/// Returns `None` when the key carries no parameter list (for example a
/// 4-byte selector key).
#[must_use]
pub fn normalize_signature(key: &str) -> Option<String> {
    let key = key.trim();
    let open = key.find('(')?;
    let close = key.rfind(')')?;
    if close < open {
        return None;
    }

    let name = key[..open].trim();
    if name.is_empty() {
        return None;
    }

    let types: Vec<String> = split_top_level(&key[open + 1..close])
        .into_iter()
        .map(param_type)
        .collect();

    Some(format!("{name}({})", types.join(",")))
}

/// Display name of a key: the part before the parameter list.
#[must_use]
pub fn display_name(key: &str) -> &str {
    key.split('(').next().unwrap_or(key).trim()
}

/// True for `0x`-prefixed 4-byte selectors.
#[must_use]
pub fn is_selector(key: &str) -> bool {
    key.strip_prefix("0x")
        .or_else(|| key.strip_prefix("0X"))
        .is_some_and(|hex| {
            hex.len() == SELECTOR_LENGTH * 2 && hex.chars().all(|c| c.is_ascii_hexdigit())
        })
}

/// Keccak-256 of `signature`, truncated to the 4-byte selector and rendered
/// as lowercase `0x` hex.
#[must_use]
pub fn function_selector(signature: &str) -> String {
    format!("0x{}", hex::encode(selector_bytes(signature)))
}

/// Raw 4-byte selector of `signature`.
#[must_use]
pub fn selector_bytes(signature: &str) -> [u8; SELECTOR_LENGTH] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; SELECTOR_LENGTH];
    out.copy_from_slice(&digest[..SELECTOR_LENGTH]);
    out
}

// =============================================================================
// INTERNALS
// =============================================================================

/// Expand the solidity shorthands `uint`, `int` and `byte`.
fn canonical_type_name(ty: &str) -> String {
    let (base, suffix) = match ty.find('[') {
        Some(idx) => ty.split_at(idx),
        None => (ty, ""),
    };
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        "byte" => "bytes1",
        other => other,
    };
    format!("{base}{suffix}")
}

/// Type part of one written parameter, dropping its name and any data
/// location keyword.
fn param_type(param: &str) -> String {
    let param = param.trim();
    let tuple_body = param
        .strip_prefix("tuple(")
        .map(|rest| (rest, 6))
        .or_else(|| param.strip_prefix('(').map(|rest| (rest, 1)));

    if let Some((_, offset)) = tuple_body
        && let Some(close) = matching_paren(param, offset - 1)
    {
        let inner: Vec<String> = split_top_level(&param[offset..close])
            .into_iter()
            .map(param_type)
            .collect();
        let suffix: String = param[close + 1..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        return format!("({}){suffix}", inner.join(","));
    }

    canonical_type_name(param.split_whitespace().next().unwrap_or(""))
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

// =============================================================================
// TESTS
// =============================================================================
