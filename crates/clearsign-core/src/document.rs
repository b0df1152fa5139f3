//! # Schema Document
//!
//! An immutable snapshot of a clear-signing descriptor.
//!
//! The same logical attribute may live at several locations under several
//! names, so every accessor here is a fallback extractor: it walks a fixed
//! list of dotted paths (see [`crate::primitives`]) and returns the first
//! non-empty match. Accessors never fail; a missing or wrongly-typed value is
//! reported as `None` or as an empty collection.

use crate::primitives::{
    ABI_PATH, CONTRACT_IDENTIFIER_PATHS, CONTRACT_LABEL_PATHS, DEFAULT_CONTRACT_LABEL,
    DISPLAY_FORMATS_PATH,
};
use crate::types::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptive metadata resolved from the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// A finished clear-signing document.
///
/// Owned by the editing layer and handed over by value; nothing in this
/// workspace mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    root: Value,
}

impl SchemaDocument {
    /// Wrap an already parsed JSON value.
    #[must_use]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Parse a document from JSON text.
    ///
    /// Only JSON objects are accepted; the builder handles every shape of
    /// object, including an empty one.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::try_from_value(root)
    }

    /// Parse a document from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        let root: Value =
            serde_json::from_slice(bytes).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        Self::try_from_value(root)
    }

    /// Wrap a parsed JSON value, rejecting anything but an object.
    pub fn try_from_value(root: Value) -> Result<Self, SchemaError> {
        match root {
            Value::Object(_) => Ok(Self { root }),
            Value::Null => Err(SchemaError::NotAnObject("null")),
            Value::Bool(_) => Err(SchemaError::NotAnObject("boolean")),
            Value::Number(_) => Err(SchemaError::NotAnObject("number")),
            Value::String(_) => Err(SchemaError::NotAnObject("string")),
            Value::Array(_) => Err(SchemaError::NotAnObject("array")),
        }
    }

    /// The raw JSON tree.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// The exact text that is shown to the user and uploaded to the content
    /// store: pretty-printed with two-space indentation, key order preserved.
    /// Numbers keep their written digits, so uint256 constants survive.
    #[must_use]
    pub fn to_payload(&self) -> String {
        serde_json::to_string_pretty(&self.root).unwrap_or_default()
    }

    // =========================================================================
    // PATH EXTRACTORS
    // =========================================================================

    /// Resolve a dotted path such as `context.contract.abi`.
    ///
    /// Segments are matched as literal object keys, so `$id` works as-is.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_in(&self.root, path)
    }

    /// First non-empty text found along `paths`.
    #[must_use]
    pub fn first_text(&self, paths: &[&str]) -> Option<String> {
        paths
            .iter()
            .find_map(|path| self.lookup(path).and_then(non_empty_text))
    }

    /// Descriptive metadata.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        Metadata {
            owner: self.first_text(&["metadata.owner"]),
            name: self.first_text(&["metadata.name", "name", "metadata.info.legalName"]),
            version: self.first_text(&["metadata.version", "version"]),
            description: self.first_text(&["metadata.description", "description"]),
        }
    }

    /// Label of the contract node.
    ///
    /// Priority: owner → top-level name → in-context contract name →
    /// `"Contract"`.
    #[must_use]
    pub fn contract_label(&self) -> String {
        self.first_text(CONTRACT_LABEL_PATHS)
            .unwrap_or_else(|| DEFAULT_CONTRACT_LABEL.to_string())
    }

    /// Identifier anchored on-chain together with the content reference.
    ///
    /// Priority: `context.$id` → first deployment address → contract label.
    #[must_use]
    pub fn contract_identifier(&self) -> String {
        self.first_text(CONTRACT_IDENTIFIER_PATHS)
            .or_else(|| {
                crate::deployment::collect_deployments(self)
                    .into_iter()
                    .next()
                    .map(|d| d.address)
            })
            .unwrap_or_else(|| self.contract_label())
    }

    /// ABI entries. A URL-valued or missing ABI yields an empty slice.
    #[must_use]
    pub fn abi_entries(&self) -> &[Value] {
        match self.lookup(ABI_PATH) {
            Some(Value::Array(entries)) => entries,
            _ => &[],
        }
    }

    /// Display formats in document order.
    #[must_use]
    pub fn display_formats(&self) -> Vec<(&str, &Value)> {
        match self.lookup(DISPLAY_FORMATS_PATH) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// VALUE HELPERS
// =============================================================================

/// Resolve a dotted path below `root`.
#[must_use]
pub fn lookup_in<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

/// Trimmed text of a string value, `None` when absent or blank.
#[must_use]
pub fn non_empty_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Text of the first key in `keys` that holds a non-empty string.
#[must_use]
pub fn first_key_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(non_empty_text))
}

/// True when `value` is a boolean `true` under any of `keys`.
#[must_use]
pub fn any_flag(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .any(|key| value.get(key).and_then(Value::as_bool) == Some(true))
}

// =============================================================================
// TESTS
// =============================================================================
