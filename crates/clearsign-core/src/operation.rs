//! # Operation Table
//!
//! Reconciles the two sources describing callable operations:
//!
//! 1. `context.contract.abi` function entries (seed name, inputs, outputs,
//!    mutability)
//! 2. `display.formats` records, merged into an existing row when their key
//!    normalizes to the same signature (or names the same selector), and
//!    otherwise added as a new row keyed by the display key
//!
//! Neither source is authoritative; rows are identified by signature, never
//! by display-key spelling.

use crate::document::{SchemaDocument, first_key_text};
use crate::field::{FieldDetails, collect_fields, intent_text};
use crate::signature::{
    abi_signature, canonical_param_type, display_name, function_selector, is_selector,
    normalize_signature,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// MUTABILITY
// =============================================================================

/// State-mutability flags of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutabilityFlags {
    pub payable: bool,
    pub view: bool,
    pub pure: bool,
    pub has_state_change: bool,
    pub is_read_only: bool,
}

impl MutabilityFlags {
    /// Flags for an operation that changes state.
    ///
    /// Used whenever mutability cannot be determined.
    #[must_use]
    pub const fn state_changing() -> Self {
        Self {
            payable: false,
            view: false,
            pure: false,
            has_state_change: true,
            is_read_only: false,
        }
    }

    const fn read_only(view: bool, pure: bool) -> Self {
        Self {
            payable: false,
            view,
            pure,
            has_state_change: false,
            is_read_only: true,
        }
    }

    const fn payable() -> Self {
        Self {
            payable: true,
            ..Self::state_changing()
        }
    }

    /// Derive flags from an ABI entry.
    ///
    /// `stateMutability` wins; otherwise the legacy `constant` / `payable`
    /// booleans are used; otherwise the operation is treated as
    /// state-changing.
    #[must_use]
    pub fn from_abi_entry(entry: &Value) -> Self {
        match entry.get("stateMutability").and_then(Value::as_str) {
            Some("view") => return Self::read_only(true, false),
            Some("pure") => return Self::read_only(false, true),
            Some("payable") => return Self::payable(),
            Some("nonpayable") => return Self::state_changing(),
            _ => {}
        }

        let flag = |key: &str| entry.get(key).and_then(Value::as_bool);
        match (flag("constant"), flag("payable")) {
            (Some(true), _) => Self::read_only(true, false),
            (_, Some(true)) => Self::payable(),
            _ => Self::state_changing(),
        }
    }
}

impl Default for MutabilityFlags {
    fn default() -> Self {
        Self::state_changing()
    }
}

// =============================================================================
// OPERATION ROW
// =============================================================================

/// Which sources contributed to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSource {
    Abi,
    Display,
    Both,
}

/// One reconciled operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRow {
    /// Normalized signature, or the raw display key when none can be derived.
    pub signature: String,
    pub name: String,
    pub selector: Option<String>,
    /// Display-format keys merged into this row, in document order.
    pub display_keys: Vec<String>,
    /// ABI inputs; `None` when the ABI never mentioned this operation.
    pub abi_inputs: Option<Vec<Value>>,
    pub abi_outputs: Vec<Value>,
    pub flags: MutabilityFlags,
    pub display_format: Option<Value>,
}

impl OperationRow {
    /// Contributing sources.
    #[must_use]
    pub fn source(&self) -> OperationSource {
        match (self.abi_inputs.is_some(), self.display_format.is_some()) {
            (true, true) => OperationSource::Both,
            (true, false) => OperationSource::Abi,
            _ => OperationSource::Display,
        }
    }

    /// Display fields, flattened.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldDetails> {
        self.display_format
            .as_ref()
            .map(collect_fields)
            .unwrap_or_default()
    }

    /// Display field count → ABI input count → 0.
    ///
    /// Display fields are counted after nested groups are flattened, so the
    /// count matches the field nodes linked to this operation.
    #[must_use]
    pub fn field_count(&self) -> usize {
        let has_field_list = self
            .display_format
            .as_ref()
            .and_then(|f| f.get("fields"))
            .is_some_and(Value::is_array);
        if has_field_list {
            return self.fields().len();
        }
        self.abi_inputs.as_ref().map_or(0, Vec::len)
    }

    /// Attribute bag for the operation node.
    #[must_use]
    pub fn details(&self) -> OperationDetails {
        let format = self.display_format.as_ref();
        let strings = |key: &str| -> Vec<String> {
            format
                .and_then(|f| f.get(key))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        OperationDetails {
            signature: self.signature.clone(),
            name: self.name.clone(),
            selector: self.selector.clone(),
            display_keys: self.display_keys.clone(),
            intent: format.and_then(intent_text),
            inputs: self
                .abi_inputs
                .as_deref()
                .map(describe_params)
                .unwrap_or_default(),
            outputs: describe_params(&self.abi_outputs),
            flags: self.flags,
            field_count: self.field_count(),
            required: strings("required"),
            excluded: strings("excluded"),
            source: self.source(),
        }
    }
}

/// Attributes of an operation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDetails {
    pub signature: String,
    pub name: String,
    pub selector: Option<String>,
    pub display_keys: Vec<String>,
    pub intent: Option<String>,
    /// `type name` for each ABI input.
    pub inputs: Vec<String>,
    /// `type name` for each ABI output.
    pub outputs: Vec<String>,
    #[serde(flatten)]
    pub flags: MutabilityFlags,
    pub field_count: usize,
    pub required: Vec<String>,
    pub excluded: Vec<String>,
    pub source: OperationSource,
}

fn describe_params(params: &[Value]) -> Vec<String> {
    params
        .iter()
        .map(|p| {
            let ty = canonical_param_type(p);
            match first_key_text(p, &["name"]) {
                Some(name) => format!("{ty} {name}"),
                None => ty,
            }
        })
        .collect()
}

// =============================================================================
// OPERATION TABLE
// =============================================================================

/// Operations in first-seen order, indexed by signature key.
#[derive(Debug, Clone, Default)]
pub struct OperationTable {
    rows: Vec<OperationRow>,
    /// Signature or raw display key -> row index.
    index: BTreeMap<String, usize>,
}

impl OperationTable {
    /// Build the table: ABI pass first, display pass second.
    #[must_use]
    pub fn from_document(doc: &SchemaDocument) -> Self {
        let mut table = Self::default();
        for entry in doc.abi_entries() {
            table.merge_abi_entry(entry);
        }
        for (key, format) in doc.display_formats() {
            table.merge_display_format(key, format);
        }
        table
    }

    /// Rows in first-seen order.
    #[must_use]
    pub fn rows(&self) -> &[OperationRow] {
        &self.rows
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no operation was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by signature or display key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OperationRow> {
        let idx = normalize_signature(key)
            .and_then(|sig| self.index.get(&sig).copied())
            .or_else(|| self.index.get(key).copied())?;
        self.rows.get(idx)
    }

    /// Merge one ABI entry. Entries without `type` are functions, as in the
    /// Solidity ABI JSON format; other kinds are ignored.
    ///
    /// A repeated signature keeps the first row and overwrites its metadata.
    pub fn merge_abi_entry(&mut self, entry: &Value) {
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or("function");
        if kind != "function" {
            return;
        }
        let Some(name) = first_key_text(entry, &["name"]) else {
            return;
        };

        let inputs = params_of(entry, "inputs");
        let outputs = params_of(entry, "outputs");
        let signature = abi_signature(&name, &inputs);
        let flags = MutabilityFlags::from_abi_entry(entry);

        if let Some(row) = self.row_mut(&signature) {
            row.abi_inputs = Some(inputs);
            row.abi_outputs = outputs;
            row.flags = flags;
            return;
        }

        self.push_row(
            vec![signature.clone()],
            OperationRow {
                selector: Some(function_selector(&signature)),
                signature,
                name,
                display_keys: Vec::new(),
                abi_inputs: Some(inputs),
                abi_outputs: outputs,
                flags,
                display_format: None,
            },
        );
    }

    /// Merge one display-format record under `key`.
    pub fn merge_display_format(&mut self, key: &str, format: &Value) {
        let normalized = normalize_signature(key);
        let existing = normalized
            .as_ref()
            .and_then(|sig| self.index.get(sig).copied())
            .or_else(|| self.index.get(key).copied())
            .or_else(|| self.selector_match(key));

        if let Some(idx) = existing
            && let Some(row) = self.rows.get_mut(idx)
        {
            row.display_format = Some(format.clone());
            row.display_keys.push(key.to_string());
            self.index.entry(key.to_string()).or_insert(idx);
            return;
        }

        let selector = match &normalized {
            Some(sig) => Some(function_selector(sig)),
            None if is_selector(key) => Some(key.to_ascii_lowercase()),
            None => None,
        };
        let mut keys = vec![key.to_string()];
        keys.extend(normalized.clone());

        self.push_row(
            keys,
            OperationRow {
                signature: normalized.unwrap_or_else(|| key.to_string()),
                name: display_name(key).to_string(),
                selector,
                display_keys: vec![key.to_string()],
                abi_inputs: None,
                abi_outputs: Vec::new(),
                flags: MutabilityFlags::state_changing(),
                display_format: Some(format.clone()),
            },
        );
    }

    fn row_mut(&mut self, key: &str) -> Option<&mut OperationRow> {
        let idx = *self.index.get(key)?;
        self.rows.get_mut(idx)
    }

    fn selector_match(&self, key: &str) -> Option<usize> {
        if !is_selector(key) {
            return None;
        }
        self.rows.iter().position(|row| {
            row.selector
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(key))
        })
    }

    fn push_row(&mut self, keys: Vec<String>, row: OperationRow) {
        let idx = self.rows.len();
        self.rows.push(row);
        for key in keys {
            self.index.entry(key).or_insert(idx);
        }
    }
}

fn params_of(entry: &Value, key: &str) -> Vec<Value> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

// =============================================================================
// TESTS
// =============================================================================
