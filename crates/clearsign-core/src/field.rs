//! # Display Fields
//!
//! Classification of the display fields of one operation.
//!
//! A field is never dropped for lack of classification: an unrecognized
//! format yields `FieldFormat::Unknown` and still becomes a node.

use crate::document::{any_flag, first_key_text, non_empty_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a field is a parameter or a result of its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDirection {
    Input,
    Output,
}

/// Type tag derived from a field's declared format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    Address,
    Amount,
    Date,
    Raw,
    Duration,
    Array,
    Unknown,
}

impl FieldFormat {
    /// Classify a declared format string (`addressName`, `tokenAmount`, ...).
    ///
    /// Patterns are checked in a fixed order; the first match wins.
    #[must_use]
    pub fn classify(format: Option<&str>) -> Self {
        let Some(format) = format else {
            return Self::Unknown;
        };
        let f = format.to_ascii_lowercase();

        if f.contains("array") {
            Self::Array
        } else if f.contains("address") {
            Self::Address
        } else if f.contains("amount") || f == "unit" {
            Self::Amount
        } else if f.contains("duration") {
            Self::Duration
        } else if f.contains("date") {
            Self::Date
        } else if f.contains("raw") || f.contains("calldata") {
            Self::Raw
        } else {
            Self::Unknown
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Amount => "amount",
            Self::Date => "date",
            Self::Raw => "raw",
            Self::Duration => "duration",
            Self::Array => "array",
            Self::Unknown => "unknown",
        }
    }
}

/// Attributes of a field node.
///
/// Nested parameter metadata is surfaced verbatim for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDetails {
    pub path: String,
    pub label: String,
    /// Declared format string, as written.
    pub format: Option<String>,
    pub type_tag: FieldFormat,
    pub direction: FieldDirection,
    /// The whole `params` object.
    pub params: Option<Value>,
    /// `params.types`: type constraints.
    pub types: Option<Value>,
    /// `params.encoding`.
    pub encoding: Option<Value>,
    /// `params.sources`.
    pub sources: Option<Value>,
}

/// Decide the direction of a field.
///
/// Output when the path mentions `output` or `return`, or when the field
/// carries an explicit marker (`isOutput`, `output`, `direction: "output"`).
#[must_use]
pub fn classify_direction(field: &Value, path: &str) -> FieldDirection {
    let lowered = path.to_ascii_lowercase();
    let path_marks_output = lowered.contains("output") || lowered.contains("return");
    let explicit = any_flag(field, &["isOutput", "output"])
        || field
            .get("direction")
            .and_then(Value::as_str)
            .is_some_and(|d| d.eq_ignore_ascii_case("output"));

    if path_marks_output || explicit {
        FieldDirection::Output
    } else {
        FieldDirection::Input
    }
}

/// Collect the fields of one display-format record.
///
/// Nested `fields` groups are flattened; their paths are joined with `.`.
#[must_use]
pub fn collect_fields(format: &Value) -> Vec<FieldDetails> {
    let mut out = Vec::new();
    if let Some(fields) = format.get("fields").and_then(Value::as_array) {
        collect_into(fields, None, &mut out);
    }
    out
}

fn collect_into(fields: &[Value], prefix: Option<&str>, out: &mut Vec<FieldDetails>) {
    for field in fields {
        if !field.is_object() {
            continue;
        }

        let own_path = first_key_text(field, &["path", "value", "$ref"]).unwrap_or_default();
        let path = match prefix {
            Some(p) if !own_path.is_empty() => format!("{p}.{own_path}"),
            Some(p) => p.to_string(),
            None => own_path,
        };

        if let Some(children) = field.get("fields").and_then(Value::as_array) {
            collect_into(children, Some(&path), out);
            continue;
        }

        out.push(field_details(field, path, out.len()));
    }
}

fn field_details(field: &Value, path: String, index: usize) -> FieldDetails {
    let format = first_key_text(field, &["format"]);
    let label = first_key_text(field, &["label"])
        .or_else(|| (!path.is_empty()).then(|| path.clone()))
        .unwrap_or_else(|| format!("Field {}", index + 1));
    let params = field.get("params").filter(|p| !p.is_null()).cloned();
    let param = |key: &str| {
        params
            .as_ref()
            .and_then(|p| p.get(key))
            .filter(|v| !v.is_null())
            .cloned()
    };

    FieldDetails {
        direction: classify_direction(field, &path),
        type_tag: FieldFormat::classify(format.as_deref()),
        types: param("types"),
        encoding: param("encoding"),
        sources: param("sources"),
        label,
        format,
        path,
        params,
    }
}

/// Intent text of a display format. Object-valued intents are rendered as
/// compact JSON.
#[must_use]
pub fn intent_text(format: &Value) -> Option<String> {
    match format.get("intent")? {
        Value::Object(map) if map.is_empty() => None,
        intent @ Value::Object(_) => Some(intent.to_string()),
        other => non_empty_text(other),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_known_formats() {
        assert_eq!(FieldFormat::classify(Some("addressName")), FieldFormat::Address);
        assert_eq!(FieldFormat::classify(Some("tokenAmount")), FieldFormat::Amount);
        assert_eq!(FieldFormat::classify(Some("amount")), FieldFormat::Amount);
        assert_eq!(FieldFormat::classify(Some("date")), FieldFormat::Date);
        assert_eq!(FieldFormat::classify(Some("duration")), FieldFormat::Duration);
        assert_eq!(FieldFormat::classify(Some("raw")), FieldFormat::Raw);
        assert_eq!(FieldFormat::classify(Some("calldata")), FieldFormat::Raw);
        assert_eq!(FieldFormat::classify(Some("addressArray")), FieldFormat::Array);
    }

    #[test]
    fn classify_unknown_formats() {
        assert_eq!(FieldFormat::classify(Some("enum")), FieldFormat::Unknown);
        assert_eq!(FieldFormat::classify(None), FieldFormat::Unknown);
    }

    #[test]
    fn direction_from_path_and_markers() {
        let plain = json!({"path": "to"});
        assert_eq!(classify_direction(&plain, "to"), FieldDirection::Input);
        assert_eq!(
            classify_direction(&plain, "returnValue"),
            FieldDirection::Output
        );
        let flagged = json!({"path": "balance", "isOutput": true});
        assert_eq!(
            classify_direction(&flagged, "balance"),
            FieldDirection::Output
        );
        let directed = json!({"path": "x", "direction": "OUTPUT"});
        assert_eq!(classify_direction(&directed, "x"), FieldDirection::Output);
    }

    #[test]
    fn nested_groups_are_flattened() {
        let format = json!({
            "fields": [
                {"path": "params", "fields": [
                    {"path": "amountIn", "label": "Send", "format": "tokenAmount",
                     "params": {"tokenPath": "params.tokenIn"}},
                    {"path": "recipient", "label": "Beneficiary", "format": "addressName",
                     "params": {"types": ["eoa"], "sources": ["local", "ens"]}}
                ]},
                {"path": "deadline", "format": "date", "params": {"encoding": "timestamp"}}
            ]
        });
        let fields = collect_fields(&format);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].path, "params.amountIn");
        assert_eq!(fields[1].types, Some(json!(["eoa"])));
        assert_eq!(fields[1].sources, Some(json!(["local", "ens"])));
        assert_eq!(fields[2].encoding, Some(json!("timestamp")));
        assert_eq!(fields[2].label, "deadline");
    }

    #[test]
    fn malformed_entries_are_skipped_but_unknown_formats_kept() {
        let format = json!({"fields": [42, {"path": "x", "format": "somethingNew"}]});
        let fields = collect_fields(&format);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].type_tag, FieldFormat::Unknown);
    }

    #[test]
    fn intent_variants() {
        assert_eq!(intent_text(&json!({"intent": "Send"})).as_deref(), Some("Send"));
        assert_eq!(
            intent_text(&json!({"intent": {"Swap": "tokens"}})).as_deref(),
            Some(r#"{"Swap":"tokens"}"#)
        );
        assert_eq!(intent_text(&json!({})), None);
    }
}
