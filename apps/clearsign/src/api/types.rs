//! # API Request/Response Types
//!
//! JSON structures of the HTTP API.

use crate::error::PublishError;
use crate::pipeline::{AttemptSnapshot, Stage, StageOutcome, StageRequest};
use clearsign_core::{GraphModel, GraphSummary};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR BODY
// =============================================================================

/// Machine-readable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&PublishError> for ErrorBody {
    fn from(err: &PublishError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// Built graph of a posted document.
#[derive(Debug, Clone, Serialize)]
pub struct GraphResponse {
    pub success: bool,
    pub graph: Option<GraphModel>,
    pub summary: Option<GraphSummary>,
    pub error: Option<ErrorBody>,
}

impl GraphResponse {
    pub fn success(graph: GraphModel, summary: GraphSummary) -> Self {
        Self {
            success: true,
            graph: Some(graph),
            summary: Some(summary),
            error: None,
        }
    }

    pub fn error(error: ErrorBody) -> Self {
        Self {
            success: false,
            graph: None,
            summary: None,
            error: Some(error),
        }
    }
}

// =============================================================================
// ATTEMPTS
// =============================================================================

/// Start a publish attempt for `document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttemptRequest {
    pub document: Value,
}

/// An attempt's current view.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResponse {
    pub success: bool,
    pub attempt: Option<AttemptSnapshot>,
    pub error: Option<ErrorBody>,
}

impl AttemptResponse {
    pub fn success(attempt: AttemptSnapshot) -> Self {
        Self {
            success: true,
            attempt: Some(attempt),
            error: None,
        }
    }

    pub fn error(error: ErrorBody) -> Self {
        Self {
            success: false,
            attempt: None,
            error: Some(error),
        }
    }
}

/// Optional inputs of a stage run; each replaces a result the attempt
/// does not hold itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StageInputs {
    pub content_ref: Option<String>,
    pub contract_id: Option<String>,
    pub chain_tx_hash: Option<String>,
    pub edit_cid: Option<String>,
    pub entity_id: Option<String>,
}

impl StageInputs {
    /// Request for `stage`; inputs that do not apply to it are ignored.
    pub fn into_request(self, stage: Stage) -> StageRequest {
        match stage {
            Stage::Content => StageRequest::Content,
            Stage::ChainAnchor => StageRequest::ChainAnchor {
                content_ref: self.content_ref,
                contract_id: self.contract_id,
            },
            Stage::KnowledgeGraph => StageRequest::KnowledgeGraph {
                chain_tx_hash: self.chain_tx_hash,
                edit_cid: self.edit_cid,
                entity_id: self.entity_id,
            },
        }
    }
}

/// Result of one stage run, with the attempt after it.
#[derive(Debug, Clone, Serialize)]
pub struct StageRunResponse {
    pub success: bool,
    pub outcome: Option<StageOutcome>,
    pub error: Option<ErrorBody>,
    pub attempt: Option<AttemptSnapshot>,
}

impl StageRunResponse {
    pub fn success(outcome: StageOutcome, attempt: AttemptSnapshot) -> Self {
        Self {
            success: true,
            outcome: Some(outcome),
            error: None,
            attempt: Some(attempt),
        }
    }

    pub fn error(error: ErrorBody, attempt: Option<AttemptSnapshot>) -> Self {
        Self {
            success: false,
            outcome: None,
            error: Some(error),
            attempt,
        }
    }
}

/// Removal of an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub removed: bool,
}
