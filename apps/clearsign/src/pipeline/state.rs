//! # Publish State
//!
//! Stage names, the phase machine and the append-only result record of one
//! publish attempt.
//!
//! ```text
//! Idle ─► ContentPublishing ─► ContentPublished ─► ChainAnchoring ─► ChainAnchored
//!                                                                        │
//!                        Complete ◄─ GraphWriting ◄──────────────────────┘
//!
//! any *ing phase ─► Failed(stage)   (earlier results untouched, retryable)
//! ```

use crate::clients::{ContractCall, Edit, StoredContent};
use crate::error::PublishError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// =============================================================================
// STAGE
// =============================================================================

/// One of the three publish stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Content,
    ChainAnchor,
    KnowledgeGraph,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Content, Stage::ChainAnchor, Stage::KnowledgeGraph];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::ChainAnchor => "chain_anchor",
            Self::KnowledgeGraph => "knowledge_graph",
        }
    }

    /// Phase while this stage runs.
    #[must_use]
    pub fn running_phase(&self) -> Phase {
        match self {
            Self::Content => Phase::ContentPublishing,
            Self::ChainAnchor => Phase::ChainAnchoring,
            Self::KnowledgeGraph => Phase::GraphWriting,
        }
    }

    /// Phase after this stage succeeds.
    #[must_use]
    pub fn completed_phase(&self) -> Phase {
        match self {
            Self::Content => Phase::ContentPublished,
            Self::ChainAnchor => Phase::ChainAnchored,
            Self::KnowledgeGraph => Phase::Complete,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Self::Content),
            "chain_anchor" | "chain-anchor" => Ok(Self::ChainAnchor),
            "knowledge_graph" | "knowledge-graph" => Ok(Self::KnowledgeGraph),
            other => Err(PublishError::PreconditionFailed(format!(
                "unknown stage '{other}'"
            ))),
        }
    }
}

// =============================================================================
// PHASE
// =============================================================================

/// Where an attempt is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", content = "stage", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    ContentPublishing,
    ContentPublished,
    ChainAnchoring,
    ChainAnchored,
    GraphWriting,
    Complete,
    /// The named stage failed; results of earlier stages are intact.
    Failed(Stage),
}

impl Phase {
    /// True while a stage is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::ContentPublishing | Self::ChainAnchoring | Self::GraphWriting
        )
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A stage's last failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub kind: String,
    pub message: String,
}

impl From<&PublishError> for StageFailure {
    fn from(err: &PublishError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Sub-steps of the knowledge-graph write that already went through.
///
/// A retry resumes after the last recorded one, so an uploaded edit is
/// never uploaded again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphWriteProgress {
    /// Built edit; not serialized to keep state payloads small.
    #[serde(skip)]
    pub edit: Option<Edit>,
    pub entity_id: Option<String>,
    pub edit_cid: Option<String>,
    pub calldata: Option<ContractCall>,
}

impl GraphWriteProgress {
    /// Progress of an edit uploaded in an earlier session.
    #[must_use]
    pub fn resumed(entity_id: String, edit_cid: String) -> Self {
        Self {
            edit: None,
            entity_id: Some(entity_id),
            edit_cid: Some(edit_cid),
            calldata: None,
        }
    }

    /// `(edit_cid, entity_id)` once the edit is uploaded. Both are needed to
    /// resume the write from another session.
    #[must_use]
    pub fn uploaded_edit(&self) -> Option<(&str, &str)> {
        self.edit_cid.as_deref().zip(self.entity_id.as_deref())
    }
}

/// Accumulated results of one attempt.
///
/// Success fields are only ever set once; a later failure never clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishState {
    pub content_ref: Option<String>,
    pub content_already_existed: Option<bool>,
    /// Full store receipt.
    pub content: Option<StoredContent>,
    pub chain_tx_hash: Option<String>,
    pub kg_entity_id: Option<String>,
    pub kg_tx_hash: Option<String>,
    pub graph_progress: GraphWriteProgress,
    pub stage_errors: BTreeMap<Stage, StageFailure>,
}

impl PublishState {
    /// True when `stage` has a recorded success.
    #[must_use]
    pub fn is_completed(&self, stage: Stage) -> bool {
        match stage {
            Stage::Content => self.content_ref.is_some(),
            Stage::ChainAnchor => self.chain_tx_hash.is_some(),
            Stage::KnowledgeGraph => self.kg_tx_hash.is_some(),
        }
    }

    #[must_use]
    pub fn error(&self, stage: Stage) -> Option<&StageFailure> {
        self.stage_errors.get(&stage)
    }
}
