//! # Core Type Definitions
//!
//! This module contains the graph model produced by the builder:
//! - Identifiers (`NodeId`)
//! - Node and link classification (`NodeKind`, `LinkKind`)
//! - The model itself (`GraphNode`, `GraphLink`, `GraphModel`)
//! - Error types (`SchemaError`)
//!
//! ## Invariants
//!
//! A `GraphModel` returned by [`crate::build_graph`]:
//! - Contains exactly one `NodeKind::Contract` node
//! - Only holds links whose endpoints exist in the same model
//! - Is acyclic: links point contract → operation → field and
//!   contract → deployment

use crate::deployment::Deployment;
use crate::field::FieldDetails;
use crate::operation::OperationDetails;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a node within one build result.
///
/// Identifiers are assigned sequentially per build. They are only meaningful
/// inside the `GraphModel` that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// The kind of entity a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Contract,
    Operation,
    Field,
    Deployment,
}

impl NodeKind {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Operation => "operation",
            Self::Field => "field",
            Self::Deployment => "deployment",
        }
    }
}

/// The relationship a link expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// contract → operation
    HasOperation,
    /// operation → field
    HasField,
    /// contract → deployment
    DeployedAt,
}

// =============================================================================
// LAYOUT HINT
// =============================================================================

/// Rendering position for a node.
///
/// Layout carries no meaning: nothing may use it for identity or ordering.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutHint {
    pub x: f64,
    pub y: f64,
    /// Pinned nodes should not be moved by a force simulation.
    pub fixed: bool,
}

impl LayoutHint {
    /// A free position.
    #[must_use]
    pub const fn at(x: f64, y: f64) -> Self {
        Self { x, y, fixed: false }
    }

    /// A pinned position.
    #[must_use]
    pub const fn pinned(x: f64, y: f64) -> Self {
        Self { x, y, fixed: true }
    }
}

// =============================================================================
// NODE DETAILS
// =============================================================================

/// Attributes of the single contract node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetails {
    pub owner: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub abi_function_count: usize,
    pub operation_count: usize,
    pub deployment_count: usize,
}

/// Kind-specific attribute bag carried by every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDetails {
    Contract(ContractDetails),
    Operation(OperationDetails),
    Field(FieldDetails),
    Deployment(Deployment),
}

impl NodeDetails {
    /// The node kind these details belong to.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Contract(_) => NodeKind::Contract,
            Self::Operation(_) => NodeKind::Operation,
            Self::Field(_) => NodeKind::Field,
            Self::Deployment(_) => NodeKind::Deployment,
        }
    }
}

// =============================================================================
// GRAPH MODEL
// =============================================================================

/// A node of the graph model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    /// Layout rank.
    pub group: u32,
    pub details: NodeDetails,
    /// Number of link endpoints touching this node. Display only.
    pub connection_count: usize,
    pub layout_hint: LayoutHint,
}

/// A directed link of the graph model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: NodeId,
    pub target: NodeId,
    pub label: String,
    pub kind: LinkKind,
}

/// The result of one build.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphModel {
    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while turning raw bytes into a [`crate::SchemaDocument`].
///
/// Building a graph from a parsed document never fails; only parsing can.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The input is not valid JSON.
    #[error("Invalid schema JSON: {0}")]
    InvalidJson(String),

    /// The input is valid JSON but not an object.
    #[error("Schema document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(7).to_string(), "n7");
    }

    #[test]
    fn node_kind_names() {
        assert_eq!(NodeKind::Contract.as_str(), "contract");
        assert_eq!(NodeKind::Deployment.as_str(), "deployment");
    }

    #[test]
    fn details_report_their_kind() {
        let details = NodeDetails::Contract(ContractDetails::default());
        assert_eq!(details.kind(), NodeKind::Contract);
    }

    #[test]
    fn node_serializes_camel_case() {
        let node = GraphNode {
            id: NodeId(0),
            label: "Contract".to_string(),
            kind: NodeKind::Contract,
            group: 0,
            details: NodeDetails::Contract(ContractDetails::default()),
            connection_count: 2,
            layout_hint: LayoutHint::pinned(0.0, 0.0),
        };
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["connectionCount"], 2);
        assert_eq!(json["layoutHint"]["fixed"], true);
        assert_eq!(json["details"]["kind"], "contract");
    }
}
