//! # Graph Inspector
//!
//! Read-only queries over a built [`GraphModel`]. The inspector borrows the
//! model and never mutates it.

use crate::operation::OperationDetails;
use crate::types::{GraphModel, GraphNode, LinkKind, NodeDetails, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// Per-kind counts of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub node_count: usize,
    pub link_count: usize,
    pub operation_count: usize,
    pub read_only_operation_count: usize,
    pub field_count: usize,
    pub deployment_count: usize,
}

/// Query view over one model.
#[derive(Debug, Clone, Copy)]
pub struct GraphInspector<'a> {
    model: &'a GraphModel,
}

impl<'a> GraphInspector<'a> {
    #[must_use]
    pub fn new(model: &'a GraphModel) -> Self {
        Self { model }
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&'a GraphNode> {
        self.model.nodes.iter().find(|n| n.id == id)
    }

    /// The contract node. Always present in a built model.
    #[must_use]
    pub fn contract(&self) -> Option<&'a GraphNode> {
        self.nodes_of(NodeKind::Contract).next()
    }

    /// Nodes of one kind, in model order.
    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &'a GraphNode> + 'a {
        self.model.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Targets of the links leaving `id` with the given kind.
    #[must_use]
    pub fn children(&self, id: NodeId, kind: LinkKind) -> Vec<&'a GraphNode> {
        self.model
            .links
            .iter()
            .filter(|l| l.source == id && l.kind == kind)
            .filter_map(|l| self.node(l.target))
            .collect()
    }

    /// Source of the first link entering `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&'a GraphNode> {
        self.model
            .links
            .iter()
            .find(|l| l.target == id)
            .and_then(|l| self.node(l.source))
    }

    /// Field nodes of an operation.
    #[must_use]
    pub fn fields_of(&self, operation: NodeId) -> Vec<&'a GraphNode> {
        self.children(operation, LinkKind::HasField)
    }

    /// Operation node whose signature or display key equals `key`.
    #[must_use]
    pub fn find_operation(&self, key: &str) -> Option<&'a GraphNode> {
        self.operations().find_map(|(node, details)| {
            (details.signature == key || details.display_keys.iter().any(|k| k == key))
                .then_some(node)
        })
    }

    /// Operations together with their details.
    pub fn operations(
        &self,
    ) -> impl Iterator<Item = (&'a GraphNode, &'a OperationDetails)> + 'a {
        self.model.nodes.iter().filter_map(|n| match &n.details {
            NodeDetails::Operation(details) => Some((n, details)),
            _ => None,
        })
    }

    /// Operations flagged side-effect-free.
    #[must_use]
    pub fn read_only_operations(&self) -> Vec<&'a GraphNode> {
        self.operations()
            .filter(|(_, d)| d.flags.is_read_only)
            .map(|(n, _)| n)
            .collect()
    }

    /// Operations that change state (including those of unknown mutability).
    #[must_use]
    pub fn state_changing_operations(&self) -> Vec<&'a GraphNode> {
        self.operations()
            .filter(|(_, d)| d.flags.has_state_change)
            .map(|(n, _)| n)
            .collect()
    }

    /// Counts per kind.
    #[must_use]
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            node_count: self.model.node_count(),
            link_count: self.model.link_count(),
            operation_count: self.nodes_of(NodeKind::Operation).count(),
            read_only_operation_count: self.read_only_operations().len(),
            field_count: self.nodes_of(NodeKind::Field).count(),
            deployment_count: self.nodes_of(NodeKind::Deployment).count(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
