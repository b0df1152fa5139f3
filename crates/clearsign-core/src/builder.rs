//! # Graph Builder
//!
//! The Schema-to-Graph transformation.
//!
//! `build_graph` is total: it never fails and never reads anything but the
//! document it is handed. Node identifiers are assigned sequentially in
//! emission order (contract, then each operation followed by its fields,
//! then deployments), so two builds of the same document are structurally
//! identical.

use crate::deployment::collect_deployments;
use crate::document::SchemaDocument;
use crate::field::FieldDirection;
use crate::layout::{origin, ring_position};
use crate::operation::{OperationSource, OperationTable};
use crate::primitives::{
    DEPLOYMENT_RING_RADIUS, FIELD_RING_RADIUS, GROUP_CONTRACT, GROUP_DEPLOYMENT, GROUP_FIELD,
    GROUP_OPERATION, OPERATION_RING_RADIUS,
};
use crate::types::{
    ContractDetails, GraphLink, GraphModel, GraphNode, LayoutHint, LinkKind, NodeDetails, NodeId,
};

/// Build the graph model of `doc`.
#[must_use]
pub fn build_graph(doc: &SchemaDocument) -> GraphModel {
    SchemaGraphBuilder::new(doc).build()
}

/// One-shot builder over a borrowed document.
#[derive(Debug)]
pub struct SchemaGraphBuilder<'a> {
    doc: &'a SchemaDocument,
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
}

impl<'a> SchemaGraphBuilder<'a> {
    /// Create a builder for `doc`.
    #[must_use]
    pub fn new(doc: &'a SchemaDocument) -> Self {
        Self {
            doc,
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Consume the builder and produce the model.
    #[must_use]
    pub fn build(mut self) -> GraphModel {
        let table = OperationTable::from_document(self.doc);
        let deployments = collect_deployments(self.doc);

        let contract = self.emit_contract(&table, deployments.len());
        let center = origin();

        let op_total = table.len();
        for (i, row) in table.rows().iter().enumerate() {
            let position = ring_position(center, i, op_total, OPERATION_RING_RADIUS);
            let op = self.push_node(
                row.name.clone(),
                GROUP_OPERATION,
                NodeDetails::Operation(row.details()),
                position,
            );
            self.push_link(contract, op, "operation".to_string(), LinkKind::HasOperation);

            let fields = row.fields();
            let field_total = fields.len();
            for (j, field) in fields.into_iter().enumerate() {
                let label = match field.direction {
                    FieldDirection::Input => "input",
                    FieldDirection::Output => "output",
                };
                let id = self.push_node(
                    field.label.clone(),
                    GROUP_FIELD,
                    NodeDetails::Field(field),
                    ring_position(position, j, field_total, FIELD_RING_RADIUS),
                );
                self.push_link(op, id, label.to_string(), LinkKind::HasField);
            }
        }

        let deployment_total = deployments.len();
        for (i, deployment) in deployments.into_iter().enumerate() {
            let label = match deployment.chain_id {
                Some(chain) => format!("chain {chain}"),
                None => "deployment".to_string(),
            };
            let id = self.push_node(
                deployment.label(),
                GROUP_DEPLOYMENT,
                NodeDetails::Deployment(deployment),
                ring_position(center, i, deployment_total, DEPLOYMENT_RING_RADIUS),
            );
            self.push_link(contract, id, label, LinkKind::DeployedAt);
        }

        GraphModel {
            nodes: self.nodes,
            links: self.links,
        }
    }

    fn emit_contract(&mut self, table: &OperationTable, deployment_count: usize) -> NodeId {
        let metadata = self.doc.metadata();
        let abi_function_count = table
            .rows()
            .iter()
            .filter(|row| row.source() != OperationSource::Display)
            .count();

        let details = ContractDetails {
            owner: metadata.owner,
            name: metadata.name,
            version: metadata.version,
            description: metadata.description,
            abi_function_count,
            operation_count: table.len(),
            deployment_count,
        };

        self.push_node(
            self.doc.contract_label(),
            GROUP_CONTRACT,
            NodeDetails::Contract(details),
            origin(),
        )
    }

    fn push_node(
        &mut self,
        label: String,
        group: u32,
        details: NodeDetails,
        layout_hint: LayoutHint,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(GraphNode {
            id,
            label,
            kind: details.kind(),
            group,
            details,
            connection_count: 0,
            layout_hint,
        });
        id
    }

    /// Append a link and bump both endpoints' connection counts.
    fn push_link(&mut self, source: NodeId, target: NodeId, label: String, kind: LinkKind) {
        for endpoint in [source, target] {
            if let Some(node) = self.nodes.get_mut(endpoint.0 as usize) {
                node.connection_count = node.connection_count.saturating_add(1);
            }
        }
        self.links.push(GraphLink {
            source,
            target,
            label,
            kind,
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
