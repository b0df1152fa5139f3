//! # clearsign-core
//!
//! The deterministic Schema-to-Graph engine for clearsign - THE LOGIC.
//!
//! This crate turns a clear-signing descriptor (an ERC-7730 style document
//! describing a contract, its operations and the display fields of each
//! operation) into a transient `{nodes, links}` graph model for inspection.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never mutates the document it is handed
//! - Never fails on a parsed document: absent or malformed substructures
//!   degrade to empty collections, so a graph can always be rendered
//! - Resolves every loosely-shaped attribute through a fixed-priority
//!   fallback chain (see [`document`])

// =============================================================================
// MODULES
// =============================================================================

pub mod builder;
pub mod deployment;
pub mod document;
pub mod field;
pub mod inspect;
pub mod layout;
pub mod operation;
pub mod primitives;
pub mod signature;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ContractDetails, GraphLink, GraphModel, GraphNode, LayoutHint, LinkKind, NodeDetails, NodeId,
    NodeKind, SchemaError,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use builder::{SchemaGraphBuilder, build_graph};
pub use deployment::{Deployment, collect_deployments};
pub use document::{Metadata, SchemaDocument};
pub use field::{FieldDetails, FieldDirection, FieldFormat};
pub use inspect::{GraphInspector, GraphSummary};
pub use operation::{MutabilityFlags, OperationDetails, OperationSource, OperationTable};
pub use signature::{abi_signature, function_selector, normalize_signature};
