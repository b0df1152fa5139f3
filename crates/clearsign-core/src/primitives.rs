//! # Innate Primitives
//!
//! Hardcoded constants for the clearsign CORE.
//!
//! The document-location priority lists below are part of the builder's
//! contract: each logical attribute is resolved by walking its list in order
//! and stopping at the first non-empty value.

// =============================================================================
// FALLBACK CHAINS
// =============================================================================

/// Contract label: owner, then top-level name, then in-context contract name.
pub const CONTRACT_LABEL_PATHS: &[&str] = &[
    "metadata.owner",
    "metadata.name",
    "name",
    "context.contract.name",
    "context.$id",
];

/// Label used when every entry of [`CONTRACT_LABEL_PATHS`] is empty.
pub const DEFAULT_CONTRACT_LABEL: &str = "Contract";

/// Contract identifier anchored on-chain next to the content reference.
pub const CONTRACT_IDENTIFIER_PATHS: &[&str] = &["context.$id", "context.contract.$id"];

/// Locations holding the `{chainId, address}` deployment list, in priority order.
pub const DEPLOYMENT_PATHS: &[&str] = &["context.contract.deployments", "context.deployments"];

/// Location of the ABI list.
pub const ABI_PATH: &str = "context.contract.abi";

/// Location of the display-format map.
pub const DISPLAY_FORMATS_PATH: &str = "display.formats";

// =============================================================================
// LAYOUT
// =============================================================================

/// Layout rank of the contract node.
pub const GROUP_CONTRACT: u32 = 0;

/// Layout rank of operation nodes.
pub const GROUP_OPERATION: u32 = 1;

/// Layout rank of field nodes.
pub const GROUP_FIELD: u32 = 2;

/// Layout rank of deployment nodes.
pub const GROUP_DEPLOYMENT: u32 = 3;

/// Radius of the operation ring around the contract.
pub const OPERATION_RING_RADIUS: f64 = 240.0;

/// Radius of each field ring around its operation.
pub const FIELD_RING_RADIUS: f64 = 90.0;

/// Radius of the deployment ring around the contract.
pub const DEPLOYMENT_RING_RADIUS: f64 = 420.0;

// =============================================================================
// ABI
// =============================================================================

/// Length in bytes of a function selector.
pub const SELECTOR_LENGTH: usize = 4;
