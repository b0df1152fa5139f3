//! # Error Types
//!
//! `PublishError` is the taxonomy every stage reports in. It is `Clone` so
//! the same failure can be returned to the caller and kept in the attempt's
//! per-stage error slot.
//!
//! `AppError` wraps everything the binary can fail with.

use crate::config::ConfigError;
use clearsign_core::SchemaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a network switch went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMismatch {
    /// The switch was refused, failed, or left the wallet on another chain.
    SwitchFailed,
    /// The wallet does not know the target chain at all.
    UnknownNetwork,
}

impl std::fmt::Display for NetworkMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SwitchFailed => write!(f, "switch failed"),
            Self::UnknownNetwork => write!(f, "network not configured in wallet"),
        }
    }
}

/// Failure of one publish stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Transport or connectivity failure talking to an external endpoint.
    #[error("Network error: {0}")]
    Network(String),

    /// Success status, but the body matches no recognized success shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A stage was invoked without a required earlier result.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// No signing capability, or it returned no account.
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// The wallet or its user declined.
    #[error("Wallet rejected: {0}")]
    WalletRejected(String),

    /// The wallet is on the wrong chain and could not be moved.
    #[error("Network mismatch ({kind}): {message}")]
    NetworkMismatch {
        kind: NetworkMismatch,
        message: String,
    },

    /// A required configuration value is absent.
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A configuration value fails format validation.
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Non-success answer from an external service.
    #[error("External service error ({status}): {message}")]
    ExternalService { status: u16, message: String },

    /// Another stage of the same attempt is still running.
    #[error("Stage {0} is already in flight")]
    StageInFlight(String),

    /// The stage already succeeded in this attempt.
    #[error("Stage {0} already completed")]
    StageAlreadyCompleted(String),
}

impl PublishError {
    /// Stable machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::MalformedResponse(_) => "malformed_response",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::WalletUnavailable(_) => "wallet_unavailable",
            Self::WalletRejected(_) => "wallet_rejected",
            Self::NetworkMismatch {
                kind: NetworkMismatch::SwitchFailed,
                ..
            } => "switch_failed",
            Self::NetworkMismatch {
                kind: NetworkMismatch::UnknownNetwork,
                ..
            } => "unknown_network",
            Self::ConfigurationMissing(_) => "configuration_missing",
            Self::ConfigurationInvalid(_) => "configuration_invalid",
            Self::ExternalService { .. } => "external_service",
            Self::StageInFlight(_) => "stage_in_flight",
            Self::StageAlreadyCompleted(_) => "stage_already_completed",
        }
    }

    /// Guard errors are refusals to start; they leave no trace in the
    /// attempt's state.
    #[must_use]
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            Self::StageInFlight(_) | Self::StageAlreadyCompleted(_)
        )
    }

    pub(crate) fn switch_failed(message: impl Into<String>) -> Self {
        Self::NetworkMismatch {
            kind: NetworkMismatch::SwitchFailed,
            message: message.into(),
        }
    }

    pub(crate) fn unknown_network(message: impl Into<String>) -> Self {
        Self::NetworkMismatch {
            kind: NetworkMismatch::UnknownNetwork,
            message: message.into(),
        }
    }
}

/// Top-level error of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Server error: {0}")]
    Server(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_kinds_are_distinct() {
        assert_eq!(PublishError::unknown_network("x").kind(), "unknown_network");
        assert_eq!(PublishError::switch_failed("x").kind(), "switch_failed");
    }

    #[test]
    fn guard_errors() {
        assert!(PublishError::StageInFlight("content".into()).is_guard());
        assert!(!PublishError::PreconditionFailed("x".into()).is_guard());
    }

    #[test]
    fn display_includes_status() {
        let e = PublishError::ExternalService {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(
            e.to_string(),
            "External service error (503): Service Unavailable"
        );
    }
}
