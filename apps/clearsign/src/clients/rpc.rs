//! # JSON-RPC Client
//!
//! Minimal JSON-RPC 2.0 over HTTP, shared by the wallet endpoint and the
//! knowledge-graph chain node.

use super::http::error_message;
use crate::error::PublishError;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Failure of a single JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The node answered with a JSON-RPC `error` object.
    #[error("RPC error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

impl RpcError {
    /// JSON-RPC error code, when the node returned one.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RpcError> for PublishError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport(m) => PublishError::Network(m),
            RpcError::Http { status, message } => PublishError::ExternalService { status, message },
            RpcError::Remote { code, message } => PublishError::ExternalService {
                status: 200,
                message: format!("RPC error {code}: {message}"),
            },
            RpcError::Malformed(m) => PublishError::MalformedResponse(m),
        }
    }
}

/// JSON-RPC client bound to one endpoint.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Call `method` and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, url = %self.url, "JSON-RPC call");

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{}: {e}", self.url)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
                message: error_message(&text).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown status")
                        .to_string()
                }),
            });
        }

        let value: Value =
            serde_json::from_str(&text).map_err(|e| RpcError::Malformed(e.to_string()))?;
        parse_envelope(value)
    }
}

/// Extract `result` from a response envelope.
fn parse_envelope(mut value: Value) -> Result<Value, RpcError> {
    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(RpcError::Remote { code, message });
    }
    match value.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::Malformed("missing result".to_string())),
    }
}
