//! # Content Store
//!
//! Uploads the serialized document to a content-addressed blob store.
//!
//! The publisher answers a successful `PUT /v1/blobs` in one of two shapes:
//!
//! ```text
//! {"newlyCreated": {"blobObject": {"blobId", "registeredEpoch", "size"}, "cost"}}
//! {"alreadyCertified": {"blobId", "endEpoch", "event": {"txDigest"}}}
//! ```
//!
//! The second one means the identical bytes were stored before; it is a
//! success. Any other shape is a failure, never a success without an id.

use super::http::{read_json, send};
use crate::config::PipelineConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Receipt of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoredContent {
    NewlyCreated {
        blob_id: String,
        size: Option<u64>,
        registered_epoch: Option<u64>,
        cost: Option<u64>,
    },
    AlreadyCertified {
        blob_id: String,
        end_epoch: Option<u64>,
        tx_digest: Option<String>,
    },
}

impl StoredContent {
    /// Content identifier.
    #[must_use]
    pub fn blob_id(&self) -> &str {
        match self {
            Self::NewlyCreated { blob_id, .. } | Self::AlreadyCertified { blob_id, .. } => blob_id,
        }
    }

    /// True when the store already held these bytes.
    #[must_use]
    pub fn already_existed(&self) -> bool {
        matches!(self, Self::AlreadyCertified { .. })
    }
}

/// Match a success body against the two recognized shapes.
pub fn parse_store_response(body: &Value) -> Result<StoredContent, PublishError> {
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let number = |v: Option<&Value>| v.and_then(Value::as_u64);

    if let Some(created) = body.get("newlyCreated")
        && let Some(blob) = created.get("blobObject")
        && let Some(blob_id) = text(blob.get("blobId"))
    {
        return Ok(StoredContent::NewlyCreated {
            blob_id,
            size: number(blob.get("size")),
            registered_epoch: number(blob.get("registeredEpoch")),
            cost: number(created.get("cost")),
        });
    }

    if let Some(certified) = body.get("alreadyCertified")
        && let Some(blob_id) = text(certified.get("blobId"))
    {
        return Ok(StoredContent::AlreadyCertified {
            blob_id,
            end_epoch: number(certified.get("endEpoch")),
            tx_digest: text(certified.get("event").and_then(|e| e.get("txDigest"))),
        });
    }

    Err(PublishError::MalformedResponse(
        "unexpected response structure".to_string(),
    ))
}

// =============================================================================
// TRAIT
// =============================================================================

/// A content-addressed blob store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `payload` and return its receipt.
    async fn put(&self, payload: &str) -> Result<StoredContent, PublishError>;
}

// =============================================================================
// HTTP PUBLISHER
// =============================================================================

/// Walrus publisher over HTTP.
#[derive(Debug, Clone)]
pub struct WalrusPublisher {
    http: reqwest::Client,
    base_url: String,
}

impl WalrusPublisher {
    /// Publisher at `base_url` (no trailing `/v1`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.publisher_url)
    }
}

#[async_trait]
impl ContentStore for WalrusPublisher {
    async fn put(&self, payload: &str) -> Result<StoredContent, PublishError> {
        let url = format!("{}/v1/blobs", self.base_url);
        let req = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(payload.to_string());
        let resp = send(req, &url).await?;
        let body = read_json(resp).await?;
        parse_store_response(&body)
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
    fn newly_created_shape() {
        let body = json!({"newlyCreated": {
            "blobObject": {"blobId": "abc", "registeredEpoch": 12, "size": 640},
            "cost": 3000
        }});
        let stored = parse_store_response(&body).expect("newly created");
        assert_eq!(stored.blob_id(), "abc");
        assert!(!stored.already_existed());
        assert_eq!(
            stored,
            StoredContent::NewlyCreated {
                blob_id: "abc".into(),
                size: Some(640),
                registered_epoch: Some(12),
                cost: Some(3000),
            }
        );
    }

    #[test]
    fn already_certified_shape() {
        let body = json!({"alreadyCertified": {
            "blobId": "abc", "endEpoch": 40, "event": {"txDigest": "Dg1", "eventSeq": "0"}
        }});
        let stored = parse_store_response(&body).expect("already certified");
        assert!(stored.already_existed());
        assert_eq!(stored.blob_id(), "abc");
    }

    #[test]
    fn already_certified_without_event() {
        let body = json!({"alreadyCertified": {"blobId": "abc", "endEpoch": 40}});
        assert!(matches!(
            parse_store_response(&body),
            Ok(StoredContent::AlreadyCertified { tx_digest: None, .. })
        ));
    }

    #[test]
    fn third_shape_is_malformed() {
        for body in [
            json!({}),
            json!({"markedInvalid": {"blobId": "abc"}}),
            json!({"newlyCreated": {"blobObject": {}}}),
            json!({"alreadyCertified": {"blobId": ""}}),
        ] {
            let err = parse_store_response(&body).expect_err("must fail");
            assert_eq!(
                err,
                PublishError::MalformedResponse("unexpected response structure".into())
            );
        }
    }
}
