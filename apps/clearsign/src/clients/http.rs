//! Shared response handling for the HTTP clients.

use crate::error::PublishError;
use serde_json::Value;

/// Send a request, mapping transport failures to `PublishError::Network`.
pub(crate) async fn send(
    req: reqwest::RequestBuilder,
    target: &str,
) -> Result<reqwest::Response, PublishError> {
    req.send()
        .await
        .map_err(|e| PublishError::Network(format!("{target}: {e}")))
}

/// Check the status and parse the body as JSON.
///
/// Non-2xx answers become `ExternalService` carrying the body's error
/// message, or the status text when the body has none.
pub(crate) async fn read_json(resp: reqwest::Response) -> Result<Value, PublishError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| PublishError::Network(format!("reading response body: {e}")))?;

    if !status.is_success() {
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        });
        return Err(PublishError::ExternalService {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| PublishError::MalformedResponse(format!("unparsable response body: {e}")))
}

/// Error text of a failure body: `{error: "..."}`, `{error: {message}}` or
/// `{message}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let text = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match value.get("error") {
        Some(Value::String(_)) => value.get("error").and_then(text),
        Some(obj @ Value::Object(_)) => obj.get("message").and_then(text),
        _ => value.get("message").and_then(text),
    }
}
