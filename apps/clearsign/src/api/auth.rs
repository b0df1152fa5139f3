//! # Authentication
//!
//! Optional API key for the HTTP API.
//!
//! - `CLEARSIGN_API_KEY`: when set, every request except `/health` needs
//!   `Authorization: Bearer <key>`.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Configured API key, if any.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("CLEARSIGN_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Compare keys in constant time over the longer of the two lengths.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// Why a request was turned away.
fn credential_failure(request: &Request<Body>, expected: &str) -> Option<&'static str> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Some("missing_authorization_header");
    };
    let token = value
        .to_str()
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .unwrap_or_default();
    (!keys_match(token.as_bytes(), expected.as_bytes())).then_some("invalid_api_key")
}

/// Reject requests without the configured key. `/health` stays open.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let failure = match get_api_key_from_env() {
        Some(expected) if request.uri().path() != "/health" => {
            credential_failure(&request, &expected)
        }
        _ => None,
    };

    if let Some(reason) = failure {
        tracing::warn!(
            event = "auth_failure",
            reason,
            path = %request.uri().path(),
            "request rejected"
        );
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    Ok(next.run(request).await)
}
