//! Integration tests for the clearsign HTTP API.
//!
//! Uses axum-test to drive the router without binding a socket. External
//! systems are the in-memory doubles from `common`.

// Tests that touch CLEARSIGN_API_KEY are serialized through AUTH_TEST_MUTEX
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

mod common;

use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use clearsign::api::{AppState, HealthResponse, create_router};
use common::*;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("CLEARSIGN_API_KEY") };
    }
}

/// Server over a fresh harness, authentication off.
fn create_test_server(harness: &Harness) -> (TestServer, TestGuard) {
    serve_state(AppState::new(full_config(), harness.services()))
}

fn serve_state(state: AppState) -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("CLEARSIGN_API_KEY") };
    (
        TestServer::new(create_router(state)).unwrap(),
        TestGuard { _guard: guard },
    )
}

fn document_json() -> Value {
    token_document().as_value().clone()
}

async fn create_attempt(server: &TestServer) -> String {
    let response = server
        .post("/attempts")
        .json(&json!({ "document": document_json() }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["attempt"]["id"].as_str().unwrap().to_string()
}

async fn run_stage(server: &TestServer, id: &str, stage: &str) -> axum_test::TestResponse {
    server
        .post(&format!("/attempts/{id}/stages/{stage}"))
        .await
}

// =============================================================================
// HEALTH & GRAPH
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_graph_of_document() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    let response = server.post("/graph").json(&document_json()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["deploymentCount"], 1);
    assert!(body["summary"]["operationCount"].as_u64().unwrap() >= 2);
    let nodes = body["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len() as u64, body["summary"]["nodeCount"].as_u64().unwrap());
}

#[tokio::test]
async fn test_graph_rejects_non_object() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    let response = server.post("/graph").json(&json!([1, 2, 3])).await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "invalid_document");
}

// =============================================================================
// ATTEMPTS
// =============================================================================

#[tokio::test]
async fn test_create_attempt_starts_idle() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    let id = create_attempt(&server).await;
    let response = server.get(&format!("/attempts/{id}")).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["attempt"]["phase"], "idle");
    assert_eq!(body["attempt"]["inFlight"], Value::Null);
    assert_eq!(body["attempt"]["state"]["contentRef"], Value::Null);
    assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn test_attempt_shows_upload_payload() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let max_uint = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
    let document: Value =
        serde_json::from_str(&format!(r#"{{"context":{{"$id":"acme-token"}},"threshold":{max_uint}}}"#))
            .unwrap();

    let response = server
        .post("/attempts")
        .json(&json!({ "document": document }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let payload = body["attempt"]["payload"].as_str().unwrap();
    assert!(payload.contains(&format!("\"threshold\": {max_uint}")));
}

#[tokio::test]
async fn test_idle_attempts_expire_on_next_create() {
    let h = Harness::new();
    let state = AppState::new(full_config(), h.services()).with_attempt_ttl(Some(Duration::ZERO));
    let (server, _guard) = serve_state(state.clone());

    let first = create_attempt(&server).await;
    let second = create_attempt(&server).await;

    server
        .get(&format!("/attempts/{first}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server.get(&format!("/attempts/{second}")).await.assert_status_ok();
    assert_eq!(state.attempts.read().await.len(), 1);
}

#[tokio::test]
async fn test_attempts_kept_without_ttl() {
    let h = Harness::new();
    let state = AppState::new(full_config(), h.services()).with_attempt_ttl(None);
    let (server, _guard) = serve_state(state.clone());

    create_attempt(&server).await;
    create_attempt(&server).await;

    assert_eq!(state.cleanup_expired().await, 0);
    assert_eq!(state.attempts.read().await.len(), 2);
}

#[tokio::test]
async fn test_create_attempt_rejects_bad_document() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    let response = server
        .post("/attempts")
        .json(&json!({ "document": "not a document" }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "invalid_document");
}

#[tokio::test]
async fn test_unknown_attempt() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);

    server
        .get("/attempts/nope")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let response = run_stage(&server, "nope", "content").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "not_found");
}

#[tokio::test]
async fn test_delete_attempt() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;

    let response = server.delete(&format!("/attempts/{id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["removed"], true);

    server
        .delete(&format!("/attempts/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/attempts/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// STAGES
// =============================================================================

#[tokio::test]
async fn test_full_publish_over_http() {
    let h = Harness::new().with_wallet(MockWallet::on_chain(10));
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;

    let response = run_stage(&server, &id, "content").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"]["stage"], "content");
    assert_eq!(body["outcome"]["alreadyExisted"], false);
    assert_eq!(body["attempt"]["phase"], "content_published");
    let content_ref = body["outcome"]["contentRef"].as_str().unwrap().to_string();

    let response = run_stage(&server, &id, "chain-anchor").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"]["txHash"], ANCHOR_TX);
    assert_eq!(body["outcome"]["contentRef"], content_ref.as_str());

    let response = run_stage(&server, &id, "knowledge_graph").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"]["txHash"], KG_TX);
    assert_eq!(body["attempt"]["phase"], "complete");
    assert_eq!(
        body["attempt"]["state"]["kgEntityId"],
        body["outcome"]["entityId"]
    );
    assert!(body["attempt"]["state"]["stageErrors"]
        .as_object()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_stage_without_precondition_is_bad_request() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;

    let response = run_stage(&server, &id, "chain_anchor").await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "precondition_failed");
    assert_eq!(body["attempt"]["phase"], "idle");
    assert_eq!(
        body["attempt"]["state"]["stageErrors"]["chain_anchor"]["kind"],
        "precondition_failed"
    );
    assert!(h.wallet.calls().is_empty());
}

#[tokio::test]
async fn test_completed_stage_conflicts() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;
    run_stage(&server, &id, "content").await.assert_status_ok();

    let response = run_stage(&server, &id, "content").await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "stage_already_completed");
    assert_eq!(h.store.calls(), 1);
}

#[tokio::test]
async fn test_wallet_failure_is_bad_gateway() {
    let wallet = MockWallet::on_chain(5);
    *wallet.switch_error.lock().unwrap() = Some(clearsign::clients::WalletError::new(
        Some(clearsign::clients::wallet::UNRECOGNIZED_CHAIN),
        "Unrecognized chain ID",
    ));
    let h = Harness::new().with_wallet(wallet);
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;
    run_stage(&server, &id, "content").await.assert_status_ok();

    let response = run_stage(&server, &id, "chain_anchor").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "unknown_network");
    assert_eq!(body["attempt"]["phase"], "failed");
    assert_eq!(body["attempt"]["stage"], "chain_anchor");
    assert!(body["attempt"]["state"]["contentRef"].is_string());
}

#[tokio::test]
async fn test_stage_inputs_in_body() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;

    let response = server
        .post(&format!("/attempts/{id}/stages/chain_anchor"))
        .json(&json!({ "contentRef": "blob-from-earlier" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"]["contentRef"], "blob-from-earlier");
}

#[tokio::test]
async fn test_unknown_stage_and_bad_inputs() {
    let h = Harness::new();
    let (server, _guard) = create_test_server(&h);
    let id = create_attempt(&server).await;

    let response = run_stage(&server, &id, "deploy").await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "precondition_failed");

    let response = server
        .post(&format!("/attempts/{id}/stages/content"))
        .json(&json!({ "contentReference": "typo" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "invalid_inputs");
    assert_eq!(h.store.calls(), 0);
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Must be called while holding AUTH_TEST_MUTEX.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("CLEARSIGN_API_KEY", api_key) };
    let state = AppState::new(full_config(), Harness::new().services());
    TestServer::new(create_router(state)).unwrap()
}

fn cleanup_auth_env() {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("CLEARSIGN_API_KEY") };
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .post("/graph")
        .json(&document_json())
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("correct-key");

    let response = server
        .post("/attempts")
        .json(&json!({ "document": document_json() }))
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Invalid token should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("correct-key");

    let response = server.get("/attempts/anything").await;

    cleanup_auth_env();

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_health_is_exempt() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("correct-key");

    let response = server.get("/health").await;

    cleanup_auth_env();

    response.assert_status_ok();
}
