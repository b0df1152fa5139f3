//! # API Endpoint Handlers

use super::{
    AppState,
    types::{
        AttemptResponse, CreateAttemptRequest, DeleteResponse, ErrorBody, GraphResponse,
        HealthResponse, StageInputs, StageRunResponse,
    },
};
use crate::error::PublishError;
use crate::pipeline::{PublishAttempt, Stage};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use clearsign_core::{GraphInspector, SchemaDocument, build_graph};
use serde_json::Value;
use std::sync::Arc;

/// HTTP status of a stage failure.
pub(crate) fn status_for(err: &PublishError) -> StatusCode {
    match err {
        PublishError::PreconditionFailed(_)
        | PublishError::ConfigurationMissing(_)
        | PublishError::ConfigurationInvalid(_)
        | PublishError::WalletUnavailable(_) => StatusCode::BAD_REQUEST,
        PublishError::StageInFlight(_) | PublishError::StageAlreadyCompleted(_) => {
            StatusCode::CONFLICT
        }
        PublishError::Network(_)
        | PublishError::MalformedResponse(_)
        | PublishError::ExternalService { .. }
        | PublishError::WalletRejected(_)
        | PublishError::NetworkMismatch { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn attempt_not_found(id: &str) -> ErrorBody {
    ErrorBody::new("not_found", format!("no publish attempt '{id}'"))
}

async fn find_attempt(state: &AppState, id: &str) -> Option<Arc<PublishAttempt>> {
    state.attempts.read().await.get(id).cloned()
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// GRAPH
// =============================================================================

/// Build the graph of the posted document.
pub async fn graph_handler(Json(body): Json<Value>) -> impl IntoResponse {
    match SchemaDocument::try_from_value(body) {
        Ok(doc) => {
            let graph = build_graph(&doc);
            let summary = GraphInspector::new(&graph).summary();
            (StatusCode::OK, Json(GraphResponse::success(graph, summary)))
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(GraphResponse::error(ErrorBody::new(
                "invalid_document",
                e.to_string(),
            ))),
        ),
    }
}

// =============================================================================
// ATTEMPTS
// =============================================================================

/// Start a publish attempt. Nothing is sent anywhere yet.
pub async fn create_attempt_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateAttemptRequest>,
) -> impl IntoResponse {
    let doc = match SchemaDocument::try_from_value(request.document) {
        Ok(doc) => doc,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AttemptResponse::error(ErrorBody::new(
                    "invalid_document",
                    e.to_string(),
                ))),
            );
        }
    };

    let attempt = Arc::new(PublishAttempt::new(
        doc,
        Arc::clone(&state.config),
        state.services.clone(),
    ));
    let snapshot = attempt.snapshot();
    let expired = state.cleanup_expired().await;
    if expired > 0 {
        tracing::debug!(expired, "Expired publish attempts dropped");
    }
    state
        .attempts
        .write()
        .await
        .insert(attempt.id().to_string(), attempt);

    tracing::info!(attempt_id = %snapshot.id, "Publish attempt created");
    (StatusCode::CREATED, Json(AttemptResponse::success(snapshot)))
}

pub async fn get_attempt_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match find_attempt(&state, &id).await {
        Some(attempt) => (
            StatusCode::OK,
            Json(AttemptResponse::success(attempt.snapshot())),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(AttemptResponse::error(attempt_not_found(&id))),
        ),
    }
}

/// Run one stage of an attempt. The body is optional [`StageInputs`].
pub async fn run_stage_handler(
    State(state): State<AppState>,
    Path((id, stage)): Path<(String, String)>,
    body: Bytes,
) -> impl IntoResponse {
    let stage: Stage = match stage.parse() {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(StageRunResponse::error(ErrorBody::from(&e), None)),
            );
        }
    };

    let inputs = if body.iter().all(u8::is_ascii_whitespace) {
        StageInputs::default()
    } else {
        match serde_json::from_slice::<StageInputs>(&body) {
            Ok(inputs) => inputs,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(StageRunResponse::error(
                        ErrorBody::new("invalid_inputs", e.to_string()),
                        None,
                    )),
                );
            }
        }
    };

    let Some(attempt) = find_attempt(&state, &id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(StageRunResponse::error(attempt_not_found(&id), None)),
        );
    };

    match attempt.run_stage(inputs.into_request(stage)).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(StageRunResponse::success(outcome, attempt.snapshot())),
        ),
        Err(e) => (
            status_for(&e),
            Json(StageRunResponse::error(
                ErrorBody::from(&e),
                Some(attempt.snapshot()),
            )),
        ),
    }
}

/// Forget an attempt. Its results are not persisted anywhere.
pub async fn delete_attempt_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let removed = state.attempts.write().await.remove(&id).is_some();
    let status = if removed {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (
        status,
        Json(DeleteResponse {
            success: removed,
            removed,
        }),
    )
}
