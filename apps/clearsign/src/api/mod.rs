//! # clearsign HTTP API
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /graph` - Build the graph of a posted document
//! - `POST /attempts` - Start a publish attempt (`{document}`)
//! - `GET /attempts/{id}` - Phase, in-flight stage and results of an attempt
//! - `POST /attempts/{id}/stages/{stage}` - Run `content`, `chain_anchor` or
//!   `knowledge_graph`, with optional inputs in the body
//! - `DELETE /attempts/{id}` - Discard an attempt
//!
//! Attempts live in memory only. Idle ones are swept whenever a new attempt
//! is created.
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `CLEARSIGN_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CLEARSIGN_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CLEARSIGN_API_KEY`: If set, requires Bearer token authentication
//! - `CLEARSIGN_ATTEMPT_TTL_SECS`: Idle time before an attempt is dropped
//!   (default: 3600, 0 keeps attempts until deleted)

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AttemptResponse, CreateAttemptRequest, DeleteResponse, ErrorBody, GraphResponse,
    HealthResponse, StageInputs, StageRunResponse,
};

use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::pipeline::{PublishAttempt, PublishServices};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Idle time after which an attempt is dropped.
pub const DEFAULT_ATTEMPT_TTL: Duration = Duration::from_secs(60 * 60);

/// Attempt TTL from `CLEARSIGN_ATTEMPT_TTL_SECS`; `0` turns expiry off.
pub fn get_attempt_ttl_from_env() -> Option<Duration> {
    match std::env::var("CLEARSIGN_ATTEMPT_TTL_SECS")
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
    {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(DEFAULT_ATTEMPT_TTL),
    }
}

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PipelineConfig>,
    pub services: PublishServices,
    /// Open attempts by id.
    pub attempts: Arc<RwLock<BTreeMap<String, Arc<PublishAttempt>>>>,
    /// Idle time before an attempt is swept; `None` keeps it until deleted.
    pub attempt_ttl: Option<Duration>,
}

impl AppState {
    #[must_use]
    pub fn new(config: PipelineConfig, services: PublishServices) -> Self {
        Self {
            config: Arc::new(config),
            services,
            attempts: Arc::new(RwLock::new(BTreeMap::new())),
            attempt_ttl: Some(DEFAULT_ATTEMPT_TTL),
        }
    }

    #[must_use]
    pub fn with_attempt_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.attempt_ttl = ttl;
        self
    }

    /// Drop attempts idle past the TTL. A stage in flight keeps its attempt.
    pub async fn cleanup_expired(&self) -> usize {
        let Some(ttl) = self.attempt_ttl else {
            return 0;
        };
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, attempt| !attempt.is_expired(ttl));
        before - attempts.len()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

/// Dev front-ends admitted when no origin list is configured.
const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Origins from a comma-separated list; unparsable entries are skipped.
fn parse_origins<'a>(list: impl IntoIterator<Item = &'a str>) -> Vec<HeaderValue> {
    list.into_iter()
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin, error = %err, "skipping invalid CORS origin");
                None
            }
        })
        .collect()
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// CORS from `CLEARSIGN_CORS_ORIGINS`: `*`, a comma-separated list, or
/// local dev origins when unset or empty.
fn build_cors_layer() -> CorsLayer {
    let configured = std::env::var("CLEARSIGN_CORS_ORIGINS").ok();

    if configured.as_deref().map(str::trim) == Some("*") {
        tracing::warn!("CORS open to every origin");
        return CorsLayer::permissive();
    }

    let origins = configured
        .as_deref()
        .map(|list| parse_origins(list.split(',')))
        .unwrap_or_default();

    if origins.is_empty() {
        tracing::info!(origins = ?LOCAL_ORIGINS, "CORS limited to local origins");
        restricted_cors(parse_origins(LOCAL_ORIGINS))
    } else {
        tracing::info!(count = origins.len(), "CORS origins configured");
        restricted_cors(origins)
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Router with every endpoint and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit, rate
/// limiting, authentication.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = (rate_limit > 0).then(|| create_rate_limiter(rate_limit));
    let has_auth = get_api_key_from_env().is_some();

    tracing::info!(
        rate_limit,
        api_key = has_auth,
        "configuring clearsign router"
    );
    if !has_auth {
        tracing::warn!("CLEARSIGN_API_KEY unset; attempts and publish stages are open to any caller");
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/graph", post(handlers::graph_handler))
        .route("/attempts", post(handlers::create_attempt_handler))
        .route(
            "/attempts/{id}",
            get(handlers::get_attempt_handler).delete(handlers::delete_attempt_handler),
        )
        .route(
            "/attempts/{id}/stages/{stage}",
            post(handlers::run_stage_handler),
        );

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve the API on `addr` until the process stops.
pub async fn run_server(
    addr: &str,
    config: PipelineConfig,
    services: PublishServices,
) -> Result<(), AppError> {
    let ttl = get_attempt_ttl_from_env();
    tracing::info!(attempt_ttl_secs = ttl.map(|t| t.as_secs()), "attempt expiry");
    let router = create_router(AppState::new(config, services).with_attempt_ttl(ttl));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("clearsign HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}
