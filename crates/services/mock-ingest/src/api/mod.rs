//! HTTP API for the mock ingest server
//!
//! - `POST /whip/publish` - Accept an SDP offer, echo it as the answer
//! - `DELETE /whip/publish/:id` - Tear down a WHIP resource
//! - `GET /token` - Viewer token for a room
//! - `POST /token` - Token for an explicit request
//! - `GET /pc/token` - Short-lived publisher-client token
//! - `POST /vod/sessions` - Open a VOD upload session
//! - `POST /vod/upload/:id` - Upload one chunk (multipart field `file`)
//! - `POST /vod/sessions/:id/finalize` - Close a VOD session
//! - `GET /health`, `GET /metrics`

pub mod token;
pub mod vod;
pub mod whip;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use substream_access_token::{TokenIssuer, TokenValidator};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::registry::ResourceRegistry;
use crate::vod::VodStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,
    /// Live WHIP resources
    pub registry: Arc<ResourceRegistry>,
    /// VOD upload sessions
    pub vod: Arc<VodStore>,
    pub issuer: Arc<TokenIssuer>,
    pub validator: Arc<TokenValidator>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState from configuration
    pub fn new(config: Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let registry = Arc::new(ResourceRegistry::new(&config.limits, metrics.clone()));

        let mut issuer = TokenIssuer::new(config.auth.secret.as_bytes());
        if let Some(api_key) = &config.auth.api_key {
            issuer = issuer.with_issuer(api_key.clone());
        }
        let validator = TokenValidator::new(config.auth.secret.as_bytes());

        Self {
            config: Arc::new(config),
            registry,
            vod: Arc::new(VodStore::new()),
            issuer: Arc::new(issuer),
            validator: Arc::new(validator),
            metrics,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

/// Build the HTTP API router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - allow any origin for demo
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let body_limit = state.config.limits.max_chunk_bytes;

    Router::new()
        // WHIP
        .route("/whip/publish", post(whip::publish))
        .route("/whip/publish/:id", delete(whip::delete_resource))
        // Tokens
        .route("/token", get(token::viewer_token).post(token::issue_token))
        .route("/pc/token", get(token::pc_token))
        // VOD
        .route("/vod/sessions", post(vod::create_session))
        .route("/vod/upload/:id", post(vod::upload_chunk))
        .route("/vod/sessions/:id/finalize", post(vod::finalize_session))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Metrics endpoint
async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
