//! Token issuing endpoints

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use substream_access_token::{GrantSet, TokenError, TokenOptions, TokenRequest};
use uuid::Uuid;

use super::{error_response, AppState};

/// Scopes carried by publisher-client tokens
pub const PC_TOKEN_SCOPES: [&str; 3] = ["live:publish", "vod:upload", "telemetry:write"];

/// Subject of publisher-client tokens
pub const PC_TOKEN_SUBJECT: &str = "demo-sdk";

#[derive(Debug, Deserialize)]
pub struct ViewerTokenQuery {
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub identity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewerTokenResponse {
    pub token: String,
    /// Media server the token is valid for
    pub url: String,
}

fn token_error(e: TokenError) -> Response {
    match e {
        TokenError::InvalidGrant(_) => {
            error_response(StatusCode::BAD_REQUEST, "invalid_grant", e.to_string())
        }
        _ => {
            tracing::error!(error = %e, "Token signing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "signing_error", e.to_string())
        }
    }
}

/// Issue a subscribe-only token
///
/// GET /token?room=..&identity=..
pub async fn viewer_token(
    State(state): State<AppState>,
    Query(query): Query<ViewerTokenQuery>,
) -> Response {
    let auth = &state.config.auth;
    let room = query
        .room
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| auth.default_room.clone());
    let identity = query
        .identity
        .filter(|i| !i.trim().is_empty())
        .unwrap_or_else(|| format!("viewer-{}", &Uuid::new_v4().simple().to_string()[..8]));

    let options = TokenOptions::new(
        identity.clone(),
        room.clone(),
        GrantSet::viewer(),
        auth.viewer_token_ttl_seconds,
    );

    match state.issuer.issue_with(options) {
        Ok(token) => {
            state.metrics.token_issued();
            tracing::info!(identity = %identity, room = %room, "Issued viewer token");
            Json(ViewerTokenResponse {
                token: token.as_str().to_string(),
                url: auth.livekit_url.clone(),
            })
            .into_response()
        }
        Err(e) => token_error(e),
    }
}

/// Issue a token for an explicit request
///
/// POST /token
pub async fn issue_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text());
        }
    };

    let subject = request.subject.clone();
    match state.issuer.issue_with(TokenOptions::from(request)) {
        Ok(token) => {
            state.metrics.token_issued();
            tracing::info!(
                subject = %subject,
                room = %token.room_name,
                ttl_secs = token.ttl_seconds(),
                "Issued access token"
            );
            Json(token.to_response()).into_response()
        }
        Err(e) => token_error(e),
    }
}

/// Issue a short-lived publisher-client token
///
/// GET /pc/token
pub async fn pc_token(State(state): State<AppState>) -> Response {
    let auth = &state.config.auth;
    let options = TokenOptions::new(
        PC_TOKEN_SUBJECT,
        auth.default_room.clone(),
        GrantSet::publisher(),
        auth.pc_token_ttl_seconds,
    )
    .with_scopes(PC_TOKEN_SCOPES);

    match state.issuer.issue_with(options) {
        Ok(token) => {
            state.metrics.token_issued();
            Json(token.to_response()).into_response()
        }
        Err(e) => token_error(e),
    }
}
