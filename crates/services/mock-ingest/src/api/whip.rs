//! WHIP endpoints
//!
//! The server does no media negotiation: the offer is echoed back as the
//! answer so clients can exercise signaling end to end.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use substream_access_token::{AccessToken, Grant};

use super::{error_response, AppState};
use crate::registry::RegistryError;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate the bearer token when auth is required
///
/// Without `require_auth` a valid token is still decoded so resources can be
/// attributed, but a missing or invalid one is accepted.
fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    grant: Option<Grant>,
) -> Result<Option<AccessToken>, Response> {
    let required = state.config.auth.require_auth;

    let Some(raw) = bearer(headers) else {
        if required {
            state.metrics.auth_failed();
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing bearer token",
            ));
        }
        return Ok(None);
    };

    let token = match state.validator.validate(raw) {
        Ok(token) => token,
        Err(e) if required => {
            state.metrics.auth_failed();
            tracing::warn!(error = %e, "Rejected WHIP request with invalid token");
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                e.to_string(),
            ));
        }
        Err(_) => return Ok(None),
    };

    if let Some(grant) = grant {
        if let Err(e) = token.require(grant) {
            if required {
                state.metrics.auth_failed();
                return Err(error_response(StatusCode::FORBIDDEN, "forbidden", e.to_string()));
            }
        }
    }
    Ok(Some(token))
}

/// Accept an SDP offer
///
/// POST /whip/publish
pub async fn publish(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        if !content_type.starts_with("application/sdp") && !content_type.starts_with("text/plain") {
            return error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                format!("Expected application/sdp, got {}", content_type),
            );
        }
    }

    if body.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "bad_request", "Empty SDP offer");
    }

    let token = match authorize(&state, &headers, Some(Grant::CanPublish)) {
        Ok(token) => token,
        Err(response) => return response,
    };
    let (subject, room) = match token {
        Some(token) => (Some(token.subject), Some(token.room_name)),
        None => (None, None),
    };

    let resource = match state.registry.create(subject, room, body.len()) {
        Ok(resource) => resource,
        Err(e @ RegistryError::LimitReached(_)) => {
            return error_response(StatusCode::SERVICE_UNAVAILABLE, "limit_reached", e.to_string());
        }
    };

    (
        StatusCode::CREATED,
        [
            (header::LOCATION, resource.location()),
            (header::CONTENT_TYPE, "application/sdp".to_string()),
        ],
        body,
    )
        .into_response()
}

/// Tear down a WHIP resource
///
/// DELETE /whip/publish/:id
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = authorize(&state, &headers, None) {
        return response;
    }

    match state.registry.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("WHIP resource not found: {}", id),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer(&headers), None);
    }
}
