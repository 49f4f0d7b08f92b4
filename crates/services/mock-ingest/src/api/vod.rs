//! VOD upload endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::{error_response, AppState};
use crate::vod::VodError;

#[derive(Debug, Default, Deserialize)]
pub struct CreateVodSessionRequest {
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VodSessionResponse {
    pub session_id: String,
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkAck {
    pub ok: bool,
    pub chunks: usize,
}

fn vod_error(e: VodError) -> Response {
    match e {
        VodError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        VodError::Finalized(_) => error_response(StatusCode::CONFLICT, "finalized", e.to_string()),
    }
}

/// Open an upload session
///
/// POST /vod/sessions
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateVodSessionRequest>>,
) -> Json<VodSessionResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let session = state.vod.create(request.metadata);
    state.metrics.vod_session_created();

    Json(VodSessionResponse {
        upload_url: session.upload_url(),
        session_id: session.id,
    })
}

/// Receive one recorded chunk
///
/// POST /vod/upload/:id
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if state.vod.get(&id).is_none() {
        return vod_error(VodError::NotFound(id));
    }

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, "bad_multipart", e.body_text());
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data: Bytes = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, "bad_multipart", e.body_text());
            }
        };

        return match state.vod.add_chunk(&id, filename, data.len()) {
            Ok(chunks) => {
                state.metrics.vod_chunk_received(data.len() as u64);
                Json(ChunkAck { ok: true, chunks }).into_response()
            }
            Err(e) => vod_error(e),
        };
    }

    error_response(StatusCode::BAD_REQUEST, "bad_request", "Missing multipart field 'file'")
}

/// Close an upload session
///
/// POST /vod/sessions/:id/finalize
pub async fn finalize_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.vod.finalize(&id) {
        Ok(chunks) => {
            state.metrics.vod_session_finalized();
            Json(ChunkAck { ok: true, chunks }).into_response()
        }
        Err(e) => vod_error(e),
    }
}
