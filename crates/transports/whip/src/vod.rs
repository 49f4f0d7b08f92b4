//! Chunked VOD upload
//!
//! Recording happens elsewhere; this uploads the encoded chunks to a VOD
//! session and finalizes it.

use reqwest::header;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::BearerToken;
use crate::config::WhipConfig;
use crate::error::{Result, WhipError};
use crate::http::{api_endpoint, bearer_header, build_client, parse_api_base, reject, resolve};

/// Server response to `POST /vod/sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodSessionInfo {
    pub session_id: String,
    /// Chunk upload target, absolute or relative to the API base
    pub upload_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FinalizeResponse {
    ok: bool,
    chunks: usize,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    metadata: &'a serde_json::Value,
}

/// Uploads one VOD recording at a time
#[derive(Debug)]
pub struct VodUploader {
    client: reqwest::Client,
    base_url: Url,
    token: Option<BearerToken>,
    session: Option<(VodSessionInfo, Url)>,
    uploaded: usize,
}

impl VodUploader {
    pub fn new(base_url: &str, config: &WhipConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: parse_api_base(base_url)?,
            token: None,
            session: None,
            uploaded: 0,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<BearerToken>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> Option<&VodSessionInfo> {
        self.session.as_ref().map(|(info, _)| info)
    }

    /// Chunks accepted in the current session
    pub fn uploaded_chunks(&self) -> usize {
        self.uploaded
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, bearer_header(token.as_str())),
            None => request,
        }
    }

    /// Open a new upload session
    pub async fn create_session(&mut self, metadata: serde_json::Value) -> Result<VodSessionInfo> {
        if let Some((info, _)) = &self.session {
            return Err(WhipError::InvalidState {
                operation: "create VOD session",
                state: format!("session {} open", info.session_id),
            });
        }

        let url = api_endpoint(&self.base_url, "vod/sessions")?;
        let request = self
            .client
            .post(url)
            .json(&CreateSessionRequest { metadata: &metadata });
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let info: VodSessionInfo = response.json().await?;
        let upload_url = resolve(&self.base_url, &info.upload_url)?;
        tracing::info!(session_id = %info.session_id, upload_url = %upload_url, "VOD session created");

        self.session = Some((info.clone(), upload_url));
        self.uploaded = 0;
        Ok(info)
    }

    /// Upload one chunk as multipart field `file`
    pub async fn upload_chunk(&mut self, chunk: Vec<u8>, filename: &str) -> Result<()> {
        let Some((info, upload_url)) = &self.session else {
            return Err(WhipError::InvalidState {
                operation: "upload chunk",
                state: "no VOD session".to_string(),
            });
        };
        if chunk.is_empty() {
            return Err(WhipError::InvalidInput("VOD chunk is empty".to_string()));
        }

        let size = chunk.len();
        let part = Part::bytes(chunk).file_name(filename.to_owned());
        let form = Form::new().part("file", part);

        let request = self.client.post(upload_url.clone()).multipart(form);
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        tracing::debug!(session_id = %info.session_id, size, filename, "VOD chunk uploaded");
        self.uploaded += 1;
        Ok(())
    }

    /// Close the session, returning the server's chunk count
    pub async fn finalize(&mut self) -> Result<usize> {
        let Some((info, _)) = &self.session else {
            return Err(WhipError::InvalidState {
                operation: "finalize",
                state: "no VOD session".to_string(),
            });
        };

        let url = api_endpoint(
            &self.base_url,
            &format!("vod/sessions/{}/finalize", info.session_id),
        )?;
        let request = self.client.post(url).json(&serde_json::json!({}));
        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let body: FinalizeResponse = response.json().await?;
        if !body.ok {
            return Err(WhipError::Protocol(format!(
                "finalize of VOD session {} not acknowledged",
                info.session_id
            )));
        }

        tracing::info!(session_id = %info.session_id, chunks = body.chunks, "VOD session finalized");
        self.session = None;
        Ok(body.chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_without_session_is_invalid_state() {
        let mut uploader = VodUploader::new("http://127.0.0.1:9", &WhipConfig::default()).unwrap();

        let err = uploader.upload_chunk(vec![1, 2, 3], "chunk-0").await.unwrap_err();
        assert!(matches!(err, WhipError::InvalidState { .. }));

        let err = uploader.finalize().await.unwrap_err();
        assert!(matches!(err, WhipError::InvalidState { .. }));
    }

    #[test]
    fn test_base_path_is_kept() {
        let uploader = VodUploader::new("https://api.example/v1", &WhipConfig::default()).unwrap();
        assert_eq!(uploader.base_url().as_str(), "https://api.example/v1/");
        assert_eq!(
            api_endpoint(uploader.base_url(), "vod/sessions").unwrap().as_str(),
            "https://api.example/v1/vod/sessions"
        );
    }

    #[test]
    fn test_session_info_wire_format() {
        let info: VodSessionInfo =
            serde_json::from_str(r#"{"sessionId":"abc","uploadUrl":"/vod/upload/abc"}"#).unwrap();
        assert_eq!(info.session_id, "abc");
        assert_eq!(info.upload_url, "/vod/upload/abc");
    }
}
