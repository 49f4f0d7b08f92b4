//! WHIP signaling transports
//!
//! A transport performs the raw HTTP exchange; interpreting status codes and
//! headers is left to [`WhipClient`](crate::WhipClient) so every transport is
//! held to the same contract.
//!
//! - [`HttpTransport`] talks to a real ingest endpoint over HTTP(S)
//! - [`LoopbackTransport`] answers in-process, echoing the offer (demo mode)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header;
use url::Url;

use crate::config::WhipConfig;
use crate::error::{Result, WhipError};
use crate::http::{bearer_header, build_client};

/// Failure reading a response body after the status and headers arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyReadError {
    pub timed_out: bool,
    pub message: String,
}

impl From<reqwest::Error> for BodyReadError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

impl From<BodyReadError> for WhipError {
    fn from(e: BodyReadError) -> Self {
        if e.timed_out {
            WhipError::Timeout(e.message)
        } else {
            WhipError::Transport(e.message)
        }
    }
}

/// Raw response to a WHIP request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhipResponse {
    pub status: u16,
    /// `Location` header, verbatim
    pub location: Option<String>,
    /// `ETag` header, verbatim
    pub etag: Option<String>,
    /// Response body (the SDP answer on success, diagnostics otherwise)
    pub body: String,
    /// Set when a success response with a `Location` lost its body; the
    /// server-side resource exists and must still be deleted
    pub body_error: Option<BodyReadError>,
}

impl WhipResponse {
    /// Response with the given status and body and no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Signaling channel used by the session manager
#[async_trait]
pub trait WhipTransport: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// `POST` an SDP offer to the ingest endpoint
    async fn post_offer(&self, endpoint: &Url, bearer: &str, offer: &str) -> Result<WhipResponse>;

    /// `DELETE` a session resource
    async fn delete_resource(&self, resource: &Url, bearer: &str) -> Result<WhipResponse>;
}

/// WHIP over HTTP(S) via reqwest
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &WhipConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
        })
    }
}

fn header_string(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl WhipTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn post_offer(&self, endpoint: &Url, bearer: &str, offer: &str) -> Result<WhipResponse> {
        tracing::debug!(endpoint = %endpoint, offer_bytes = offer.len(), "POST WHIP offer");

        let response = self
            .client
            .post(endpoint.clone())
            .header(header::CONTENT_TYPE, "application/sdp")
            .header(header::AUTHORIZATION, bearer_header(bearer))
            .body(offer.to_owned())
            .send()
            .await?;

        let status = response.status().as_u16();
        let location = header_string(response.headers(), header::LOCATION);
        let etag = header_string(response.headers(), header::ETAG);
        let created = response.status().is_success() && location.is_some();

        let (body, body_error) = match response.text().await {
            Ok(body) => (body, None),
            Err(e) if created => {
                tracing::warn!(endpoint = %endpoint, status, error = %e, "WHIP answer body unreadable");
                (String::new(), Some(BodyReadError::from(e)))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(WhipResponse {
            status,
            location,
            etag,
            body,
            body_error,
        })
    }

    async fn delete_resource(&self, resource: &Url, bearer: &str) -> Result<WhipResponse> {
        tracing::debug!(resource = %resource, "DELETE WHIP resource");

        let response = self
            .client
            .delete(resource.clone())
            .header(header::AUTHORIZATION, bearer_header(bearer))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(WhipResponse::new(status, body))
    }
}

/// In-process WHIP peer that echoes offers back as answers
///
/// Lets callers exercise the full session lifecycle without an ingest
/// server. Resources live under `/whip/resource/loopback-<n>`.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    next_id: AtomicU64,
    resources: Mutex<HashMap<String, String>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of resources not yet deleted
    pub fn active_resources(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.resources.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl WhipTransport for LoopbackTransport {
    fn name(&self) -> &'static str {
        "loopback"
    }

    async fn post_offer(&self, _endpoint: &Url, _bearer: &str, offer: &str) -> Result<WhipResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = format!("/whip/resource/loopback-{}", id);

        self.resources.lock().insert(path.clone(), offer.to_owned());

        Ok(WhipResponse {
            location: Some(path),
            ..WhipResponse::new(201, offer)
        })
    }

    async fn delete_resource(&self, resource: &Url, _bearer: &str) -> Result<WhipResponse> {
        let removed = self.resources.lock().remove(resource.path()).is_some();
        Ok(if removed {
            WhipResponse::new(204, "")
        } else {
            WhipResponse::new(404, "resource not found")
        })
    }
}
