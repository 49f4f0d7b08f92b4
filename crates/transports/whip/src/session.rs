//! Publish session state
//!
//! A [`PublishSession`] is the caller's handle to one live stream. It is
//! mutated only by [`WhipClient`](crate::WhipClient) and broadcasts every
//! state change on a `watch` channel. Each session owns its capture layer.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use crate::auth::BearerToken;
use crate::capture::{MediaCapture, NoopCapture, QualityProfile};
use crate::error::{Result, WhipError};
use crate::http::parse_endpoint;

/// Lifecycle of a publish session
///
/// ```text
/// Idle -> Connecting -> Connected -> Stopping -> Stopped
///              |             |
///              +-> Error <---+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Stopping,
    Stopped,
    Error,
}

impl SessionState {
    /// Whether the session holds a server-side resource
    pub fn holds_resource(&self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Stopping)
    }

    /// No further transitions except a fresh `start` from `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WHIP publish attempt and its server-side resource
pub struct PublishSession {
    id: String,
    sdp_offer: String,
    ingest_url: Url,
    token: BearerToken,
    resource_url: Option<String>,
    resource_endpoint: Option<Url>,
    etag: Option<String>,
    sdp_answer: Option<String>,
    quality: Option<QualityProfile>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    capture: Arc<dyn MediaCapture>,
    capture_held: bool,
    state_tx: watch::Sender<SessionState>,
}

impl PublishSession {
    /// Create an idle session, validating the offer and ingest URL
    pub fn new(
        sdp_offer: impl Into<String>,
        ingest_url: &str,
        token: impl Into<BearerToken>,
    ) -> Result<Self> {
        let sdp_offer = sdp_offer.into();
        if sdp_offer.trim().is_empty() {
            return Err(WhipError::InvalidInput("SDP offer is empty".to_string()));
        }
        let ingest_url = parse_endpoint(ingest_url)?;

        let token = token.into();
        if token.as_str().is_empty() {
            return Err(WhipError::InvalidInput("bearer token is empty".to_string()));
        }

        let (state_tx, _) = watch::channel(SessionState::Idle);
        let simple = Uuid::new_v4().simple().to_string();

        Ok(Self {
            id: format!("pub_{}", &simple[..12]),
            sdp_offer,
            ingest_url,
            token,
            resource_url: None,
            resource_endpoint: None,
            etag: None,
            sdp_answer: None,
            quality: None,
            last_error: None,
            created_at: Utc::now(),
            capture: Arc::new(NoopCapture),
            capture_held: false,
            state_tx,
        })
    }

    /// Attach the capture layer that publishes this session's tracks
    pub fn with_capture(mut self, capture: Arc<dyn MediaCapture>) -> Self {
        self.capture = capture;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Observe state changes; the receiver sees the current state first
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn sdp_offer(&self) -> &str {
        &self.sdp_offer
    }

    pub fn ingest_url(&self) -> &Url {
        &self.ingest_url
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// `Location` value exactly as returned by the ingest server
    pub fn resource_url(&self) -> Option<&str> {
        self.resource_url.as_deref()
    }

    /// `resource_url` resolved against the ingest URL; the DELETE target
    pub fn resource_endpoint(&self) -> Option<&Url> {
        self.resource_endpoint.as_ref()
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn sdp_answer(&self) -> Option<&str> {
        self.sdp_answer.as_deref()
    }

    /// Last quality profile accepted by the capture layer
    pub fn quality(&self) -> Option<QualityProfile> {
        self.quality
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn capture(&self) -> &dyn MediaCapture {
        self.capture.as_ref()
    }

    /// Swap the bearer credential used for subsequent requests
    pub fn set_token(&mut self, token: impl Into<BearerToken>) {
        self.token = token.into();
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(session_id = %self.id, from = %previous, to = %state, "Session state changed");
        }
    }

    pub(crate) fn begin_connecting(&mut self) {
        self.resource_url = None;
        self.resource_endpoint = None;
        self.etag = None;
        self.sdp_answer = None;
        self.last_error = None;
        self.capture_held = true;
        self.set_state(SessionState::Connecting);
    }

    pub(crate) fn mark_connected(
        &mut self,
        resource_url: String,
        resource_endpoint: Url,
        etag: Option<String>,
        sdp_answer: String,
    ) {
        self.resource_url = Some(resource_url);
        self.resource_endpoint = Some(resource_endpoint);
        self.etag = etag;
        self.sdp_answer = Some(sdp_answer);
        self.set_state(SessionState::Connected);
    }

    pub(crate) fn mark_stopping(&self) {
        self.set_state(SessionState::Stopping);
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.clear_resource();
        self.set_state(SessionState::Stopped);
    }

    pub(crate) fn mark_error(&mut self, reason: impl Into<String>) {
        self.clear_resource();
        self.last_error = Some(reason.into());
        self.set_state(SessionState::Error);
    }

    pub(crate) fn set_quality(&mut self, profile: QualityProfile) {
        self.quality = Some(profile);
    }

    /// Release capture once, and only if a start acquired it
    pub(crate) fn release_capture(&mut self) {
        if std::mem::take(&mut self.capture_held) {
            tracing::debug!(session_id = %self.id, capture = self.capture.name(), "Releasing capture");
            self.capture.release();
        }
    }

    fn clear_resource(&mut self) {
        self.resource_url = None;
        self.resource_endpoint = None;
        self.etag = None;
    }
}

impl fmt::Debug for PublishSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("ingest_url", &self.ingest_url.as_str())
            .field("resource_url", &self.resource_url)
            .field("quality", &self.quality)
            .field("capture", &self.capture.name())
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}
