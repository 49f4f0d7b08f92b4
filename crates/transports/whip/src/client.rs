//! WHIP publish session manager

use std::sync::Arc;

use tokio::sync::oneshot;
use url::Url;

use crate::auth::BearerToken;
use crate::capture::QualityProfile;
use crate::config::WhipConfig;
use crate::error::{Result, WhipError};
use crate::http::resolve;
use crate::session::{PublishSession, SessionState};
use crate::transport::{HttpTransport, LoopbackTransport, WhipResponse, WhipTransport};

/// Drives WHIP publish and teardown for any number of sessions
///
/// The client holds no per-session state; each [`PublishSession`] is owned
/// by the caller together with its capture layer and borrowed mutably for
/// the duration of an operation, so a session never has two operations in
/// flight.
#[derive(Clone)]
pub struct WhipClient {
    transport: Arc<dyn WhipTransport>,
}

impl WhipClient {
    pub fn new(config: WhipConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Client answering every offer in-process
    pub fn loopback() -> Self {
        Self::with_transport(Arc::new(LoopbackTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn WhipTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Create a session and run the WHIP handshake
    pub async fn publish(
        &self,
        sdp_offer: impl Into<String>,
        ingest_url: &str,
        token: impl Into<BearerToken>,
    ) -> Result<PublishSession> {
        let mut session = PublishSession::new(sdp_offer, ingest_url, token)?;
        self.start(&mut session).await?;
        Ok(session)
    }

    /// POST the session's offer and record the answer and resource
    ///
    /// Allowed from `Idle`, from `Error` (a fresh attempt) and from a
    /// `Connecting` session whose previous `start` was dropped.
    ///
    /// The request runs on a spawned task that holds on to the response
    /// until this future acknowledges it. If the future is dropped first,
    /// the task deletes any resource the server created.
    pub async fn start(&self, session: &mut PublishSession) -> Result<()> {
        let state = session.state();
        if !matches!(
            state,
            SessionState::Idle | SessionState::Connecting | SessionState::Error
        ) {
            return Err(WhipError::InvalidState {
                operation: "start",
                state: state.to_string(),
            });
        }
        if session.token().is_expired() {
            return Err(WhipError::TokenExpired);
        }

        session.begin_connecting();
        tracing::info!(
            session_id = %session.id(),
            ingest_url = %session.ingest_url(),
            transport = self.transport.name(),
            "Starting WHIP publish"
        );

        let (tx, rx) = oneshot::channel();
        let (ack_tx, ack_rx) = oneshot::channel::<()>();
        let transport = Arc::clone(&self.transport);
        let endpoint = session.ingest_url().clone();
        let bearer = session.token().as_str().to_owned();
        let offer = session.sdp_offer().to_owned();
        let session_id = session.id().to_owned();

        tokio::spawn(async move {
            let result = transport.post_offer(&endpoint, &bearer, &offer).await;
            let held = result.as_ref().ok().cloned();
            let delivered = tx.send(result).is_ok() && ack_rx.await.is_ok();
            if let (false, Some(response)) = (delivered, held) {
                release_abandoned(transport.as_ref(), &endpoint, &bearer, &session_id, response)
                    .await;
            }
        });

        let received = rx.await;
        let _ = ack_tx.send(());

        let response = match received {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %session.id(), error = %e, "WHIP POST failed");
                session.mark_error(e.to_string());
                return Err(e);
            }
            Err(_) => {
                let e = WhipError::Transport("WHIP request task aborted".to_string());
                session.mark_error(e.to_string());
                return Err(e);
            }
        };

        self.complete_start(session, response).await
    }

    async fn complete_start(
        &self,
        session: &mut PublishSession,
        response: WhipResponse,
    ) -> Result<()> {
        if !response.is_success() {
            tracing::warn!(
                session_id = %session.id(),
                status = response.status,
                "WHIP endpoint rejected offer"
            );
            let e = WhipError::Rejected {
                status: response.status,
                body: response.body,
            };
            session.mark_error(e.to_string());
            return Err(e);
        }

        let Some(location) = response.location else {
            let e = WhipError::Protocol(format!(
                "HTTP {} response carried no Location header",
                response.status
            ));
            tracing::error!(session_id = %session.id(), "{}", e);
            session.mark_error(e.to_string());
            return Err(e);
        };

        let resource = match resolve(session.ingest_url(), &location) {
            Ok(resource) => resource,
            Err(e) => {
                tracing::error!(session_id = %session.id(), location = %location, "{}", e);
                session.mark_error(e.to_string());
                return Err(e);
            }
        };

        if let Some(body_error) = response.body_error {
            let e = WhipError::from(body_error);
            tracing::warn!(session_id = %session.id(), resource = %resource, error = %e, "WHIP answer lost, deleting resource");
            self.delete_quietly(session, &resource).await;
            session.mark_error(e.to_string());
            return Err(e);
        }

        if response.body.trim().is_empty() {
            let e = WhipError::Protocol("success response carried no SDP answer".to_string());
            tracing::error!(session_id = %session.id(), resource = %resource, "{}", e);
            self.delete_quietly(session, &resource).await;
            session.mark_error(e.to_string());
            return Err(e);
        }

        tracing::info!(
            session_id = %session.id(),
            status = response.status,
            resource = %location,
            answer_bytes = response.body.len(),
            "WHIP session connected"
        );
        session.mark_connected(location, resource, response.etag, response.body);
        Ok(())
    }

    /// Tear down the session's resource and release its capture
    ///
    /// Idempotent. A session that never obtained a resource stops without
    /// any request. A failed DELETE is returned, but the session ends
    /// `Stopped` either way.
    pub async fn stop(&self, session: &mut PublishSession) -> Result<()> {
        if session.state() == SessionState::Stopped {
            return Ok(());
        }

        let Some(resource) = session.resource_endpoint().cloned() else {
            tracing::debug!(session_id = %session.id(), state = %session.state(), "Stopping session without resource");
            session.mark_stopped();
            session.release_capture();
            return Ok(());
        };

        session.mark_stopping();
        let result = self
            .transport
            .delete_resource(&resource, session.token().as_str())
            .await;

        session.mark_stopped();
        session.release_capture();

        match result {
            Ok(response) if response.is_success() || response.status == 404 => {
                tracing::info!(session_id = %session.id(), status = response.status, "WHIP session stopped");
                Ok(())
            }
            Ok(response) => {
                tracing::warn!(session_id = %session.id(), status = response.status, resource = %resource, "WHIP DELETE rejected");
                Err(WhipError::Rejected {
                    status: response.status,
                    body: response.body,
                })
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, resource = %resource, "WHIP DELETE failed");
                Err(e)
            }
        }
    }

    /// Move a connected session to `Error` after the peer connection failed
    ///
    /// The resource is deleted on a best-effort basis first.
    pub async fn fail(&self, session: &mut PublishSession, reason: &str) -> Result<()> {
        if session.state() != SessionState::Connected {
            return Err(WhipError::InvalidState {
                operation: "fail",
                state: session.state().to_string(),
            });
        }

        tracing::warn!(session_id = %session.id(), reason, "Peer connection failed");
        if let Some(resource) = session.resource_endpoint().cloned() {
            self.delete_quietly(session, &resource).await;
        }
        session.mark_error(reason);
        Ok(())
    }

    /// Forward an advisory quality change to the session's capture layer
    pub fn adjust_quality(
        &self,
        session: &mut PublishSession,
        profile: QualityProfile,
    ) -> Result<()> {
        if session.state() != SessionState::Connected {
            return Err(WhipError::InvalidState {
                operation: "adjust quality",
                state: session.state().to_string(),
            });
        }
        profile.validate()?;
        session.capture().apply_quality(&profile)?;

        tracing::info!(
            session_id = %session.id(),
            capture = session.capture().name(),
            max_bitrate_bps = profile.max_bitrate_bps(),
            width = profile.width,
            height = profile.height,
            fps = profile.fps,
            "Quality adjusted"
        );
        session.set_quality(profile);
        Ok(())
    }

    async fn delete_quietly(&self, session: &PublishSession, resource: &Url) {
        match self
            .transport
            .delete_resource(resource, session.token().as_str())
            .await
        {
            Ok(response) => {
                tracing::debug!(session_id = %session.id(), status = response.status, "Best-effort DELETE sent")
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Best-effort DELETE failed")
            }
        }
    }
}

/// DELETE a resource created for a caller that stopped waiting
async fn release_abandoned(
    transport: &dyn WhipTransport,
    endpoint: &Url,
    bearer: &str,
    session_id: &str,
    response: WhipResponse,
) {
    if !response.is_success() {
        return;
    }
    let Some(location) = response.location else {
        return;
    };
    let resource = match resolve(endpoint, &location) {
        Ok(resource) => resource,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "Cannot release abandoned resource");
            return;
        }
    };

    match transport.delete_resource(&resource, bearer).await {
        Ok(response) => {
            tracing::info!(session_id, status = response.status, resource = %resource, "Released abandoned WHIP resource")
        }
        Err(e) => {
            tracing::warn!(session_id, error = %e, resource = %resource, "Failed to release abandoned WHIP resource")
        }
    }
}

impl std::fmt::Debug for WhipClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhipClient")
            .field("transport", &self.transport.name())
            .finish()
    }
}
