//! WHIP publish sessions for Substream
//!
//! Implements the client side of the WebRTC-HTTP Ingestion Protocol: POST a
//! local SDP offer to an ingest endpoint, keep the returned resource as the
//! live handle, and DELETE it on teardown. The local WebRTC stack producing
//! the offer is external; media capture is reached through the
//! [`MediaCapture`] trait, one implementation per session.
//!
//! # Example
//!
//! ```no_run
//! use substream_access_token::{GrantSet, TokenIssuer};
//! use substream_whip::{WhipClient, WhipConfig};
//!
//! # async fn run(offer: String) -> substream_whip::Result<()> {
//! let token = TokenIssuer::new("secret")
//!     .issue("streamer-1", "room-42", &GrantSet::publisher(), 3600)
//!     .map_err(|e| substream_whip::WhipError::InvalidInput(e.to_string()))?;
//!
//! let client = WhipClient::new(WhipConfig::default())?;
//! let mut session = client
//!     .publish(offer, "https://ingest.example/whip/publish", &token)
//!     .await?;
//!
//! println!("answer: {:?}", session.sdp_answer());
//! client.stop(&mut session).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod capture;
pub mod client;
pub mod config;
pub mod error;
mod http;
pub mod session;
pub mod token_client;
pub mod transport;
pub mod vod;

pub use auth::BearerToken;
pub use capture::{MediaCapture, NoopCapture, QualityProfile, SimulatedCapture};
pub use client::WhipClient;
pub use config::WhipConfig;
pub use error::{ErrorKind, Result, WhipError};
pub use session::{PublishSession, SessionState};
pub use token_client::{TokenEndpointClient, ViewerToken};
pub use transport::{
    BodyReadError, HttpTransport, LoopbackTransport, WhipResponse, WhipTransport,
};
pub use vod::{VodSessionInfo, VodUploader};
