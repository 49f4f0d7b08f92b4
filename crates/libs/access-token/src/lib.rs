//! Room access tokens for Substream publish/subscribe sessions
//!
//! Issues and validates short-lived HS256 JWTs that authorize a principal
//! (`sub`) to perform a set of actions on one room. The claim layout follows
//! the LiveKit convention (`video` grant object) so tokens minted here are
//! accepted by LiveKit-compatible ingest servers.
//!
//! # Usage
//!
//! ```
//! use substream_access_token::{Grant, GrantSet, TokenIssuer, TokenValidator};
//!
//! let issuer = TokenIssuer::new("demo-secret");
//! let grants = GrantSet::from_iter([Grant::RoomJoin, Grant::CanPublish]);
//! let token = issuer.issue("streamer-1", "room-42", &grants, 3600).unwrap();
//!
//! let validator = TokenValidator::new("demo-secret");
//! let decoded = validator.validate(token.as_str()).unwrap();
//! assert!(decoded.grants.contains(Grant::CanPublish));
//! ```

pub mod error;
pub mod grants;
pub mod issuer;
pub mod token;
pub mod validator;

pub use error::{Result, TokenError};
pub use grants::{Grant, GrantSet, VideoGrant};
pub use issuer::{issue, TokenIssuer, TokenOptions};
pub use token::{AccessToken, TokenClaims, TokenRequest, TokenResponse};
pub use validator::TokenValidator;
