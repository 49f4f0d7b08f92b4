//! Token error types

use crate::grants::Grant;

/// Errors raised while issuing or validating access tokens
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TokenError {
    /// The token request is malformed (empty subject/room, bad TTL, no grants)
    #[error("Invalid grant request: {0}")]
    InvalidGrant(String),

    /// Signing failed or the signing key is unusable
    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token has expired")]
    Expired,

    #[error("Token is not yet valid")]
    NotYetValid,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token format: {0}")]
    InvalidFormat(String),

    #[error("Token issuer mismatch")]
    IssuerMismatch,

    #[error("Room mismatch: expected {expected}, got {actual}")]
    RoomMismatch { expected: String, actual: String },

    #[error("Token is missing required grant: {0}")]
    MissingGrant(Grant),
}

/// Result type for token operations
pub type Result<T> = std::result::Result<T, TokenError>;
