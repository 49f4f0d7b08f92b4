//! WHIP error types

use thiserror::Error;

/// Broad category of a [`WhipError`], used to pick a caller action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad local input; fix the input, do not retry
    InvalidInput,
    /// Operation not allowed in the session's current state
    InvalidState,
    /// Network failure, timeout, or a rejected request; retry with backoff
    Transport,
    /// The server broke the WHIP contract; fatal for this attempt
    Protocol,
    /// The media capture layer refused a quality change
    Capture,
}

/// WHIP session error types
#[derive(Debug, Error)]
pub enum WhipError {
    /// Precondition violated before any request was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Bearer credential expired before the request was sent
    #[error("Bearer token has expired")]
    TokenExpired,

    #[error("Invalid session state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Success status but the response violates the WHIP contract
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Capture error: {0}")]
    Capture(String),
}

impl WhipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WhipError::InvalidInput(_) | WhipError::TokenExpired => ErrorKind::InvalidInput,
            WhipError::InvalidState { .. } => ErrorKind::InvalidState,
            WhipError::Transport(_) | WhipError::Timeout(_) | WhipError::Rejected { .. } => {
                ErrorKind::Transport
            }
            WhipError::Protocol(_) => ErrorKind::Protocol,
            WhipError::Capture(_) => ErrorKind::Capture,
        }
    }

    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            WhipError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a fresh attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            WhipError::Transport(_) | WhipError::Timeout(_) => true,
            WhipError::Rejected { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Retry on server errors (5xx), request timeout and rate limiting
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

impl From<reqwest::Error> for WhipError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WhipError::Timeout(e.to_string())
        } else {
            WhipError::Transport(e.to_string())
        }
    }
}

/// Result type for WHIP operations
pub type Result<T> = std::result::Result<T, WhipError>;
