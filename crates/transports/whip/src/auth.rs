//! Bearer credentials attached to WHIP requests

use chrono::{DateTime, Utc};
use substream_access_token::{AccessToken, TokenResponse};

/// A bearer token plus its expiry, when known
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// A token with no known expiry (e.g. a static ingress key)
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<&AccessToken> for BearerToken {
    fn from(token: &AccessToken) -> Self {
        Self::with_expiry(token.as_str(), token.expires_at)
    }
}

impl From<AccessToken> for BearerToken {
    fn from(token: AccessToken) -> Self {
        Self::from(&token)
    }
}

impl From<TokenResponse> for BearerToken {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response.expires_at();
        Self {
            value: response.access_token,
            expires_at,
        }
    }
}
