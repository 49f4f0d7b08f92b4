//! Token issuance
//!
//! Issuance is pure: the output depends only on the options, the secret and
//! the clock reading passed to [`TokenIssuer::issue_at`]. HS256 signatures are
//! deterministic, so a fixed clock yields byte-identical tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::error::{Result, TokenError};
use crate::grants::{GrantSet, VideoGrant};
use crate::token::{AccessToken, TokenClaims, TokenRequest};

/// Everything that goes into one token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenOptions {
    pub subject: String,
    pub room_name: String,
    pub grants: GrantSet,
    pub ttl_seconds: i64,
    pub metadata: Option<String>,
    pub name: Option<String>,
    pub scopes: Vec<String>,
}

impl TokenOptions {
    pub fn new(
        subject: impl Into<String>,
        room_name: impl Into<String>,
        grants: GrantSet,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            subject: subject.into(),
            room_name: room_name.into(),
            grants,
            ttl_seconds,
            metadata: None,
            name: None,
            scopes: Vec::new(),
        }
    }

    /// Attach opaque principal metadata
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set service scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(TokenError::InvalidGrant("subject must not be empty".to_string()));
        }
        if self.room_name.trim().is_empty() {
            return Err(TokenError::InvalidGrant("room name must not be empty".to_string()));
        }
        if self.ttl_seconds <= 0 {
            return Err(TokenError::InvalidGrant(format!(
                "ttl must be positive, got {}",
                self.ttl_seconds
            )));
        }
        if self.grants.is_empty() {
            return Err(TokenError::InvalidGrant("at least one grant is required".to_string()));
        }
        Ok(())
    }
}

impl From<TokenRequest> for TokenOptions {
    fn from(req: TokenRequest) -> Self {
        Self {
            subject: req.subject,
            room_name: req.room_name,
            grants: req.grants.into_iter().collect(),
            ttl_seconds: req.ttl_seconds,
            metadata: req.metadata,
            name: None,
            scopes: Vec::new(),
        }
    }
}

/// Signs access tokens with a shared HMAC secret
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    issuer: Option<String>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
        }
    }

    /// Stamp tokens with an `iss` claim (the API key)
    pub fn with_issuer(mut self, api_key: impl Into<String>) -> Self {
        self.issuer = Some(api_key.into());
        self
    }

    /// Issue a token valid for `ttl_seconds` from now
    pub fn issue(
        &self,
        subject: &str,
        room_name: &str,
        grants: &GrantSet,
        ttl_seconds: i64,
    ) -> Result<AccessToken> {
        self.issue_with(TokenOptions::new(
            subject,
            room_name,
            grants.clone(),
            ttl_seconds,
        ))
    }

    /// Issue a token from full options, valid from now
    pub fn issue_with(&self, options: TokenOptions) -> Result<AccessToken> {
        self.issue_at(options, Utc::now())
    }

    /// Issue a token as if the clock read `now`
    ///
    /// Timestamps are truncated to whole seconds, so
    /// `expires_at - issued_at == ttl_seconds` exactly.
    pub fn issue_at(&self, options: TokenOptions, now: DateTime<Utc>) -> Result<AccessToken> {
        options.validate()?;

        if self.secret.is_empty() {
            return Err(TokenError::Signing("secret key must not be empty".to_string()));
        }

        let iat = now.timestamp();
        let exp = iat
            .checked_add(options.ttl_seconds)
            .filter(|exp| DateTime::<Utc>::from_timestamp(*exp, 0).is_some())
            .ok_or_else(|| {
                TokenError::InvalidGrant(format!("ttl out of range: {}", options.ttl_seconds))
            })?;

        let claims = TokenClaims {
            sub: options.subject,
            iss: self.issuer.clone(),
            iat,
            nbf: iat,
            exp,
            name: options.name,
            metadata: options.metadata,
            scopes: options.scopes,
            video: VideoGrant::new(options.room_name, &options.grants),
        };

        let key = EncodingKey::from_secret(&self.secret);
        let jwt = encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(
            subject = %claims.sub,
            room = %claims.video.room,
            exp = claims.exp,
            "Issued access token"
        );

        AccessToken::from_claims(claims, jwt)
    }
}

/// Issue a token in one call
///
/// Convenience wrapper for callers that hold the secret directly.
pub fn issue(
    subject: &str,
    room_name: &str,
    grants: &GrantSet,
    ttl_seconds: i64,
    secret_key: &[u8],
) -> Result<AccessToken> {
    TokenIssuer::new(secret_key).issue(subject, room_name, grants, ttl_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::Grant;

    const TEST_SECRET: &str = "test-secret-key-for-unit-tests";

    fn fixed_now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 123_000_000).unwrap()
    }

    #[test]
    fn test_issue_sets_expiry_from_ttl() {
        let issuer = TokenIssuer::new(TEST_SECRET);
        let options = TokenOptions::new("streamer-1", "room-42", GrantSet::publisher(), 3600);

        let token = issuer.issue_at(options, fixed_now()).unwrap();

        assert_eq!(token.issued_at.timestamp(), 1_700_000_000);
        assert_eq!(token.ttl_seconds(), 3600);
        assert_eq!(token.as_str().split('.').count(), 3);
    }

    #[test]
    fn test_issue_is_deterministic_for_fixed_clock() {
        let issuer = TokenIssuer::new(TEST_SECRET).with_issuer("APIdemo");
        let options = TokenOptions::new("streamer-1", "room-42", GrantSet::publisher(), 60)
            .with_metadata(r#"{"team":"blue"}"#);

        let a = issuer.issue_at(options.clone(), fixed_now()).unwrap();
        let b = issuer.issue_at(options, fixed_now()).unwrap();

        assert_eq!(a.as_str(), b.as_str());
        assert_eq!(a.issuer.as_deref(), Some("APIdemo"));
    }

    #[test]
    fn test_issue_rejects_malformed_requests() {
        let issuer = TokenIssuer::new(TEST_SECRET);
        let grants = GrantSet::publisher();

        for (subject, room, ttl) in [("", "room", 60), ("sub", " ", 60), ("sub", "room", 0), ("sub", "room", -5)] {
            let result = issuer.issue(subject, room, &grants, ttl);
            assert!(
                matches!(result, Err(TokenError::InvalidGrant(_))),
                "expected InvalidGrant for ({:?}, {:?}, {})",
                subject,
                room,
                ttl
            );
        }

        let result = issuer.issue("sub", "room", &GrantSet::new(), 60);
        assert!(matches!(result, Err(TokenError::InvalidGrant(_))));
    }

    #[test]
    fn test_issue_rejects_overflowing_ttl() {
        let issuer = TokenIssuer::new(TEST_SECRET);
        let result = issuer.issue("sub", "room", &GrantSet::viewer(), i64::MAX);
        assert!(matches!(result, Err(TokenError::InvalidGrant(_))));
    }

    #[test]
    fn test_empty_secret_is_a_signing_error() {
        let result = issue("sub", "room", &GrantSet::viewer(), 60, b"");
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn test_options_from_request() {
        let req = TokenRequest {
            subject: "s".to_string(),
            room_name: "r".to_string(),
            grants: vec![Grant::CanPublish, Grant::CanPublish, Grant::RoomJoin],
            ttl_seconds: 30,
            metadata: Some("{}".to_string()),
        };
        let options = TokenOptions::from(req);
        assert_eq!(options.grants.len(), 2);
        assert_eq!(options.metadata.as_deref(), Some("{}"));
    }
}
