//! Token validation
//!
//! Signature and structure are checked by `jsonwebtoken`; the validity window
//! is enforced here so that a token is rejected exactly at `exp` (the window is
//! half-open, `[iat, exp)`), with no leeway.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use crate::error::{Result, TokenError};
use crate::token::{AccessToken, TokenClaims};

/// Validator for access tokens signed with a shared secret
#[derive(Clone)]
pub struct TokenValidator {
    secret: Vec<u8>,
    issuer: Option<String>,
}

impl TokenValidator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
        }
    }

    /// Only accept tokens whose `iss` matches `api_key`
    pub fn with_issuer(mut self, api_key: impl Into<String>) -> Self {
        self.issuer = Some(api_key.into());
        self
    }

    /// Validate and decode a token against the current time
    ///
    /// # Errors
    /// * `TokenError::Expired` - `now >= exp`
    /// * `TokenError::NotYetValid` - `now < nbf`
    /// * `TokenError::InvalidSignature` - Signed with a different secret
    /// * `TokenError::InvalidFormat` - Not a well-formed token
    pub fn validate(&self, token: &str) -> Result<AccessToken> {
        self.validate_at(token, Utc::now())
    }

    /// Validate and decode a token as if the clock read `now`
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccessToken> {
        if self.secret.is_empty() {
            return Err(TokenError::Signing("secret key must not be empty".to_string()));
        }

        let key = DecodingKey::from_secret(&self.secret);
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let data = decode::<TokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
            _ => TokenError::InvalidFormat(e.to_string()),
        })?;
        let claims = data.claims;

        let now = now.timestamp();
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        AccessToken::from_claims(claims, token.to_string())
    }

    /// Validate a token and check that it is scoped to `room`
    ///
    /// # Errors
    /// * `TokenError::RoomMismatch` - Token grants are for another room
    pub fn validate_for_room(&self, token: &str, room: &str) -> Result<AccessToken> {
        let access = self.validate(token)?;

        if access.room_name != room {
            return Err(TokenError::RoomMismatch {
                expected: room.to_string(),
                actual: access.room_name,
            });
        }

        Ok(access)
    }
}
