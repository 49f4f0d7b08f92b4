//! Access token model, wire claims and request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenError};
use crate::grants::{Grant, GrantSet, VideoGrant};

/// JWT claims as they appear in the signed payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Principal identity
    pub sub: String,

    /// API key of the issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Issued-at (Unix epoch seconds)
    pub iat: i64,

    /// Not-before (Unix epoch seconds)
    pub nbf: i64,

    /// Expiration (Unix epoch seconds)
    pub exp: i64,

    /// Display name of the principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Opaque metadata (usually JSON) attached to the principal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,

    /// Service scopes (e.g. ["live:publish", "vod:upload"])
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    /// Room grants
    pub video: VideoGrant,
}

/// An issued (or validated) access token
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub subject: String,
    pub room_name: String,
    pub grants: GrantSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: Option<String>,
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub scopes: Vec<String>,

    /// Compact serialized form (`header.payload.signature`)
    jwt: String,
}

impl AccessToken {
    pub(crate) fn from_claims(claims: TokenClaims, jwt: String) -> Result<Self> {
        let issued_at = timestamp(claims.iat, "iat")?;
        let expires_at = timestamp(claims.exp, "exp")?;

        Ok(Self {
            grants: claims.video.grants(),
            room_name: claims.video.room,
            subject: claims.sub,
            issued_at,
            expires_at,
            metadata: claims.metadata,
            name: claims.name,
            issuer: claims.iss,
            scopes: claims.scopes,
            jwt,
        })
    }

    /// The compact JWT string
    pub fn as_str(&self) -> &str {
        &self.jwt
    }

    /// Value for an `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.jwt)
    }

    /// Whether `now` falls inside `[issued_at, expires_at)`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.issued_at && now < self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Lifetime of the token in whole seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.expires_at.timestamp() - self.issued_at.timestamp()
    }

    /// Check that the token carries `grant`
    pub fn require(&self, grant: Grant) -> Result<()> {
        if self.grants.contains(grant) {
            Ok(())
        } else {
            Err(TokenError::MissingGrant(grant))
        }
    }

    /// Response body for token endpoints
    pub fn to_response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.jwt.clone(),
            expires_at: self.expires_at.timestamp_millis(),
        }
    }
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| TokenError::InvalidFormat(format!("{} out of range: {}", claim, secs)))
}

/// Token issuance request (`POST /token` body)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub subject: String,
    pub room_name: String,
    #[serde(default)]
    pub grants: Vec<Grant>,
    pub ttl_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Token issuance response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    /// Expiration as Unix epoch milliseconds
    pub expires_at: i64,
}

impl TokenResponse {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_wire_names() {
        let json = r#"{"subject":"streamer-1","roomName":"room-42","grants":["canPublish"],"ttlSeconds":3600}"#;
        let req: TokenRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.subject, "streamer-1");
        assert_eq!(req.room_name, "room-42");
        assert_eq!(req.grants, vec![Grant::CanPublish]);
        assert_eq!(req.ttl_seconds, 3600);
        assert!(req.metadata.is_none());
    }

    #[test]
    fn test_token_response_wire_names() {
        let resp = TokenResponse {
            access_token: "abc".to_string(),
            expires_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["expiresAt"], 1_700_000_000_000i64);
        assert_eq!(resp.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_claims_skip_empty_optional_fields() {
        let claims = TokenClaims {
            sub: "viewer".to_string(),
            iss: None,
            iat: 10,
            nbf: 10,
            exp: 20,
            name: None,
            metadata: None,
            scopes: Vec::new(),
            video: VideoGrant::new("room", &GrantSet::viewer()),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("iss").is_none());
        assert!(json.get("scopes").is_none());
        assert_eq!(json["video"]["room"], "room");
    }
}
