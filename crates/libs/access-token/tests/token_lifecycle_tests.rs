//! Integration tests for token issuance and validation

use chrono::{DateTime, Duration, Utc};
use substream_access_token::{
    issue, Grant, GrantSet, TokenError, TokenIssuer, TokenOptions, TokenRequest, TokenValidator,
};

const SECRET: &[u8] = b"integration-secret";

#[test]
fn test_publisher_token_decodes_with_publish_grant() {
    let grants = GrantSet::from_iter([Grant::RoomJoin, Grant::CanPublish]);
    let token = issue("streamer-1", "room-42", &grants, 3600, SECRET).unwrap();

    let decoded = TokenValidator::new(SECRET).validate(token.as_str()).unwrap();

    assert_eq!(decoded.subject, "streamer-1");
    assert_eq!(decoded.room_name, "room-42");
    assert!(decoded.grants.contains(Grant::CanPublish));
    assert_eq!(decoded.expires_at - decoded.issued_at, Duration::seconds(3600));
}

#[test]
fn test_validity_window_matches_ttl_for_many_ttls() {
    let issuer = TokenIssuer::new(SECRET);
    let validator = TokenValidator::new(SECRET);
    let now = DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap();

    for ttl in [1, 59, 900, 3600, 86_400] {
        let token = issuer
            .issue_at(TokenOptions::new("s", "r", GrantSet::viewer(), ttl), now)
            .unwrap();

        assert_eq!(token.ttl_seconds(), ttl);
        assert!(validator.validate_at(token.as_str(), now).is_ok());
        assert_eq!(
            validator.validate_at(token.as_str(), now + Duration::seconds(ttl)),
            Err(TokenError::Expired)
        );
    }
}

#[test]
fn test_request_round_trip_through_issuer() {
    let req: TokenRequest = serde_json::from_value(serde_json::json!({
        "subject": "unity-streamer",
        "roomName": "unity-demo",
        "grants": ["roomJoin", "canPublish", "canPublishData"],
        "ttlSeconds": 900,
        "metadata": "{\"platform\":\"quest\"}"
    }))
    .unwrap();

    let issuer = TokenIssuer::new(SECRET).with_issuer("APIdemo");
    let token = issuer.issue_with(req.into()).unwrap();
    let response = token.to_response();

    let decoded = TokenValidator::new(SECRET)
        .with_issuer("APIdemo")
        .validate(&response.access_token)
        .unwrap();

    assert_eq!(decoded.metadata.as_deref(), Some("{\"platform\":\"quest\"}"));
    assert!(decoded.grants.contains(Grant::CanPublishData));
    assert_eq!(response.expires_at, token.expires_at.timestamp_millis());
}

#[test]
fn test_tampered_payload_is_rejected() {
    let token = issue("viewer", "room", &GrantSet::viewer(), 60, SECRET).unwrap();
    let other = issue("admin", "room", &GrantSet::publisher(), 60, SECRET).unwrap();

    // Splice the admin payload onto the viewer signature
    let parts: Vec<&str> = token.as_str().split('.').collect();
    let other_parts: Vec<&str> = other.as_str().split('.').collect();
    let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

    assert_eq!(
        TokenValidator::new(SECRET).validate(&forged),
        Err(TokenError::InvalidSignature)
    );
}
