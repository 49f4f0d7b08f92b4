//! Token and VOD clients against the mock ingest server

mod fixtures;

use chrono::Utc;
use fixtures::TestServer;
use substream_access_token::{Grant, TokenRequest, TokenValidator};
use substream_mock_ingest::{api, AppState, Config};
use substream_whip::{
    BearerToken, TokenEndpointClient, VodUploader, WhipClient, WhipConfig, WhipError,
};

async fn mock_ingest() -> (AppState, TestServer) {
    let state = AppState::new(Config::default());
    let server = TestServer::start(api::build_router(state.clone()))
        .await
        .unwrap();
    (state, server)
}

#[tokio::test]
async fn test_request_token_then_publish() {
    let (state, server) = mock_ingest().await;
    let tokens = TokenEndpointClient::new(&server.base_url(), &WhipConfig::default()).unwrap();

    let response = tokens
        .request(&TokenRequest {
            subject: "streamer-1".into(),
            room_name: "room-42".into(),
            grants: vec![Grant::RoomJoin, Grant::CanPublish],
            ttl_seconds: 600,
            metadata: Some(r#"{"device":"test"}"#.into()),
        })
        .await
        .unwrap();

    let expires_at = response.expires_at().unwrap();
    let remaining = (expires_at - Utc::now()).num_seconds();
    assert!((590..=600).contains(&remaining), "remaining = {}", remaining);

    let decoded = TokenValidator::new(state.config.auth.secret.as_bytes())
        .validate(&response.access_token)
        .unwrap();
    assert_eq!(decoded.subject, "streamer-1");
    assert_eq!(decoded.metadata.as_deref(), Some(r#"{"device":"test"}"#));
    decoded.require(Grant::CanPublish).unwrap();

    let client = WhipClient::new(WhipConfig::default()).unwrap();
    let mut session = client
        .publish("v=0\r\n", &server.url("/whip/publish"), BearerToken::from(response))
        .await
        .unwrap();
    assert!(session.token().expires_at().is_some());
    client.stop(&mut session).await.unwrap();

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_token_request_is_rejected() {
    let (_state, server) = mock_ingest().await;
    let tokens = TokenEndpointClient::new(&server.base_url(), &WhipConfig::default()).unwrap();

    let err = tokens
        .request(&TokenRequest {
            subject: "streamer-1".into(),
            room_name: "room-42".into(),
            grants: vec![Grant::CanPublish],
            ttl_seconds: 0,
            metadata: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(!err.is_retryable());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pc_and_viewer_tokens() {
    let (state, server) = mock_ingest().await;
    let tokens = TokenEndpointClient::new(&server.base_url(), &WhipConfig::default()).unwrap();
    let validator = TokenValidator::new(state.config.auth.secret.as_bytes());

    let pc = tokens.fetch_pc_token().await.unwrap();
    let decoded = validator.validate(&pc.access_token).unwrap();
    assert_eq!(decoded.subject, "demo-sdk");
    assert_eq!(decoded.ttl_seconds(), 900);
    assert_eq!(
        decoded.scopes,
        vec!["live:publish", "vod:upload", "telemetry:write"]
    );

    let viewer = tokens.fetch_viewer_token("room-7", "viewer-9").await.unwrap();
    assert_eq!(viewer.url, state.config.auth.livekit_url);
    let decoded = validator.validate_for_room(&viewer.token, "room-7").unwrap();
    assert_eq!(decoded.subject, "viewer-9");
    assert!(decoded.grants.contains(Grant::CanSubscribe));
    assert!(!decoded.grants.contains(Grant::CanPublish));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_vod_upload_flow() {
    let (state, server) = mock_ingest().await;
    let mut uploader = VodUploader::new(&server.base_url(), &WhipConfig::default()).unwrap();

    let info = uploader
        .create_session(serde_json::json!({ "title": "practice run" }))
        .await
        .unwrap();
    assert_eq!(info.upload_url, format!("/vod/upload/{}", info.session_id));

    let err = uploader
        .create_session(serde_json::Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, WhipError::InvalidState { .. }));

    uploader.upload_chunk(vec![0u8; 4096], "chunk-1").await.unwrap();
    uploader.upload_chunk(vec![1u8; 1024], "chunk-2").await.unwrap();
    assert_eq!(uploader.uploaded_chunks(), 2);

    assert_eq!(uploader.finalize().await.unwrap(), 2);
    assert!(uploader.session().is_none());

    let stored = state.vod.get(&info.session_id).unwrap();
    assert!(stored.finalized);
    assert_eq!(stored.total_bytes(), 5120);
    assert_eq!(stored.chunks[0].filename.as_deref(), Some("chunk-1"));

    server.shutdown().await.unwrap();
}
