// Integration tests for the room-join token endpoint and its client
//
// Router tests drive the service directly; client tests go through a
// loopback server.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use debate_audio::livekit::{verify, TokenClient, TokenResponse};
use debate_audio::{create_router, AppState, TokenIssuer};
use std::time::Duration;
use tower::ServiceExt;

const API_KEY: &str = "APIdebate";
const API_SECRET: &str = "debate-secret-for-tests";

fn configured_issuer() -> TokenIssuer {
    TokenIssuer {
        api_key: Some(API_KEY.to_string()),
        api_secret: Some(API_SECRET.to_string()),
        ttl: Duration::from_secs(3600),
    }
}

fn unconfigured_issuer() -> TokenIssuer {
    TokenIssuer {
        api_key: None,
        api_secret: None,
        ttl: Duration::from_secs(3600),
    }
}

async fn get(issuer: TokenIssuer, uri: &str) -> Result<(StatusCode, Vec<u8>)> {
    let app = create_router(AppState::new(issuer));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, body.to_vec()))
}

async fn spawn_server(issuer: TokenIssuer) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(AppState::new(issuer));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let (status, body) = get(unconfigured_issuer(), "/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
    Ok(())
}

#[tokio::test]
async fn test_issue_token_for_room_and_user() -> Result<()> {
    let (status, body) = get(
        configured_issuer(),
        "/api/livekit-token?roomName=climate-debate&userId=alice",
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let response: TokenResponse = serde_json::from_slice(&body)?;
    let claims = verify(&response.token, API_SECRET)?;

    assert_eq!(claims.iss, API_KEY);
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.video.room, "climate-debate");
    assert!(claims.video.room_join);
    assert!(claims.video.can_publish);
    assert!(claims.video.can_subscribe);
    assert_eq!(claims.exp - claims.nbf, 3600);
    Ok(())
}

#[tokio::test]
async fn test_issue_token_defaults() -> Result<()> {
    let (status, body) = get(configured_issuer(), "/api/livekit-token").await?;
    assert_eq!(status, StatusCode::OK);

    let response: TokenResponse = serde_json::from_slice(&body)?;
    let claims = verify(&response.token, API_SECRET)?;

    assert_eq!(claims.sub, "anonymous");
    assert_eq!(claims.video.room, "default-room");
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials() -> Result<()> {
    let (status, body) = get(unconfigured_issuer(), "/api/livekit-token?userId=bob").await?;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(error["error"], "LiveKit env not configured");
    Ok(())
}

#[tokio::test]
async fn test_token_does_not_verify_with_other_secret() -> Result<()> {
    let (_, body) = get(configured_issuer(), "/api/livekit-token?userId=carol").await?;
    let response: TokenResponse = serde_json::from_slice(&body)?;

    assert!(verify(&response.token, "some-other-secret").is_err());
    Ok(())
}

#[tokio::test]
async fn test_client_fetches_token() -> Result<()> {
    let base_url = spawn_server(configured_issuer()).await?;
    let client = TokenClient::new(format!("{}/", base_url)).with_ws_url("wss://media.example.test");

    let info = client.join_info("finals", "dave").await?;

    assert_eq!(info.ws_url, "wss://media.example.test");
    let claims = verify(&info.token, API_SECRET)?;
    assert_eq!(claims.sub, "dave");
    assert_eq!(claims.video.room, "finals");
    Ok(())
}

#[tokio::test]
async fn test_client_reports_server_error() -> Result<()> {
    let base_url = spawn_server(unconfigured_issuer()).await?;
    let client = TokenClient::new(base_url);

    let err = client.fetch_token("finals", "erin").await.unwrap_err();
    let message = err.to_string();

    assert!(message.starts_with("Failed to fetch LiveKit token: 500"));
    assert!(message.contains("LiveKit env not configured"));
    Ok(())
}

#[tokio::test]
async fn test_join_info_requires_ws_url() -> Result<()> {
    let client = TokenClient::new("http://127.0.0.1:9");

    let err = client.join_info("finals", "frank").await.unwrap_err();

    assert_eq!(err.to_string(), "LiveKit websocket URL is not set");
    Ok(())
}
