use super::state::AppState;
use crate::livekit::{AccessToken, TokenResponse, VideoGrant};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    pub room_name: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/livekit-token?roomName=&userId=
/// Mint a room-join token for a debate participant
pub async fn issue_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> impl IntoResponse {
    let room_name = query
        .room_name
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "default-room".to_string());
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anonymous".to_string());

    let issuer = &state.issuer;
    let (Some(api_key), Some(api_secret)) = (&issuer.api_key, &issuer.api_secret) else {
        error!("Token requested but LiveKit credentials are not configured");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "LiveKit env not configured");
    };

    let token = AccessToken::new(api_key.as_str(), api_secret.as_str(), user_id.as_str())
        .with_ttl(issuer.ttl)
        .add_grant(VideoGrant::participant(room_name.as_str()))
        .to_jwt();

    match token {
        Ok(token) => {
            info!("Issued token for {} in room {}", user_id, room_name);
            (StatusCode::OK, Json(TokenResponse { token })).into_response()
        }
        Err(e) => {
            error!("Error generating token: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate token")
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
