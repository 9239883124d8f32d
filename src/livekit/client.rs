use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body of a successful token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Everything needed to join a room on the media server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomJoinInfo {
    pub ws_url: String,
    pub token: String,
}

/// Fetches room-join tokens from the token endpoint
pub struct TokenClient {
    http: reqwest::Client,
    base_url: String,
    ws_url: Option<String>,
}

impl TokenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ws_url: None,
        }
    }

    /// Media server websocket URL returned by `join_info`
    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    /// GET /api/livekit-token?roomName=&userId=
    pub async fn fetch_token(&self, room_name: &str, user_id: &str) -> Result<String> {
        let url = format!("{}/api/livekit-token", self.base_url);
        debug!("Requesting token for {} in room {}", user_id, room_name);

        let res = self
            .http
            .get(&url)
            .query(&[("roomName", room_name), ("userId", user_id)])
            .send()
            .await
            .context("Failed to reach token endpoint")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("Failed to fetch LiveKit token: {} {}", status.as_u16(), body);
        }

        let data: TokenResponse = res.json().await.context("Invalid token response")?;
        Ok(data.token)
    }

    /// Token plus websocket URL for connecting to `room_name`
    pub async fn join_info(&self, room_name: &str, user_id: &str) -> Result<RoomJoinInfo> {
        let Some(ws_url) = self.ws_url.clone() else {
            bail!("LiveKit websocket URL is not set");
        };

        let token = self.fetch_token(room_name, user_id).await?;
        info!("Obtained join token for {} in room {}", user_id, room_name);

        Ok(RoomJoinInfo { ws_url, token })
    }
}
