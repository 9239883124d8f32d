use crate::config::LiveKitConfig;
use std::sync::Arc;
use std::time::Duration;

/// Credentials used to mint room-join tokens
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub ttl: Duration,
}

impl From<&LiveKitConfig> for TokenIssuer {
    fn from(cfg: &LiveKitConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            api_secret: cfg.api_secret.clone().filter(|s| !s.is_empty()),
            ttl: Duration::from_secs(cfg.token_ttl_secs),
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self {
            issuer: Arc::new(issuer),
        }
    }
}
