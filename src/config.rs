use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub livekit: LiveKitConfig,
    pub microphone: MicrophoneSettings,
    pub playback: PlaybackSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "debate-audio".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Websocket URL of the media server clients connect to
    pub ws_url: Option<String>,
    pub token_ttl_secs: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            ws_url: None,
            token_ttl_secs: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MicrophoneSettings {
    pub volume_poll_ms: u64,
    pub volume_ceiling: f32,
}

impl Default for MicrophoneSettings {
    fn default() -> Self {
        Self {
            volume_poll_ms: 16,
            volume_ceiling: 128.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub initial_play_delay_ms: u64,
    pub retry_interval_ms: u64,
    pub max_retry_attempts: u32,
    pub can_play_timeout_ms: u64,
    pub pause_resume_delay_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            initial_play_delay_ms: 200,
            retry_interval_ms: 500,
            max_retry_attempts: 10,
            can_play_timeout_ms: 2000,
            pause_resume_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load `path` (any format the config crate understands, extension
    /// optional) with `DEBATE_AUDIO__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("DEBATE_AUDIO")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}
