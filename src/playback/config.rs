use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::PlaybackSettings;

/// Tunables for starting remote playback and recovering from autoplay blocks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackPolicy {
    /// Delay between attaching a stream and the first play attempt
    pub initial_play_delay: Duration,

    /// Spacing of periodic retries while blocked
    pub retry_interval: Duration,

    /// Periodic retries before giving up
    pub max_retry_attempts: u32,

    /// How long to wait for buffered data before calling play anyway
    pub can_play_timeout: Duration,

    /// Delay before resuming after an unexpected pause
    pub pause_resume_delay: Duration,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            initial_play_delay: Duration::from_millis(200),
            retry_interval: Duration::from_millis(500),
            max_retry_attempts: 10,
            can_play_timeout: Duration::from_secs(2),
            pause_resume_delay: Duration::from_millis(100),
        }
    }
}

impl From<&PlaybackSettings> for PlaybackPolicy {
    fn from(settings: &PlaybackSettings) -> Self {
        Self {
            initial_play_delay: Duration::from_millis(settings.initial_play_delay_ms),
            retry_interval: Duration::from_millis(settings.retry_interval_ms.max(1)),
            max_retry_attempts: settings.max_retry_attempts,
            can_play_timeout: Duration::from_millis(settings.can_play_timeout_ms),
            pause_resume_delay: Duration::from_millis(settings.pause_resume_delay_ms),
        }
    }
}
