use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::MicrophoneSettings;

/// Configuration for a microphone session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicrophoneConfig {
    /// How often the volume meter samples the analyser
    /// Default: 16ms (one animation frame at 60Hz)
    pub volume_poll_interval: Duration,

    /// Mean bin magnitude that maps to a full-scale meter (1.0)
    pub volume_ceiling: f32,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            volume_poll_interval: Duration::from_millis(16),
            volume_ceiling: 128.0,
        }
    }
}

impl From<&MicrophoneSettings> for MicrophoneConfig {
    fn from(settings: &MicrophoneSettings) -> Self {
        Self {
            volume_poll_interval: Duration::from_millis(settings.volume_poll_ms.max(1)),
            volume_ceiling: settings.volume_ceiling,
        }
    }
}
