use serde::{Deserialize, Serialize};

use crate::playback::PlaybackState;

/// Side a participant takes in a debate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateRole {
    Host,
    #[default]
    Agree,
    Disagree,
}

#[derive(Deserialize)]
struct ParticipantMetadata {
    role: Option<DebateRole>,
}

impl DebateRole {
    /// Read the role from participant metadata (`{"role": "..."}`)
    ///
    /// Missing, malformed or unknown roles fall back to `Agree`.
    pub fn from_metadata(metadata: &str) -> Self {
        serde_json::from_str::<ParticipantMetadata>(metadata)
            .ok()
            .and_then(|m| m.role)
            .unwrap_or_default()
    }
}

/// A remote participant as seen by the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerInfo {
    pub user_id: String,
    pub role: DebateRole,
    pub stream_id: Option<String>,
    pub playback_state: PlaybackState,
}
