//! Audio side of a debate room
//!
//! `DebateRoomAudio` owns the local microphone session and one
//! `RemoteAudioSink` per remote participant, keyed by user ID.

mod peers;

pub use peers::{DebateRole, PeerInfo};

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::media::{InteractionHub, MediaStream, PlaybackElement};
use crate::playback::{PlaybackPolicy, PlaybackState, RemoteAudioSink};
use crate::session::{AcquireErrorKind, MicrophoneSession};

/// Creates the hidden playback element for a participant
pub type ElementFactory = Box<dyn Fn(&str) -> Arc<dyn PlaybackElement> + Send + Sync>;

struct Participant {
    role: DebateRole,
    sink: Option<RemoteAudioSink>,
}

pub struct DebateRoomAudio {
    local_user_id: String,
    microphone: MicrophoneSession,
    make_element: ElementFactory,
    interactions: InteractionHub,
    policy: PlaybackPolicy,
    participants: HashMap<String, Participant>,
}

impl DebateRoomAudio {
    pub fn new(
        local_user_id: impl Into<String>,
        microphone: MicrophoneSession,
        make_element: ElementFactory,
        interactions: InteractionHub,
        policy: PlaybackPolicy,
    ) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            microphone,
            make_element,
            interactions,
            policy,
            participants: HashMap::new(),
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    pub fn microphone(&self) -> &MicrophoneSession {
        &self.microphone
    }

    pub async fn join_microphone(&mut self) -> Result<MediaStream, AcquireErrorKind> {
        self.microphone.acquire().await
    }

    pub fn toggle_local_mute(&mut self) -> bool {
        self.microphone.toggle_mute()
    }

    pub fn set_local_muted(&mut self, muted: bool) {
        self.microphone.set_muted(muted);
    }

    /// Record a participant's metadata (currently only the debate role)
    pub fn participant_metadata(&mut self, user_id: &str, metadata: &str) {
        let role = DebateRole::from_metadata(metadata);
        debug!("Participant {} has role {:?}", user_id, role);

        self.participants
            .entry(user_id.to_string())
            .or_insert_with(|| Participant {
                role,
                sink: None,
            })
            .role = role;
    }

    /// A remote participant's audio stream became available or changed
    pub async fn remote_stream_available(&mut self, user_id: &str, stream: MediaStream) {
        if user_id == self.local_user_id {
            debug!("Ignoring our own stream {}", stream.id());
            return;
        }

        let participant = self
            .participants
            .entry(user_id.to_string())
            .or_insert_with(|| Participant {
                role: DebateRole::default(),
                sink: None,
            });

        let sink = participant.sink.get_or_insert_with(|| {
            info!("Creating audio sink for {}", user_id);
            RemoteAudioSink::new(
                user_id,
                (self.make_element)(user_id),
                self.interactions.clone(),
                self.policy.clone(),
            )
        });

        sink.attach(stream).await;
    }

    /// Remove a participant, releasing their sink and remote tracks
    pub async fn participant_left(&mut self, user_id: &str) {
        let Some(participant) = self.participants.remove(user_id) else {
            return;
        };

        info!("Participant {} left", user_id);

        if let Some(sink) = participant.sink {
            let stream = sink.bound_stream().cloned();
            sink.dispose().await;
            if let Some(stream) = stream {
                for track in stream.tracks() {
                    track.stop();
                }
            }
        }
    }

    pub fn sink(&self, user_id: &str) -> Option<&RemoteAudioSink> {
        self.participants.get(user_id).and_then(|p| p.sink.as_ref())
    }

    /// Remote participants sorted by user ID
    pub fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self
            .participants
            .iter()
            .map(|(user_id, p)| PeerInfo {
                user_id: user_id.clone(),
                role: p.role,
                stream_id: p
                    .sink
                    .as_ref()
                    .and_then(|s| s.bound_stream())
                    .map(|s| s.id().to_string()),
                playback_state: p
                    .sink
                    .as_ref()
                    .map(|s| s.state())
                    .unwrap_or(PlaybackState::Idle),
            })
            .collect();

        peers.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        peers
    }

    /// Leave the room: dispose every sink and release the microphone
    pub async fn leave(&mut self) {
        info!("Leaving room as {}", self.local_user_id);

        let sinks: Vec<RemoteAudioSink> = self
            .participants
            .drain()
            .filter_map(|(_, p)| p.sink)
            .collect();
        join_all(sinks.into_iter().map(|sink| sink.dispose())).await;

        self.microphone.teardown().await;
    }
}
