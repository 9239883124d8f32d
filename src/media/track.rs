use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const TRACK_EVENT_CAPACITY: usize = 16;

/// Media track kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Track ready state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Live,
    Ended,
}

/// Events a track reports to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    /// The source permanently stopped producing media
    Ended,
    /// Media stopped flowing (e.g. the remote side disabled its track)
    Mute,
    /// Media is flowing again
    Unmute,
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    muted: AtomicBool,
    ready_state: Mutex<ReadyState>,
    events: broadcast::Sender<TrackEvent>,
}

/// Shared handle to a single media track
///
/// Clones refer to the same underlying track, so a state change made
/// through one handle (e.g. `stop()`) is visible through every other.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        let (events, _) = broadcast::channel(TRACK_EVENT_CAPACITY);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                enabled: AtomicBool::new(true),
                muted: AtomicBool::new(false),
                ready_state: Mutex::new(ReadyState::Live),
                events,
            }),
        }
    }

    pub fn audio(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Audio)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the source is currently not delivering media
    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    pub fn ready_state(&self) -> ReadyState {
        *self
            .inner
            .ready_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_live(&self) -> bool {
        self.ready_state() == ReadyState::Live
    }

    /// Stop the track locally, releasing its source
    ///
    /// A local stop does not notify listeners.
    pub fn stop(&self) {
        self.set_ready_state(ReadyState::Ended);
    }

    /// Source-side end of the track (remote hang-up, device unplugged)
    pub fn end(&self) {
        if self.set_ready_state(ReadyState::Ended) {
            self.emit(TrackEvent::Ended);
        }
    }

    /// Source-side change of the media flow
    pub fn set_muted(&self, muted: bool) {
        let previous = self.inner.muted.swap(muted, Ordering::SeqCst);
        if previous != muted && self.is_live() {
            self.emit(if muted {
                TrackEvent::Mute
            } else {
                TrackEvent::Unmute
            });
        }
    }

    /// Register a listener for this track's events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.inner.events.subscribe()
    }

    /// Number of currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    pub fn ptr_eq(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn set_ready_state(&self, state: ReadyState) -> bool {
        let mut current = self
            .inner
            .ready_state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let changed = *current != state;
        *current = state;
        changed
    }

    fn emit(&self, event: TrackEvent) {
        // No listeners is fine
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("enabled", &self.is_enabled())
            .field("muted", &self.is_muted())
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

/// A set of tracks delivered together by a capture device or remote peer
#[derive(Clone)]
pub struct MediaStream {
    id: Arc<str>,
    tracks: Arc<Vec<MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        let id: String = id.into();
        Self {
            id: id.into(),
            tracks: Arc::new(tracks),
        }
    }

    /// Build a stream of `count` fresh audio tracks with generated IDs
    pub fn with_audio_tracks(count: usize) -> Self {
        let tracks = (0..count)
            .map(|_| MediaTrack::audio(uuid::Uuid::new_v4().to_string()))
            .collect();
        Self::new(uuid::Uuid::new_v4().to_string(), tracks)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    /// Whether both handles refer to the same stream object
    pub fn ptr_eq(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.tracks, &other.tracks)
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks)
            .finish()
    }
}
