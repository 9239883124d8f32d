use thiserror::Error;
use tokio::sync::broadcast;

use super::track::MediaStream;

/// Reasons a `play()` request can be rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// Rejected by the autoplay policy until the user interacts
    #[error("NotAllowedError: {0}")]
    NotAllowed(String),

    #[error("no source attached")]
    NoSource,

    #[error("playback failed: {0}")]
    Other(String),
}

impl PlayError {
    pub fn is_autoplay_block(&self) -> bool {
        matches!(self, PlayError::NotAllowed(_))
    }
}

/// Events emitted by a playback element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    /// Enough data is buffered to start playback
    CanPlay,
    Play,
    Pause,
    Ended,
}

/// Hidden playback primitive bound to one remote stream
///
/// Methods take `&self`; implementations use interior mutability the way a
/// platform element object does.
#[async_trait::async_trait]
pub trait PlaybackElement: Send + Sync {
    fn set_source(&self, stream: Option<MediaStream>);

    fn source(&self) -> Option<MediaStream>;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn is_paused(&self) -> bool;

    /// Ready state is at least "have current data"
    fn has_current_data(&self) -> bool;

    fn subscribe(&self) -> broadcast::Receiver<ElementEvent>;

    async fn play(&self) -> Result<(), PlayError>;
}
