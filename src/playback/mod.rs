//! Remote participant audio playback
//!
//! `RemoteAudioSink` binds a remote stream to a playback element and keeps
//! it audible despite platform autoplay restrictions:
//! - initial play attempt shortly after attach
//! - recovery on autoplay rejection (one-shot interaction listeners plus a
//!   bounded periodic retry)
//! - opportunistic play when a track starts delivering media
//! - resume after unexpected pauses

mod config;
mod recovery;
mod sink;
mod state;

pub use config::PlaybackPolicy;
pub use sink::RemoteAudioSink;
pub use state::{PlaybackState, RetryState};
