pub mod config;
pub mod http;
pub mod livekit;
pub mod media;
pub mod playback;
pub mod room;
pub mod session;

pub use config::Config;
pub use http::{create_router, AppState, TokenIssuer};
pub use livekit::{AccessToken, TokenClient, VideoGrant};
pub use media::{
    CaptureDevice, InteractionHub, MediaStream, MediaTrack, PlaybackElement,
};
pub use playback::{PlaybackPolicy, PlaybackState, RemoteAudioSink, RetryState};
pub use room::{DebateRole, DebateRoomAudio, PeerInfo};
pub use session::{
    AcquireErrorKind, MicrophoneConfig, MicrophoneSession, MicrophoneStatus, PermissionState,
};
