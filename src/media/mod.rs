pub mod capture;
pub mod interaction;
pub mod playback;
pub mod sim;
pub mod track;

pub use capture::{AudioAnalyser, AudioConstraints, CaptureDevice, CaptureError};
pub use interaction::{EventTarget, Interaction, InteractionHub, InteractionKind, InteractionListener};
pub use playback::{ElementEvent, PlayError, PlaybackElement};
pub use sim::{AutoplayPolicy, DeviceResponse, SimulatedCaptureDevice, SimulatedPlaybackElement};
pub use track::{MediaStream, MediaTrack, ReadyState, TrackEvent, TrackKind};
