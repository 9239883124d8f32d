//! Local microphone session management
//!
//! This module provides the `MicrophoneSession` abstraction that manages:
//! - Microphone acquisition with voice processing
//! - Mute state via track enablement (sessions start muted)
//! - Input volume metering for the UI
//! - Full teardown that releases the capture hardware

mod config;
mod microphone;
mod stats;
mod volume;

pub use config::MicrophoneConfig;
pub use microphone::MicrophoneSession;
pub use stats::{AcquireErrorKind, MicrophoneStatus, PermissionState};
pub use volume::volume_level;
