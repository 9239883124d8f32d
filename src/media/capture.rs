use anyhow::Result;
use thiserror::Error;

use super::track::MediaStream;

/// Processing requested from the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl AudioConstraints {
    /// Voice-chat processing: echo cancellation, noise suppression, AGC
    pub fn voice() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }

    /// Bare audio request with no processing
    pub fn plain() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

/// Errors reported by the platform capture API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("NotAllowedError: {0}")]
    NotAllowed(String),

    #[error("PermissionDeniedError: {0}")]
    PermissionDenied(String),

    #[error("NotFoundError: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Frequency-domain analysis node attached to a capture stream
pub trait AudioAnalyser: Send {
    /// Number of frequency bins (half the FFT size)
    fn frequency_bin_count(&self) -> usize;

    /// Copy the current byte magnitudes into `out`
    fn byte_frequency_data(&mut self, out: &mut [u8]);

    /// Release the analysis graph
    fn close(&mut self) -> Result<()>;
}

/// Microphone capture capability
///
/// Platform-specific implementations:
/// - Browser: `navigator.mediaDevices.getUserMedia` + Web Audio `AnalyserNode`
/// - Simulated: in-process device for tests and demos (`media::sim`)
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Whether the platform exposes a capture API at all
    fn is_supported(&self) -> bool;

    /// Request a live microphone stream
    async fn get_user_media(
        &self,
        constraints: AudioConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// Build an analyser for volume metering of `stream`
    fn create_analyser(&self, stream: &MediaStream) -> Result<Box<dyn AudioAnalyser>>;
}
