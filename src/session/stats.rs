use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::CaptureError;

/// Outcome of the most recent permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionState {
    Unrequested,
    Granted,
    Denied,
}

/// Classification of a failed microphone acquisition
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquireErrorKind {
    #[error("Your browser does not support microphone access")]
    NotSupported,

    #[error("Microphone access denied")]
    Denied,

    #[error("No microphone found")]
    NoDevice,

    #[error("Failed to access microphone")]
    Other,
}

impl From<&CaptureError> for AcquireErrorKind {
    fn from(err: &CaptureError) -> Self {
        match err {
            CaptureError::NotAllowed(_) | CaptureError::PermissionDenied(_) => Self::Denied,
            CaptureError::NotFound(_) => Self::NoDevice,
            CaptureError::Other(_) => Self::Other,
        }
    }
}

/// Snapshot of a microphone session for UI rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrophoneStatus {
    /// Whether outgoing audio is muted
    pub muted: bool,

    /// Current input level (0.0 to 1.0)
    pub volume_level: f32,

    pub permission: PermissionState,

    /// Classification of the last failed acquisition, if any
    pub last_error: Option<AcquireErrorKind>,

    /// Whether a live capture stream is held
    pub has_stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_classification() {
        let cases = [
            (CaptureError::NotAllowed("x".into()), AcquireErrorKind::Denied),
            (CaptureError::PermissionDenied("x".into()), AcquireErrorKind::Denied),
            (CaptureError::NotFound("x".into()), AcquireErrorKind::NoDevice),
            (CaptureError::Other("x".into()), AcquireErrorKind::Other),
        ];

        for (err, expected) in cases {
            assert_eq!(AcquireErrorKind::from(&err), expected, "{:?}", err);
        }
    }

    #[test]
    fn test_status_serialization() {
        let status = MicrophoneStatus {
            muted: true,
            volume_level: 0.0,
            permission: PermissionState::Denied,
            last_error: Some(AcquireErrorKind::Denied),
            has_stream: false,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"permission\":\"DENIED\""));
        assert!(json.contains("\"last_error\":\"DENIED\""));
    }
}
