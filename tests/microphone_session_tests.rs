// Integration tests for the local microphone session
//
// These run against the simulated capture device, which records every
// stream it hands out so hardware release can be verified.

use debate_audio::media::{
    AudioConstraints, DeviceResponse, ReadyState, SimulatedCaptureDevice,
};
use debate_audio::{AcquireErrorKind, MicrophoneConfig, MicrophoneSession, PermissionState};
use std::sync::Arc;
use std::time::Duration;

fn new_session() -> (Arc<SimulatedCaptureDevice>, MicrophoneSession) {
    let device = Arc::new(SimulatedCaptureDevice::new());
    let session = MicrophoneSession::new(device.clone(), MicrophoneConfig::default());
    (device, session)
}

#[tokio::test(start_paused = true)]
async fn test_acquire_starts_muted() {
    let (device, mut session) = new_session();

    let stream = session.acquire().await.expect("acquire should succeed");

    assert!(session.is_muted());
    assert_eq!(session.permission(), PermissionState::Granted);
    assert_eq!(session.last_error(), None);
    assert!(stream.audio_tracks().all(|t| !t.is_enabled()));

    // Voice processing was requested
    assert_eq!(device.requests(), vec![AudioConstraints::voice()]);

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_toggle_twice_restores_state() {
    let (_device, mut session) = new_session();
    let stream = session.acquire().await.unwrap();

    assert!(!session.toggle_mute());
    assert!(stream.audio_tracks().all(|t| t.is_enabled()));

    assert!(session.toggle_mute());
    assert!(session.is_muted());
    assert!(stream.audio_tracks().all(|t| !t.is_enabled()));

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_set_muted_tracks_follow() {
    let (_device, mut session) = new_session();
    let stream = session.acquire().await.unwrap();

    session.set_muted(false);
    assert!(!session.is_muted());
    assert!(stream.audio_tracks().all(|t| t.is_enabled()));

    session.set_muted(true);
    assert!(stream.audio_tracks().all(|t| !t.is_enabled()));

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_mute_without_stream_is_noop() {
    let (_device, mut session) = new_session();

    assert!(session.toggle_mute());
    session.set_muted(false);

    assert!(session.is_muted());
    assert!(session.stream().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_is_idempotent() {
    let (device, mut session) = new_session();
    session.acquire().await.unwrap();

    session.teardown().await;
    session.teardown().await;

    assert!(session.stream().is_none());
    // One acquisition plus one sweep; the second teardown had nothing to release
    assert_eq!(device.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_without_acquire_never_touches_hardware() {
    let (device, mut session) = new_session();

    session.teardown().await;

    assert!(session.stream().is_none());
    assert!(device.requests().is_empty());
    assert_eq!(session.permission(), PermissionState::Unrequested);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_every_track() {
    let (device, mut session) = new_session();
    let stream = session.acquire().await.unwrap();
    session.toggle_mute();

    session.teardown().await;

    for track in stream.tracks() {
        assert_eq!(track.ready_state(), ReadyState::Ended);
        assert!(!track.is_enabled());
    }

    // Including whatever the defensive sweep picked up
    assert_eq!(device.issued_streams().len(), 2);
    assert_eq!(device.live_track_count(), 0);
    assert_eq!(device.requests()[1], AudioConstraints::plain());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_keeps_permission_history() {
    let (_device, mut session) = new_session();
    session.acquire().await.unwrap();
    session.toggle_mute();

    session.teardown().await;

    let status = session.status();
    assert!(status.muted);
    assert!(!status.has_stream);
    assert_eq!(status.volume_level, 0.0);
    assert_eq!(status.permission, PermissionState::Granted);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_mute_teardown_scenario() {
    let (_device, mut session) = new_session();

    let stream = session.acquire().await.unwrap();
    let track = stream.audio_tracks().next().unwrap().clone();

    session.toggle_mute();
    assert!(track.is_enabled());

    session.teardown().await;
    assert!(session.stream().is_none());
    assert_eq!(track.ready_state(), ReadyState::Ended);
}

#[tokio::test(start_paused = true)]
async fn test_reacquire_returns_held_stream() {
    let (device, mut session) = new_session();

    let first = session.acquire().await.unwrap();
    let second = session.acquire().await.unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(device.requests().len(), 1);

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_denied_permission() {
    let (device, mut session) = new_session();
    device.set_response(DeviceResponse::Deny);

    let result = session.acquire().await;

    assert_eq!(result.unwrap_err(), AcquireErrorKind::Denied);
    assert_eq!(session.last_error(), Some(AcquireErrorKind::Denied));
    assert_eq!(session.permission(), PermissionState::Denied);
    assert!(session.stream().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_device() {
    let (device, mut session) = new_session();
    device.set_response(DeviceResponse::NoDevice);

    assert_eq!(session.acquire().await.unwrap_err(), AcquireErrorKind::NoDevice);
    assert_eq!(session.permission(), PermissionState::Unrequested);
}

#[tokio::test(start_paused = true)]
async fn test_other_failure() {
    let (device, mut session) = new_session();
    device.set_response(DeviceResponse::Fail("Could not start audio source".to_string()));

    assert_eq!(session.acquire().await.unwrap_err(), AcquireErrorKind::Other);
    assert_eq!(session.last_error(), Some(AcquireErrorKind::Other));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_platform() {
    let device = Arc::new(SimulatedCaptureDevice::unsupported());
    let mut session = MicrophoneSession::new(device.clone(), MicrophoneConfig::default());

    assert_eq!(session.acquire().await.unwrap_err(), AcquireErrorKind::NotSupported);
    assert!(device.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_failure_clears_error() {
    let (device, mut session) = new_session();
    device.set_response(DeviceResponse::Deny);
    assert!(session.acquire().await.is_err());

    device.set_response(DeviceResponse::Grant);
    session.acquire().await.unwrap();

    assert_eq!(session.last_error(), None);
    assert_eq!(session.permission(), PermissionState::Granted);

    session.teardown().await;
}

#[tokio::test(start_paused = true)]
async fn test_volume_meter_tracks_input() {
    let (device, mut session) = new_session();
    device.set_input_level(64);

    session.acquire().await.unwrap();
    assert_eq!(device.open_analysers(), 1);

    let mut levels = session.volume_changes();
    levels
        .wait_for(|level| (*level - 0.5).abs() < 1e-3)
        .await
        .expect("volume monitor should publish");

    session.teardown().await;

    assert_eq!(session.volume_level(), 0.0);
    assert_eq!(device.open_analysers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_analyser_failure_is_not_fatal() {
    let (device, mut session) = new_session();
    device.fail_analysers(true);

    session.acquire().await.unwrap();

    assert_eq!(session.permission(), PermissionState::Granted);
    assert_eq!(session.volume_level(), 0.0);

    session.teardown().await;
    assert_eq!(device.live_track_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_poll_interval_still_releases_analyser() {
    let device = Arc::new(SimulatedCaptureDevice::new());
    device.set_input_level(64);
    let config = MicrophoneConfig {
        volume_poll_interval: Duration::ZERO,
        ..MicrophoneConfig::default()
    };
    let mut session = MicrophoneSession::new(device.clone(), config);

    session.acquire().await.unwrap();
    session
        .volume_changes()
        .wait_for(|level| (*level - 0.5).abs() < 1e-3)
        .await
        .expect("volume monitor should publish");

    session.teardown().await;

    assert_eq!(device.open_analysers(), 0);
    assert_eq!(session.volume_level(), 0.0);
}
