//! In-process media platform
//!
//! Stands in for a browser's capture and playback primitives so the session
//! state machines can run headless (tests, the `demo` command).

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

use super::capture::{AudioAnalyser, AudioConstraints, CaptureDevice, CaptureError};
use super::interaction::InteractionHub;
use super::playback::{ElementEvent, PlayError, PlaybackElement};
use super::track::MediaStream;

const FFT_SIZE: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How the simulated device answers capture requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceResponse {
    Grant,
    Deny,
    NoDevice,
    Fail(String),
}

/// Simulated microphone
pub struct SimulatedCaptureDevice {
    supported: bool,
    response: Mutex<DeviceResponse>,
    input_level: Arc<AtomicU8>,
    analyser_fails: AtomicBool,
    open_analysers: Arc<AtomicUsize>,
    requests: Mutex<Vec<AudioConstraints>>,
    issued: Mutex<Vec<MediaStream>>,
}

impl SimulatedCaptureDevice {
    pub fn new() -> Self {
        Self {
            supported: true,
            response: Mutex::new(DeviceResponse::Grant),
            input_level: Arc::new(AtomicU8::new(0)),
            analyser_fails: AtomicBool::new(false),
            open_analysers: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
            issued: Mutex::new(Vec::new()),
        }
    }

    /// A platform with no capture API
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn set_response(&self, response: DeviceResponse) {
        *lock(&self.response) = response;
    }

    /// Magnitude reported in every frequency bin
    pub fn set_input_level(&self, level: u8) {
        self.input_level.store(level, Ordering::SeqCst);
    }

    pub fn fail_analysers(&self, fail: bool) {
        self.analyser_fails.store(fail, Ordering::SeqCst);
    }

    pub fn open_analysers(&self) -> usize {
        self.open_analysers.load(Ordering::SeqCst)
    }

    /// Constraints of every capture request, oldest first
    pub fn requests(&self) -> Vec<AudioConstraints> {
        lock(&self.requests).clone()
    }

    /// Every stream handed out so far
    pub fn issued_streams(&self) -> Vec<MediaStream> {
        lock(&self.issued).clone()
    }

    /// Tracks still holding the (simulated) hardware
    pub fn live_track_count(&self) -> usize {
        lock(&self.issued)
            .iter()
            .flat_map(|s| s.tracks().iter())
            .filter(|t| t.is_live())
            .count()
    }
}

impl Default for SimulatedCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for SimulatedCaptureDevice {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn get_user_media(
        &self,
        constraints: AudioConstraints,
    ) -> Result<MediaStream, CaptureError> {
        lock(&self.requests).push(constraints);

        let response = lock(&self.response).clone();
        match response {
            DeviceResponse::Grant => {
                let stream = MediaStream::with_audio_tracks(1);
                debug!("Simulated device granted stream {}", stream.id());
                lock(&self.issued).push(stream.clone());
                Ok(stream)
            }
            DeviceResponse::Deny => Err(CaptureError::NotAllowed(
                "Permission denied by user".to_string(),
            )),
            DeviceResponse::NoDevice => Err(CaptureError::NotFound(
                "Requested device not found".to_string(),
            )),
            DeviceResponse::Fail(message) => Err(CaptureError::Other(message)),
        }
    }

    fn create_analyser(&self, _stream: &MediaStream) -> Result<Box<dyn AudioAnalyser>> {
        if self.analyser_fails.load(Ordering::SeqCst) {
            bail!("Audio context unavailable");
        }

        self.open_analysers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedAnalyser {
            level: Arc::clone(&self.input_level),
            open: Arc::clone(&self.open_analysers),
            closed: false,
        }))
    }
}

struct SimulatedAnalyser {
    level: Arc<AtomicU8>,
    open: Arc<AtomicUsize>,
    closed: bool,
}

impl AudioAnalyser for SimulatedAnalyser {
    fn frequency_bin_count(&self) -> usize {
        FFT_SIZE / 2
    }

    fn byte_frequency_data(&mut self, out: &mut [u8]) {
        out.fill(self.level.load(Ordering::SeqCst));
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            bail!("Analyser already closed");
        }
        self.closed = true;
        self.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Autoplay behaviour of a simulated element
#[derive(Clone)]
pub enum AutoplayPolicy {
    Allowed,
    Blocked,
    /// Reject the first `n` play calls, then allow
    RejectFirst(u32),
    /// Reject until the hub has seen a user gesture
    RequiresActivation(InteractionHub),
}

/// Simulated hidden audio element
pub struct SimulatedPlaybackElement {
    policy: Mutex<AutoplayPolicy>,
    source: Mutex<Option<MediaStream>>,
    muted: AtomicBool,
    volume: Mutex<f32>,
    paused: AtomicBool,
    has_data: AtomicBool,
    buffers_on_attach: AtomicBool,
    play_calls: AtomicU32,
    events: broadcast::Sender<ElementEvent>,
}

impl SimulatedPlaybackElement {
    pub fn new(policy: AutoplayPolicy) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            policy: Mutex::new(policy),
            source: Mutex::new(None),
            muted: AtomicBool::new(false),
            volume: Mutex::new(1.0),
            paused: AtomicBool::new(true),
            has_data: AtomicBool::new(false),
            buffers_on_attach: AtomicBool::new(true),
            play_calls: AtomicU32::new(0),
            events,
        }
    }

    pub fn set_policy(&self, policy: AutoplayPolicy) {
        *lock(&self.policy) = policy;
    }

    /// When false, attaching a source leaves the element without data
    /// until `feed()` is called
    pub fn buffer_on_attach(&self, buffers: bool) {
        self.buffers_on_attach.store(buffers, Ordering::SeqCst);
    }

    /// Media data arrived
    pub fn feed(&self) {
        if !self.has_data.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(ElementEvent::CanPlay);
        }
    }

    /// Platform-initiated pause (e.g. audio session interruption)
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(ElementEvent::Pause);
        }
    }

    pub fn play_calls(&self) -> u32 {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn autoplay_allows(&self, call: u32) -> bool {
        match &*lock(&self.policy) {
            AutoplayPolicy::Allowed => true,
            AutoplayPolicy::Blocked => false,
            AutoplayPolicy::RejectFirst(n) => call > *n,
            AutoplayPolicy::RequiresActivation(hub) => hub.has_user_activation(),
        }
    }
}

#[async_trait::async_trait]
impl PlaybackElement for SimulatedPlaybackElement {
    fn set_source(&self, stream: Option<MediaStream>) {
        let attached = stream.is_some();
        *lock(&self.source) = stream;
        self.has_data.store(false, Ordering::SeqCst);

        // Loading a new source resets playback
        self.paused.store(true, Ordering::SeqCst);

        if attached && self.buffers_on_attach.load(Ordering::SeqCst) {
            self.feed();
        }
    }

    fn source(&self) -> Option<MediaStream> {
        lock(&self.source).clone()
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: f32) {
        *lock(&self.volume) = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        *lock(&self.volume)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn has_current_data(&self) -> bool {
        self.has_data.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ElementEvent> {
        self.events.subscribe()
    }

    async fn play(&self) -> Result<(), PlayError> {
        let call = self.play_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if lock(&self.source).is_none() {
            return Err(PlayError::NoSource);
        }

        if !self.autoplay_allows(call) {
            return Err(PlayError::NotAllowed(
                "play() failed because the user didn't interact with the document first"
                    .to_string(),
            ));
        }

        if self.paused.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(ElementEvent::Play);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::interaction::{EventTarget, InteractionKind};

    #[tokio::test]
    async fn test_reject_first_policy() {
        let element = SimulatedPlaybackElement::new(AutoplayPolicy::RejectFirst(2));
        element.set_source(Some(MediaStream::with_audio_tracks(1)));

        assert!(element.play().await.is_err());
        assert!(element.play().await.is_err());
        assert!(element.play().await.is_ok());
        assert!(!element.is_paused());
        assert_eq!(element.play_calls(), 3);
    }

    #[tokio::test]
    async fn test_activation_policy_follows_hub() {
        let hub = InteractionHub::new();
        let element =
            SimulatedPlaybackElement::new(AutoplayPolicy::RequiresActivation(hub.clone()));
        element.set_source(Some(MediaStream::with_audio_tracks(1)));

        assert!(matches!(element.play().await, Err(PlayError::NotAllowed(_))));

        hub.dispatch(EventTarget::Document, InteractionKind::Click);
        assert!(element.play().await.is_ok());
    }

    #[tokio::test]
    async fn test_new_source_pauses() {
        let element = SimulatedPlaybackElement::new(AutoplayPolicy::Allowed);
        element.set_source(Some(MediaStream::with_audio_tracks(1)));
        element.play().await.unwrap();
        assert!(!element.is_paused());

        element.set_source(Some(MediaStream::with_audio_tracks(1)));

        assert!(element.is_paused());
        assert!(element.has_current_data());
    }

    #[tokio::test]
    async fn test_play_without_source() {
        let element = SimulatedPlaybackElement::new(AutoplayPolicy::Allowed);
        assert_eq!(element.play().await, Err(PlayError::NoSource));
    }

    #[tokio::test]
    async fn test_device_tracks_issued_streams() {
        let device = SimulatedCaptureDevice::new();
        let stream = device.get_user_media(AudioConstraints::voice()).await.unwrap();

        assert_eq!(device.live_track_count(), 1);
        stream.tracks()[0].stop();
        assert_eq!(device.live_track_count(), 0);
        assert_eq!(device.requests(), vec![AudioConstraints::voice()]);
    }
}
