use super::config::MicrophoneConfig;
use super::stats::{AcquireErrorKind, MicrophoneStatus, PermissionState};
use super::volume::VolumeMonitor;
use crate::media::{AudioConstraints, CaptureDevice, MediaStream};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// The local user's microphone for the lifetime of a room membership
///
/// The session owns the capture stream exclusively. Callers must invoke
/// `teardown()` before dropping it; nothing else releases the hardware.
pub struct MicrophoneSession {
    /// Platform capture capability
    device: Arc<dyn CaptureDevice>,

    config: MicrophoneConfig,

    /// Live capture stream, if acquired
    stream: Option<MediaStream>,

    muted: bool,

    permission: PermissionState,

    last_error: Option<AcquireErrorKind>,

    /// Latest meter reading
    volume_tx: Arc<watch::Sender<f32>>,

    /// Running volume analysis loop
    monitor: Option<VolumeMonitor>,
}

impl MicrophoneSession {
    pub fn new(device: Arc<dyn CaptureDevice>, config: MicrophoneConfig) -> Self {
        let (volume_tx, _) = watch::channel(0.0);
        Self {
            device,
            config,
            stream: None,
            muted: true,
            permission: PermissionState::Unrequested,
            last_error: None,
            volume_tx: Arc::new(volume_tx),
            monitor: None,
        }
    }

    /// Request the microphone
    ///
    /// On success the session holds the stream with every audio track
    /// disabled (muted) and the volume meter running. Failures are recorded
    /// in `last_error` and returned; no retry is attempted.
    pub async fn acquire(&mut self) -> Result<MediaStream, AcquireErrorKind> {
        if let Some(stream) = &self.stream {
            debug!("Microphone already acquired (stream {})", stream.id());
            return Ok(stream.clone());
        }

        if !self.device.is_supported() {
            error!("Microphone capture is not supported on this platform");
            self.last_error = Some(AcquireErrorKind::NotSupported);
            return Err(AcquireErrorKind::NotSupported);
        }

        info!("Requesting microphone permission");

        let stream = match self.device.get_user_media(AudioConstraints::voice()).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Microphone access error: {}", e);
                let kind = AcquireErrorKind::from(&e);
                if kind == AcquireErrorKind::Denied {
                    self.permission = PermissionState::Denied;
                }
                self.last_error = Some(kind);
                return Err(kind);
            }
        };

        // Sessions start muted regardless of the hardware default
        for track in stream.audio_tracks() {
            track.set_enabled(false);
        }

        info!("Microphone permission granted (stream {})", stream.id());

        self.stream = Some(stream.clone());
        self.muted = true;
        self.permission = PermissionState::Granted;
        self.last_error = None;

        self.start_volume_monitor(&stream);

        Ok(stream)
    }

    fn start_volume_monitor(&mut self, stream: &MediaStream) {
        match self.device.create_analyser(stream) {
            Ok(analyser) => {
                self.monitor = Some(VolumeMonitor::spawn(
                    analyser,
                    Arc::clone(&self.volume_tx),
                    self.config.volume_poll_interval,
                    self.config.volume_ceiling,
                ));
            }
            Err(e) => {
                warn!("Failed to set up audio analysis: {}", e);
            }
        }
    }

    /// Flip the mute state; returns the new state
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.muted;
        self.set_muted(muted);
        self.muted
    }

    /// Set the mute state by enabling/disabling every audio track
    pub fn set_muted(&mut self, muted: bool) {
        let Some(stream) = &self.stream else {
            warn!("No stream to set mute");
            return;
        };

        for track in stream.audio_tracks() {
            track.set_enabled(!muted);
        }
        self.muted = muted;

        info!("Mute set to: {}", if muted { "muted" } else { "unmuted" });
    }

    /// Release the microphone and reset the session
    ///
    /// Idempotent. Permission history is kept; only the active capture is
    /// cleared.
    pub async fn teardown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            if let Err(e) = monitor.stop().await {
                warn!("Volume monitor task failed: {}", e);
            }
        }

        let released = self.stream.take();

        if let Some(stream) = &released {
            info!("Stopping microphone stream {}", stream.id());

            for track in stream.tracks() {
                debug!(
                    "Stopping track {:?} {} (enabled={}, muted={}, state={:?})",
                    track.kind(),
                    track.id(),
                    track.is_enabled(),
                    track.is_muted(),
                    track.ready_state()
                );
                track.stop();
                track.set_enabled(false);
            }

            self.sweep_lingering_tracks().await;
        }

        self.muted = true;
        self.volume_tx.send_replace(0.0);

        if released.is_some() {
            info!("Microphone stream stopped and cleaned up");
        }
    }

    /// Capture once more and stop whatever comes back, catching tracks the
    /// held reference no longer reaches
    async fn sweep_lingering_tracks(&self) {
        if !self.device.is_supported() {
            return;
        }

        match self.device.get_user_media(AudioConstraints::plain()).await {
            Ok(stream) => {
                for track in stream.tracks() {
                    debug!("Found lingering track, stopping: {}", track.id());
                    track.stop();
                }
            }
            Err(e) => {
                debug!("Lingering track sweep found nothing: {}", e);
            }
        }
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn last_error(&self) -> Option<AcquireErrorKind> {
        self.last_error
    }

    pub fn volume_level(&self) -> f32 {
        *self.volume_tx.borrow()
    }

    /// Subscribe to volume meter updates
    pub fn volume_changes(&self) -> watch::Receiver<f32> {
        self.volume_tx.subscribe()
    }

    pub fn status(&self) -> MicrophoneStatus {
        MicrophoneStatus {
            muted: self.muted,
            volume_level: self.volume_level(),
            permission: self.permission,
            last_error: self.last_error,
            has_stream: self.stream.is_some(),
        }
    }
}

impl Drop for MicrophoneSession {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("Microphone session dropped without teardown; hardware may stay claimed");
        }
    }
}
