use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::PlaybackPolicy;
use super::recovery::{Pipeline, SinkContext};
use super::state::{PlaybackState, RetryState, RetryTracker};
use crate::media::{InteractionHub, MediaStream, PlaybackElement};

/// Plays one remote participant's audio through a hidden playback element
///
/// The element is never muted locally: a remote mute is carried by the
/// upstream track being disabled. At most one playback pipeline runs per
/// sink; binding a different stream cancels the previous one first.
///
/// Call `detach()` or `dispose()` before dropping the sink. Dropping it
/// only signals cancellation and does not wait for listener cleanup.
pub struct RemoteAudioSink {
    ctx: Arc<SinkContext>,
    bound: Option<MediaStream>,
    pipeline: Option<Pipeline>,
}

impl RemoteAudioSink {
    pub fn new(
        user_id: impl Into<String>,
        element: Arc<dyn PlaybackElement>,
        interactions: InteractionHub,
        policy: PlaybackPolicy,
    ) -> Self {
        element.set_muted(false);
        element.set_volume(1.0);

        let (state, _) = watch::channel(PlaybackState::Idle);
        let retry = RetryTracker::new(policy.max_retry_attempts);

        Self {
            ctx: Arc::new(SinkContext {
                user_id: user_id.into(),
                element,
                interactions,
                policy,
                state,
                retry,
            }),
            bound: None,
            pipeline: None,
        }
    }

    /// Bind `stream` to the element and start playing it
    ///
    /// Idempotent for the stream that is already bound. A stream with a
    /// different identity replaces the binding: the previous pipeline's
    /// timers and listeners are removed before tracking starts for the new
    /// stream.
    pub async fn attach(&mut self, stream: MediaStream) {
        let element = Arc::clone(&self.ctx.element);
        let user_id = self.ctx.user_id.as_str();

        let tracks: Vec<_> = stream.audio_tracks().collect();
        let active = tracks
            .iter()
            .filter(|t| t.is_enabled() && t.is_live())
            .count();
        debug!(
            "Processing stream {} for {} ({} audio track(s), {} active)",
            stream.id(),
            user_id,
            tracks.len(),
            active
        );
        if active == 0 {
            // Still attach; tracks may become active later
            warn!("No active audio tracks in stream {} for {}", stream.id(), user_id);
        }

        let already_bound = self.bound.as_ref().is_some_and(|b| b.id() == stream.id())
            && element.source().is_some_and(|s| s.ptr_eq(&stream));

        if !already_bound {
            info!(
                "Updating audio element for {} (old stream {:?}, new stream {})",
                user_id,
                self.bound.as_ref().map(|b| b.id().to_string()),
                stream.id()
            );

            if let Some(pipeline) = self.pipeline.take() {
                debug!("Cancelling pipeline for stream {}", pipeline.stream_id());
                pipeline.shutdown().await;
            }

            element.set_source(Some(stream.clone()));
            self.bound = Some(stream.clone());
            self.ctx.set_state(PlaybackState::Idle);
            self.ctx.retry.reset(self.ctx.policy.max_retry_attempts);
        }

        element.set_muted(false);
        element.set_volume(1.0);

        if self.pipeline.is_none() {
            self.pipeline = Some(Pipeline::start(Arc::clone(&self.ctx), stream));
        }
    }

    /// Stop tracking the bound stream and release the element binding
    pub async fn detach(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown().await;
        }

        if let Some(stream) = self.bound.take() {
            info!("Detached stream {} from {}", stream.id(), self.ctx.user_id);
        }

        self.ctx.element.set_source(None);
        self.ctx.set_state(PlaybackState::Idle);
    }

    /// Detach and consume the sink
    pub async fn dispose(mut self) {
        self.detach().await;
    }

    pub fn user_id(&self) -> &str {
        &self.ctx.user_id
    }

    pub fn bound_stream(&self) -> Option<&MediaStream> {
        self.bound.as_ref()
    }

    pub fn state(&self) -> PlaybackState {
        *self.ctx.state.borrow()
    }

    /// Subscribe to playback state transitions
    pub fn state_changes(&self) -> watch::Receiver<PlaybackState> {
        self.ctx.state.subscribe()
    }

    pub fn retry_state(&self) -> RetryState {
        self.ctx.retry.snapshot()
    }

    pub fn element(&self) -> &Arc<dyn PlaybackElement> {
        &self.ctx.element
    }
}

impl Drop for RemoteAudioSink {
    fn drop(&mut self) {
        if let Some(pipeline) = &self.pipeline {
            warn!("Audio sink for {} dropped without dispose", self.ctx.user_id);
            pipeline.cancel();
        }
    }
}
