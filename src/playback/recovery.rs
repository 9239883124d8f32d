// Playback pipeline for one bound stream
//
// A pipeline is the set of tasks that keep a remote stream audible:
// - one watcher per audio track (ended/mute/unmute)
// - one watcher for the playback element (play/pause/ended)
// - the play task, which makes the initial attempt and runs the autoplay
//   recovery protocol when the platform rejects it
//
// Every task observes the same CancellationToken, so cancelling the
// pipeline tears down its timers and listeners in one step.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::PlaybackPolicy;
use super::state::{PlaybackState, RetryGuard, RetryTracker};
use crate::media::{
    ElementEvent, InteractionHub, MediaStream, MediaTrack, PlaybackElement, TrackEvent,
};

const MIN_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// State shared between a sink and its pipeline tasks
pub(crate) struct SinkContext {
    pub(crate) user_id: String,
    pub(crate) element: Arc<dyn PlaybackElement>,
    pub(crate) interactions: InteractionHub,
    pub(crate) policy: PlaybackPolicy,
    pub(crate) state: watch::Sender<PlaybackState>,
    pub(crate) retry: RetryTracker,
}

impl SinkContext {
    pub(crate) fn set_state(&self, next: PlaybackState) {
        let mut previous = next;
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            previous = *current;
            *current = next;
            true
        });

        if changed {
            debug!(
                "Playback state for {}: {:?} -> {:?}",
                self.user_id, previous, next
            );
        }
    }

    /// One-off play attempt used when media may have started flowing
    async fn try_resume(&self, reason: &str) {
        if !self.element.is_paused() {
            return;
        }

        match self.element.play().await {
            Ok(()) => {
                info!("Audio started playing ({}) for {}", reason, self.user_id);
                self.set_state(PlaybackState::Playing);
            }
            Err(e) => {
                debug!(
                    "Play failed ({}) for {}, will retry on interaction: {}",
                    reason, self.user_id, e
                );
            }
        }
    }
}

/// Running tasks for the currently bound stream
pub(crate) struct Pipeline {
    stream_id: String,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub(crate) fn start(ctx: Arc<SinkContext>, stream: MediaStream) -> Self {
        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        // Subscribe before spawning so listeners exist once attach returns
        for track in stream.audio_tracks() {
            let rx = track.subscribe();
            tasks.push(tokio::spawn(watch_track(
                Arc::clone(&ctx),
                stream.clone(),
                track.clone(),
                rx,
                cancel.clone(),
            )));
        }

        let element_rx = ctx.element.subscribe();
        tasks.push(tokio::spawn(watch_element(
            Arc::clone(&ctx),
            element_rx,
            cancel.clone(),
        )));

        tasks.push(tokio::spawn(run_playback(
            Arc::clone(&ctx),
            stream.clone(),
            cancel.clone(),
        )));

        Self {
            stream_id: stream.id().to_string(),
            cancel,
            tasks,
        }
    }

    pub(crate) fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Cancel every task and wait for them to release their listeners
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();

        for task in self.tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Playback task for stream {} panicked: {}", self.stream_id, e);
                }
            }
        }
    }

    /// Signal cancellation without waiting
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}

async fn watch_track(
    ctx: Arc<SinkContext>,
    stream: MediaStream,
    track: MediaTrack,
    mut events: broadcast::Receiver<TrackEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(TrackEvent::Ended) => {
                warn!("Audio track {} ended for {}", track.id(), ctx.user_id);
                if stream.audio_tracks().all(|t| !t.is_live()) {
                    ctx.set_state(PlaybackState::Idle);
                }
            }
            Ok(TrackEvent::Mute) => {
                warn!("Audio track {} muted for {}", track.id(), ctx.user_id);
            }
            Ok(TrackEvent::Unmute) => {
                info!("Audio track {} unmuted for {}", track.id(), ctx.user_id);
                ctx.try_resume("track became active").await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Track watcher for {} skipped {} event(s)", ctx.user_id, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn watch_element(
    ctx: Arc<SinkContext>,
    mut events: broadcast::Receiver<ElementEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(ElementEvent::Play) => {
                info!("Audio started playing for {}", ctx.user_id);
                ctx.set_state(PlaybackState::Playing);
            }
            Ok(ElementEvent::Pause) => {
                warn!("Audio paused for {}", ctx.user_id);
                ctx.set_state(PlaybackState::Paused);

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ctx.policy.pause_resume_delay) => {}
                }

                if ctx.element.source().is_some() {
                    ctx.try_resume("resuming after pause").await;
                }
            }
            Ok(ElementEvent::Ended) => {
                warn!("Audio ended for {}", ctx.user_id);
            }
            Ok(ElementEvent::CanPlay) => {
                debug!("Audio element ready for {}", ctx.user_id);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Element watcher for {} skipped {} event(s)", ctx.user_id, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn run_playback(ctx: Arc<SinkContext>, stream: MediaStream, cancel: CancellationToken) {
    if stream.audio_tracks().any(|t| t.is_live() && !t.is_muted()) {
        ctx.try_resume("track live at attach").await;
    }

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(ctx.policy.initial_play_delay) => {}
    }

    if !ctx.element.is_paused() {
        ctx.set_state(PlaybackState::Playing);
        return;
    }

    if !wait_for_data(&ctx, &cancel).await {
        return;
    }

    match ctx.element.play().await {
        Ok(()) => {
            info!("Playing audio for {}", ctx.user_id);
            ctx.set_state(PlaybackState::Playing);
        }
        Err(e) if e.is_autoplay_block() => {
            warn!("Autoplay blocked for {}: {}", ctx.user_id, e);
            recover(&ctx, &cancel).await;
        }
        Err(e) => {
            warn!("Play failed for {}: {}", ctx.user_id, e);
            ctx.set_state(PlaybackState::Paused);
        }
    }
}

/// Wait (bounded) until the element has buffered data
///
/// Returns false if the pipeline was cancelled meanwhile.
async fn wait_for_data(ctx: &SinkContext, cancel: &CancellationToken) -> bool {
    let mut events = ctx.element.subscribe();
    if ctx.element.has_current_data() {
        return true;
    }

    let can_play = async {
        loop {
            match events.recv().await {
                Ok(ElementEvent::CanPlay) | Err(broadcast::error::RecvError::Closed) => break,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => false,
        result = tokio::time::timeout(ctx.policy.can_play_timeout, can_play) => {
            if result.is_err() {
                debug!("No media data for {} yet, trying play anyway", ctx.user_id);
            }
            true
        }
    }
}

async fn wait_until_playing(mut state: watch::Receiver<PlaybackState>) {
    let _ = state.wait_for(|s| *s == PlaybackState::Playing).await;
}

/// Autoplay recovery protocol
///
/// Arms one-shot interaction listeners and a bounded periodic retry. The
/// first successful play from any path ends the cycle; so does running out
/// of attempts or cancellation. Listeners and the interval are always
/// released on exit.
async fn recover(ctx: &SinkContext, cancel: &CancellationToken) {
    let max_attempts = ctx.policy.max_retry_attempts;
    let period = ctx.policy.retry_interval.max(MIN_RETRY_INTERVAL);

    ctx.set_state(PlaybackState::Blocked);

    if max_attempts == 0 {
        warn!("Autoplay retries disabled, leaving {} blocked", ctx.user_id);
        return;
    }

    let mut listener = ctx.interactions.listen();
    ctx.retry.begin(max_attempts);
    let _finished = RetryGuard(&ctx.retry);

    let resumed_elsewhere = wait_until_playing(ctx.state.subscribe());
    tokio::pin!(resumed_elsewhere);

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Autoplay recovery cancelled for {}", ctx.user_id);
                break;
            }
            _ = &mut resumed_elsewhere => {
                debug!("Playback resumed elsewhere for {}, ending recovery", ctx.user_id);
                break;
            }
            Some(interaction) = listener.next() => {
                match ctx.element.play().await {
                    Ok(()) => {
                        info!(
                            "Audio started playing after user interaction ({}) for {}",
                            interaction.kind.event_name(),
                            ctx.user_id
                        );
                        ctx.set_state(PlaybackState::Playing);
                        break;
                    }
                    Err(e) => {
                        warn!("Still blocked after interaction for {}: {}", ctx.user_id, e);
                    }
                }
            }
            _ = ticker.tick(), if attempts < max_attempts => {
                attempts += 1;
                ctx.retry.set_remaining(max_attempts - attempts);

                match ctx.element.play().await {
                    Ok(()) => {
                        info!("Audio started playing after retry {} for {}", attempts, ctx.user_id);
                        ctx.set_state(PlaybackState::Playing);
                        break;
                    }
                    Err(e) if attempts >= max_attempts => {
                        warn!(
                            "Gave up retrying audio play for {} after {} attempts: {}",
                            ctx.user_id, max_attempts, e
                        );
                        break;
                    }
                    Err(e) => {
                        debug!("Retry {} failed for {}: {}", attempts, ctx.user_id, e);
                    }
                }
            }
        }
    }

    drop(listener);
}
