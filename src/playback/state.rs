use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Playback state of a remote sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackState {
    /// Nothing bound, or nothing left to play
    Idle,
    Playing,
    /// Rejected by the autoplay policy
    Blocked,
    Paused,
}

/// Snapshot of the autoplay recovery bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    pub attempts_remaining: u32,
    pub interval_active: bool,
    pub interaction_listeners_active: bool,
}

#[derive(Debug)]
pub(crate) struct RetryTracker {
    attempts_remaining: AtomicU32,
    interval_active: AtomicBool,
    interaction_listeners_active: AtomicBool,
}

impl RetryTracker {
    pub(crate) fn new(attempts: u32) -> Self {
        Self {
            attempts_remaining: AtomicU32::new(attempts),
            interval_active: AtomicBool::new(false),
            interaction_listeners_active: AtomicBool::new(false),
        }
    }

    /// Back to a full budget with nothing armed
    pub(crate) fn reset(&self, attempts: u32) {
        self.attempts_remaining.store(attempts, Ordering::SeqCst);
        self.finish();
    }

    pub(crate) fn begin(&self, attempts: u32) {
        self.attempts_remaining.store(attempts, Ordering::SeqCst);
        self.interval_active.store(true, Ordering::SeqCst);
        self.interaction_listeners_active.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_remaining(&self, attempts: u32) {
        self.attempts_remaining.store(attempts, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        self.interval_active.store(false, Ordering::SeqCst);
        self.interaction_listeners_active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> RetryState {
        RetryState {
            attempts_remaining: self.attempts_remaining.load(Ordering::SeqCst),
            interval_active: self.interval_active.load(Ordering::SeqCst),
            interaction_listeners_active: self.interaction_listeners_active.load(Ordering::SeqCst),
        }
    }
}

/// Marks recovery as finished when dropped, including on panic
pub(crate) struct RetryGuard<'a>(pub(crate) &'a RetryTracker);

impl Drop for RetryGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_finishes_on_drop() {
        let tracker = RetryTracker::new(10);
        tracker.begin(10);
        tracker.set_remaining(3);

        drop(RetryGuard(&tracker));

        let state = tracker.snapshot();
        assert_eq!(state.attempts_remaining, 3);
        assert!(!state.interval_active);
        assert!(!state.interaction_listeners_active);
    }

    #[test]
    fn test_reset_restores_budget() {
        let tracker = RetryTracker::new(10);
        tracker.begin(10);
        tracker.set_remaining(0);

        tracker.reset(10);

        assert_eq!(
            tracker.snapshot(),
            RetryState {
                attempts_remaining: 10,
                interval_active: false,
                interaction_listeners_active: false,
            }
        );
    }
}
