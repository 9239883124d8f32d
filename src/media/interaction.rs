//! User-interaction events used as autoplay unlock triggers
//!
//! Platforms only allow audible playback after a user gesture. Instead of
//! registering listeners on process-wide globals, callers construct one
//! `InteractionHub` per page/app and pass it to every sink that needs it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const INTERACTION_CAPACITY: usize = 64;

/// Where an interaction listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Window,
}

/// Interaction types that count as a user gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Click,
    TouchStart,
    TouchEnd,
    MouseDown,
    KeyDown,
    PointerDown,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 6] = [
        InteractionKind::Click,
        InteractionKind::TouchStart,
        InteractionKind::TouchEnd,
        InteractionKind::MouseDown,
        InteractionKind::KeyDown,
        InteractionKind::PointerDown,
    ];

    pub fn event_name(&self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::TouchStart => "touchstart",
            InteractionKind::TouchEnd => "touchend",
            InteractionKind::MouseDown => "mousedown",
            InteractionKind::KeyDown => "keydown",
            InteractionKind::PointerDown => "pointerdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub target: EventTarget,
    pub kind: InteractionKind,
}

/// Source of user-interaction events
#[derive(Clone)]
pub struct InteractionHub {
    tx: broadcast::Sender<Interaction>,
    activated: Arc<AtomicBool>,
}

impl InteractionHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(INTERACTION_CAPACITY);
        Self {
            tx,
            activated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deliver an interaction to every registered listener
    ///
    /// Returns the number of listeners it reached. Any interaction grants
    /// sticky user activation.
    pub fn dispatch(&self, target: EventTarget, kind: InteractionKind) -> usize {
        self.activated.store(true, Ordering::SeqCst);
        let delivered = self.tx.send(Interaction { target, kind }).unwrap_or(0);
        debug!(
            "Dispatched {} on {:?} to {} listener(s)",
            kind.event_name(),
            target,
            delivered
        );
        delivered
    }

    /// Whether the user has interacted at least once
    pub fn has_user_activation(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    /// Register one-shot listeners for every interaction kind on both targets
    pub fn listen(&self) -> InteractionListener {
        let armed = [EventTarget::Document, EventTarget::Window]
            .into_iter()
            .flat_map(|target| InteractionKind::ALL.into_iter().map(move |kind| (target, kind)))
            .collect();

        InteractionListener {
            rx: self.tx.subscribe(),
            armed,
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for InteractionHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A set of one-shot interaction registrations
///
/// Each (target, kind) pair fires at most once. Dropping the listener
/// removes every remaining registration.
pub struct InteractionListener {
    rx: broadcast::Receiver<Interaction>,
    armed: HashSet<(EventTarget, InteractionKind)>,
}

impl InteractionListener {
    /// Wait for the next interaction matching a still-armed registration
    ///
    /// Returns `None` once every registration has fired or the hub is gone.
    /// Cancel-safe.
    pub async fn next(&mut self) -> Option<Interaction> {
        loop {
            if self.armed.is_empty() {
                return None;
            }

            match self.rx.recv().await {
                Ok(interaction) => {
                    if self.armed.remove(&(interaction.target, interaction.kind)) {
                        return Some(interaction);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Interaction listener lagged by {} event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Registrations that have not fired yet
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}
