//! Event types for the greeting card event system
//!
//! Provides shared event definitions and the EventBus used to push state
//! changes to the presentation layer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::MessageId;

/// Playback phase of the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// Background playing, no greeting
    Idle,
    /// Background paused (autoplay blocked or faded out), no greeting
    PausedIdle,
    /// A greeting track is playing; background is faded out
    GreetingPlaying,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::PausedIdle => write!(f, "paused_idle"),
            PlaybackPhase::GreetingPlaying => write!(f, "greeting_playing"),
        }
    }
}

/// Which slot of the controller a track occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackRole {
    Background,
    Greeting,
}

impl std::fmt::Display for TrackRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackRole::Background => write!(f, "background"),
            TrackRole::Greeting => write!(f, "greeting"),
        }
    }
}

/// Greeting card event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CardEvent {
    /// A portrait was activated and its greeting started playing
    GreetingStarted {
        message_id: MessageId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A greeting reached its natural end; background is coming back
    GreetingFinished {
        message_id: MessageId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A greeting was replaced by another before it finished
    GreetingSuperseded {
        /// Greeting that was cut off
        message_id: MessageId,
        /// Greeting that replaced it
        replaced_by: MessageId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Background track resumed after being paused
    BackgroundResumed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A volume fade ran to completion
    FadeCompleted {
        track: TrackRole,
        volume: f32,
        /// Whether the track was paused at the end of the fade
        paused: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media failure (open, decode, or play rejected). Not recovered.
    PlaybackError {
        track: TrackRole,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl CardEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            CardEvent::GreetingStarted { .. } => "GreetingStarted",
            CardEvent::GreetingFinished { .. } => "GreetingFinished",
            CardEvent::GreetingSuperseded { .. } => "GreetingSuperseded",
            CardEvent::BackgroundResumed { .. } => "BackgroundResumed",
            CardEvent::FadeCompleted { .. } => "FadeCompleted",
            CardEvent::PlaybackError { .. } => "PlaybackError",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel: publishing never blocks, slow
/// subscribers observe `Lagged` instead of stalling producers, and
/// subscribers only see events emitted after they subscribed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CardEvent,
    ) -> Result<usize, broadcast::error::SendError<CardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the case where no subscriber is listening
    pub fn emit_lossy(&self, event: CardEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!("No subscribers for {}", e.0.event_type());
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
