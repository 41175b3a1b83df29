//! Controller-facing state types

use gcard_common::events::PlaybackPhase;
use gcard_common::MessageId;
use serde::{Deserialize, Serialize};

/// Element of the card a pointer activation landed on
///
/// Only `Container` counts as a background-area activation; activations on
/// child elements must not bubble up to the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerTarget {
    /// The card background itself
    Container,
    Portrait,
    Caption,
    Title,
    /// The greeting text shown while a greeting plays
    Message,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub phase: PlaybackPhase,
    /// Set exactly when a greeting is active
    pub active_message_id: Option<MessageId>,
    /// Generation of the latest greeting (0 = none yet)
    pub generation: u64,
    pub background_volume: f32,
    pub background_paused: bool,
    pub greeting_volume: Option<f32>,
    pub greeting_paused: Option<bool>,
}
