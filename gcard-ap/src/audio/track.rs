//! Track abstraction
//!
//! A track is a playable audio resource with a mutable volume and a
//! paused/playing flag. The PlaybackController only talks to tracks through
//! the `Track` trait; the mixer backend and the in-memory track implement it.

use gcard_common::MessageId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

use crate::Result;

/// Playable audio resource
///
/// All methods take `&self`; implementations use interior mutability so a
/// track can be shared between the controller and a running fade.
pub trait Track: Send + Sync {
    /// Human readable name for logs
    fn name(&self) -> &str;

    /// Current volume (0.0-1.0)
    fn volume(&self) -> f32;

    /// Set volume, clamped to 0.0-1.0
    fn set_volume(&self, volume: f32);

    fn is_paused(&self) -> bool;

    /// Start or resume playback from the current position
    ///
    /// May be rejected by the platform (no device, autoplay policy).
    fn play(&self) -> Result<()>;

    fn pause(&self);

    /// Move the playback position back to the start
    fn rewind(&self);
}

/// Creates the tracks the controller plays
pub trait TrackFactory: Send + Sync {
    /// Open the looping background track
    fn background(&self) -> Result<Arc<dyn Track>>;

    /// Open the greeting track for a portrait
    ///
    /// The track must call `on_end.fire()` once when it plays to its end.
    fn greeting(&self, id: MessageId, on_end: EndSignal) -> Result<Arc<dyn Track>>;
}

/// Completion notification for one greeting track
///
/// Carries the generation the controller assigned to the greeting, so a
/// signal from a superseded greeting can be recognised and ignored.
#[derive(Debug, Clone)]
pub struct EndSignal {
    generation: u64,
    tx: mpsc::UnboundedSender<u64>,
}

impl EndSignal {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<u64>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report end of track. Never blocks; safe from the audio thread.
    pub fn fire(&self) {
        if self.tx.send(self.generation).is_err() {
            trace!("End signal {} dropped: card runtime stopped", self.generation);
        }
    }
}

/// Track without audio output
///
/// Holds volume and paused state in memory. Used when driving the
/// controller without a mixer, and in tests.
pub struct MemoryTrack {
    name: String,
    state: Mutex<MemoryTrackState>,
}

#[derive(Debug)]
struct MemoryTrackState {
    volume: f32,
    paused: bool,
    reject_next_play: bool,
    play_count: usize,
    rewind_count: usize,
}

impl MemoryTrack {
    /// New track, paused at full volume (like a freshly created media element)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MemoryTrackState {
                volume: 1.0,
                paused: true,
                reject_next_play: false,
                play_count: 0,
                rewind_count: 0,
            }),
        }
    }

    /// Make the next `play()` fail, as a browser blocking autoplay would
    pub fn reject_next_play(&self) {
        self.lock().reject_next_play = true;
    }

    /// Number of successful `play()` calls
    pub fn play_count(&self) -> usize {
        self.lock().play_count
    }

    pub fn rewind_count(&self) -> usize {
        self.lock().rewind_count
    }

    fn lock(&self) -> MutexGuard<'_, MemoryTrackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Track for MemoryTrack {
    fn name(&self) -> &str {
        &self.name
    }

    fn volume(&self) -> f32 {
        self.lock().volume
    }

    fn set_volume(&self, volume: f32) {
        self.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn play(&self) -> Result<()> {
        let mut state = self.lock();
        if state.reject_next_play {
            state.reject_next_play = false;
            return Err(crate::Error::Playback(format!(
                "play() rejected for {}",
                self.name
            )));
        }
        state.paused = false;
        state.play_count += 1;
        Ok(())
    }

    fn pause(&self) {
        self.lock().paused = true;
    }

    fn rewind(&self) {
        self.lock().rewind_count += 1;
    }
}
