//! PlaybackController
//!
//! Owns the background track, the active greeting, and the background
//! fader. All methods run on the card runtime task, so state is never
//! touched concurrently; interleaving between user commands and greeting
//! end signals is handled by checking the greeting generation.
//!
//! State machine:
//! - Idle --image--> GreetingPlaying --end--> Idle
//! - PausedIdle --container click--> Idle
//! - PausedIdle --image--> GreetingPlaying --end--> Idle

use gcard_common::events::{CardEvent, EventBus, PlaybackPhase, TrackRole};
use gcard_common::MessageId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::audio::track::{EndSignal, Track, TrackFactory};
use crate::config::ControllerSettings;
use crate::playback::fade::Fader;
use crate::playback::state::{ControllerSnapshot, PointerTarget};
use crate::Result;

/// The greeting currently playing
struct ActiveGreeting {
    message_id: MessageId,
    track: Arc<dyn Track>,
    generation: u64,
}

pub struct PlaybackController {
    factory: Arc<dyn TrackFactory>,
    events: EventBus,
    settings: ControllerSettings,
    background: Arc<dyn Track>,
    background_fader: Fader,
    active_greeting: Option<ActiveGreeting>,
    greeting_generation: u64,
    ended_tx: mpsc::UnboundedSender<u64>,
}

impl PlaybackController {
    /// Open the background track and build the controller
    ///
    /// Greeting end signals are delivered on `ended_tx` and must be fed back
    /// through `on_greeting_ended`.
    pub fn new(
        factory: Arc<dyn TrackFactory>,
        events: EventBus,
        settings: ControllerSettings,
        ended_tx: mpsc::UnboundedSender<u64>,
    ) -> Result<Self> {
        let background = factory.background()?;
        let background_fader = Fader::new(TrackRole::Background, events.clone());

        Ok(Self {
            factory,
            events,
            settings,
            background,
            background_fader,
            active_greeting: None,
            greeting_generation: 0,
            ended_tx,
        })
    }

    /// Start the background at full volume, if autoplay is allowed
    ///
    /// A rejected autoplay is logged and leaves the card in PausedIdle until
    /// the first user gesture.
    pub fn start(&mut self) {
        self.background.set_volume(1.0);

        if !self.settings.autoplay {
            info!("Autoplay disabled, background waits for first activation");
            return;
        }

        match self.background.play() {
            Ok(()) => info!("Background '{}' started", self.background.name()),
            Err(e) => {
                warn!("Background autoplay rejected, waiting for a user gesture: {}", e);
                self.report_error(TrackRole::Background, &e);
            }
        }
    }

    /// Portrait activation: fade the background out and play the greeting
    ///
    /// Any greeting still playing is stopped and its end signal becomes
    /// stale. Fails without touching state if the greeting cannot be opened.
    pub fn on_image_activated(&mut self, id: MessageId) -> Result<()> {
        let generation = self.greeting_generation + 1;
        let signal = EndSignal::new(generation, self.ended_tx.clone());

        let track = match self.factory.greeting(id, signal) {
            Ok(track) => track,
            Err(e) => {
                error!("Failed to open greeting {}: {}", id, e);
                self.report_error(TrackRole::Greeting, &e);
                return Err(e);
            }
        };
        self.greeting_generation = generation;

        if let Some(previous) = self.active_greeting.take() {
            previous.track.pause();
            info!(
                "Greeting {} superseded by {} before it finished",
                previous.message_id, id
            );
            self.events.emit_lossy(CardEvent::GreetingSuperseded {
                message_id: previous.message_id,
                replaced_by: id,
                timestamp: chrono::Utc::now(),
            });
        }

        info!("Portrait {} activated, playing greeting '{}'", id, track.name());

        self.background_fader.fade(
            Arc::clone(&self.background),
            0.0,
            self.settings.fade_duration,
        );

        track.set_volume(1.0);
        self.active_greeting = Some(ActiveGreeting {
            message_id: id,
            track: Arc::clone(&track),
            generation,
        });
        self.events.emit_lossy(CardEvent::GreetingStarted {
            message_id: id,
            timestamp: chrono::Utc::now(),
        });

        if let Err(e) = track.play() {
            // Nothing will ever end this greeting; bring the background back now
            warn!("Greeting {} failed to play: {}", id, e);
            self.report_error(TrackRole::Greeting, &e);
            self.finish_greeting();
        }

        Ok(())
    }

    /// Greeting end signal
    ///
    /// Returns true if the signal belonged to the active greeting and the
    /// background was restored; stale signals are ignored.
    pub fn on_greeting_ended(&mut self, generation: u64) -> bool {
        match &self.active_greeting {
            Some(active) if active.generation == generation => {
                self.finish_greeting();
                true
            }
            Some(active) => {
                debug!(
                    "Ignoring end signal {} (active greeting is generation {})",
                    generation, active.generation
                );
                false
            }
            None => {
                debug!("Ignoring end signal {} (no active greeting)", generation);
                false
            }
        }
    }

    /// Background-area activation
    ///
    /// Resumes a paused background when the activation landed on the
    /// container itself and no greeting is playing. Returns whether the
    /// background was resumed.
    pub fn on_background_area_activated(&mut self, target: PointerTarget) -> bool {
        if target != PointerTarget::Container {
            trace!("Activation on {:?} does not reach the container", target);
            return false;
        }

        if let Some(active) = &self.active_greeting {
            debug!(
                "Container activation ignored while greeting {} plays",
                active.message_id
            );
            return false;
        }

        if !self.background.is_paused() {
            return false;
        }

        self.resume_background()
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.active_greeting.is_some() {
            PlaybackPhase::GreetingPlaying
        } else if self.background.is_paused() {
            PlaybackPhase::PausedIdle
        } else {
            PlaybackPhase::Idle
        }
    }

    pub fn active_message_id(&self) -> Option<MessageId> {
        self.active_greeting.as_ref().map(|g| g.message_id)
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let greeting = self.active_greeting.as_ref();
        ControllerSnapshot {
            phase: self.phase(),
            active_message_id: self.active_message_id(),
            generation: self.greeting_generation,
            background_volume: self.background.volume(),
            background_paused: self.background.is_paused(),
            greeting_volume: greeting.map(|g| g.track.volume()),
            greeting_paused: greeting.map(|g| g.track.is_paused()),
        }
    }

    fn finish_greeting(&mut self) {
        let Some(finished) = self.active_greeting.take() else {
            return;
        };

        info!("Greeting {} finished, restoring background", finished.message_id);
        self.events.emit_lossy(CardEvent::GreetingFinished {
            message_id: finished.message_id,
            timestamp: chrono::Utc::now(),
        });

        self.background.rewind();
        self.resume_background();
    }

    /// Play the background and fade it to full volume
    fn resume_background(&mut self) -> bool {
        let resumed = match self.background.play() {
            Ok(()) => {
                self.events.emit_lossy(CardEvent::BackgroundResumed {
                    timestamp: chrono::Utc::now(),
                });
                true
            }
            Err(e) => {
                warn!("Background failed to resume: {}", e);
                self.report_error(TrackRole::Background, &e);
                false
            }
        };

        self.background_fader.fade(
            Arc::clone(&self.background),
            1.0,
            self.settings.fade_duration,
        );
        resumed
    }

    fn report_error(&self, track: TrackRole, error: &crate::Error) {
        self.events.emit_lossy(CardEvent::PlaybackError {
            track,
            message: error.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
