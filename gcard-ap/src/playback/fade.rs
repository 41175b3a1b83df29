//! Volume fades
//!
//! A fade is a fixed-step linear volume ramp driven by a 50 ms interval:
//! - steps = ceil(duration / 50 ms)
//! - each tick moves the volume by (target - start) / steps, clamped to 0.0-1.0
//! - the final tick snaps exactly to the target and pauses the track if the
//!   target is silence
//!
//! Each track slot owns one `Fader`. Starting a fade cancels the one already
//! running on that slot. Cancellation bumps a token under the same lock the
//! fade task holds while it writes the volume, so once `fade()` or `cancel()`
//! returns no stale tick can touch the track.

use gcard_common::events::{CardEvent, EventBus, TrackRole};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, trace};

use crate::audio::track::Track;

/// Fixed fade tick
pub const FADE_TICK: Duration = Duration::from_millis(50);

/// Precomputed ramp for one fade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePlan {
    /// Volume reached on the final tick (clamped to 0.0-1.0)
    pub target: f32,

    /// Number of ticks; 0 means apply immediately
    pub steps: u32,

    /// Volume change per tick
    pub step: f32,
}

impl FadePlan {
    pub fn new(current: f32, target: f32, duration: Duration) -> Self {
        let target = target.clamp(0.0, 1.0);
        let steps = Self::steps_for(duration);
        let step = if steps == 0 {
            0.0
        } else {
            (target - current) / steps as f32
        };
        Self { target, steps, step }
    }

    /// Tick count for a duration, rounding partial ticks up
    pub fn steps_for(duration: Duration) -> u32 {
        let tick = FADE_TICK.as_micros();
        let steps = duration.as_micros().div_ceil(tick);
        u32::try_from(steps).unwrap_or(u32::MAX)
    }

    /// Whether the track is paused once the fade completes
    pub fn pauses_at_end(&self) -> bool {
        self.target == 0.0
    }
}

/// Cancel-and-replace fade runner for one track slot
pub struct Fader {
    role: TrackRole,
    events: EventBus,
    /// Token of the fade allowed to write; bumped on every start/cancel
    token: Arc<Mutex<u64>>,
    task: Option<JoinHandle<()>>,
}

impl Fader {
    pub fn new(role: TrackRole, events: EventBus) -> Self {
        Self {
            role,
            events,
            token: Arc::new(Mutex::new(0)),
            task: None,
        }
    }

    /// Ramp `track` to `target` over `duration`
    ///
    /// Returns immediately; the ramp runs on its own task. Must be called
    /// from within a tokio runtime.
    pub fn fade(&mut self, track: Arc<dyn Track>, target: f32, duration: Duration) {
        let token = self.cancel();
        let plan = FadePlan::new(track.volume(), target, duration);

        debug!(
            "Fading {} ({}) {:.2} -> {:.2} over {:?} ({} steps)",
            self.role,
            track.name(),
            track.volume(),
            plan.target,
            duration,
            plan.steps
        );

        if plan.steps == 0 {
            complete(track.as_ref(), &plan, self.role, &self.events);
            return;
        }

        let shared = Arc::clone(&self.token);
        let role = self.role;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            run_fade(track, plan, token, shared, role, events).await;
        }));
    }

    /// Stop the running fade, leaving the volume where it is
    ///
    /// Returns the new token.
    pub fn cancel(&mut self) -> u64 {
        let token = {
            let mut current = self.token.lock().unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            *current
        };
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                trace!("Cancelled running {} fade", self.role);
            }
            task.abort();
        }
        token
    }

    /// Whether a fade task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Fader {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_fade(
    track: Arc<dyn Track>,
    plan: FadePlan,
    token: u64,
    current: Arc<Mutex<u64>>,
    role: TrackRole,
    events: EventBus,
) {
    let mut tick = interval_at(Instant::now() + FADE_TICK, FADE_TICK);

    for step in 1..=plan.steps {
        tick.tick().await;

        let guard = current.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard != token {
            return;
        }

        if step == plan.steps {
            complete(track.as_ref(), &plan, role, &events);
            return;
        }

        track.set_volume((track.volume() + plan.step).clamp(0.0, 1.0));
        drop(guard);
    }
}

fn complete(track: &dyn Track, plan: &FadePlan, role: TrackRole, events: &EventBus) {
    track.set_volume(plan.target);
    if plan.pauses_at_end() {
        track.pause();
    }

    debug!(
        "Fade of {} ({}) complete at {:.2}{}",
        role,
        track.name(),
        plan.target,
        if plan.pauses_at_end() { ", paused" } else { "" }
    );

    events.emit_lossy(CardEvent::FadeCompleted {
        track: role,
        volume: plan.target,
        paused: track.is_paused(),
        timestamp: chrono::Utc::now(),
    });
}
