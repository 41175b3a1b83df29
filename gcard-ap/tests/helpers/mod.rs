//! Shared test fixtures for gcard-ap integration tests

#![allow(dead_code)]

use gcard_ap::audio::{EndSignal, MemoryTrack, Track, TrackFactory};
use gcard_ap::config::ControllerSettings;
use gcard_ap::playback::{runtime, CardHandle};
use gcard_ap::{Error, Result};
use gcard_common::events::{CardEvent, EventBus};
use gcard_common::MessageId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One greeting handed out by the factory
#[derive(Clone)]
pub struct OpenedGreeting {
    pub id: MessageId,
    pub track: Arc<MemoryTrack>,
    pub signal: EndSignal,
}

/// TrackFactory over memory tracks with scriptable failures
///
/// Keeps every greeting it opens so tests can inspect the track and fire
/// its end signal by hand.
pub struct ScriptedFactory {
    background: Arc<MemoryTrack>,
    opened: Mutex<Vec<OpenedGreeting>>,
    unopenable: Mutex<HashSet<MessageId>>,
    unplayable: Mutex<HashSet<MessageId>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            background: Arc::new(MemoryTrack::new("background")),
            opened: Mutex::new(Vec::new()),
            unopenable: Mutex::new(HashSet::new()),
            unplayable: Mutex::new(HashSet::new()),
        })
    }

    pub fn background_track(&self) -> Arc<MemoryTrack> {
        Arc::clone(&self.background)
    }

    /// Opening this greeting fails with NotFound
    pub fn fail_to_open(&self, id: u32) {
        self.unopenable.lock().unwrap().insert(MessageId(id));
    }

    /// This greeting opens but its first play() is rejected
    pub fn reject_play(&self, id: u32) {
        self.unplayable.lock().unwrap().insert(MessageId(id));
    }

    /// Greetings opened so far, oldest first
    pub fn opened(&self) -> Vec<OpenedGreeting> {
        self.opened.lock().unwrap().clone()
    }

    pub fn greeting(&self, index: usize) -> OpenedGreeting {
        self.opened()[index].clone()
    }

    /// Simulate the greeting at `index` playing to its end
    pub fn end_greeting(&self, index: usize) {
        let greeting = self.greeting(index);
        greeting.track.pause();
        greeting.signal.fire();
    }
}

impl TrackFactory for ScriptedFactory {
    fn background(&self) -> Result<Arc<dyn Track>> {
        let track: Arc<dyn Track> = self.background.clone();
        Ok(track)
    }

    fn greeting(&self, id: MessageId, on_end: EndSignal) -> Result<Arc<dyn Track>> {
        if self.unopenable.lock().unwrap().contains(&id) {
            return Err(Error::NotFound(format!("greeting{}.mp3", id)));
        }

        let track = Arc::new(MemoryTrack::new(format!("greeting{}", id)));
        if self.unplayable.lock().unwrap().contains(&id) {
            track.reject_next_play();
        }

        self.opened.lock().unwrap().push(OpenedGreeting {
            id,
            track: Arc::clone(&track),
            signal: on_end,
        });

        let track: Arc<dyn Track> = track;
        Ok(track)
    }
}

/// Running card: runtime task plus an event subscription taken before start
pub struct TestCard {
    pub handle: CardHandle,
    pub events: EventBus,
    pub rx: broadcast::Receiver<CardEvent>,
    pub task: JoinHandle<()>,
}

impl TestCard {
    pub fn start(factory: Arc<ScriptedFactory>) -> Self {
        Self::start_with(factory, ControllerSettings::default())
    }

    pub fn start_with(factory: Arc<ScriptedFactory>, settings: ControllerSettings) -> Self {
        let events = EventBus::new(100);
        let rx = events.subscribe();
        let (handle, task) = runtime::spawn(factory, events.clone(), settings).unwrap();
        Self {
            handle,
            events,
            rx,
            task,
        }
    }

    /// Events received so far, by type name
    pub fn drain_event_types(&mut self) -> Vec<&'static str> {
        let mut types = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            types.push(event.event_type());
        }
        types
    }

    /// All events received so far
    pub fn drain_events(&mut self) -> Vec<CardEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Settings with the background left paused at startup
pub fn paused_settings() -> ControllerSettings {
    ControllerSettings {
        autoplay: false,
        ..ControllerSettings::default()
    }
}

/// Slightly longer than one default fade
pub const AFTER_FADE: Duration = Duration::from_millis(1100);
