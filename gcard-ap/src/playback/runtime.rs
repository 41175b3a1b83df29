//! Card runtime
//!
//! A single task owns the PlaybackController and is the card's event queue.
//! User commands come in through `CardHandle`; greeting end signals come in
//! on a separate channel and are always drained first, so an end signal
//! raised before a later command is handled before that command.

use gcard_common::events::EventBus;
use gcard_common::MessageId;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::audio::track::TrackFactory;
use crate::config::ControllerSettings;
use crate::playback::controller::PlaybackController;
use crate::playback::state::{ControllerSnapshot, PointerTarget};
use crate::{Error, Result};

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Requests handled by the card runtime
#[derive(Debug)]
pub enum Command {
    ActivateImage {
        id: MessageId,
        reply: oneshot::Sender<Result<()>>,
    },
    ActivateBackground {
        target: PointerTarget,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<ControllerSnapshot>,
    },
}

/// Cloneable handle for sending commands to the card runtime
#[derive(Clone)]
pub struct CardHandle {
    tx: mpsc::Sender<Command>,
}

impl CardHandle {
    /// Portrait activation
    pub async fn activate_image(&self, id: MessageId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ActivateImage { id, reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Pointer activation somewhere on the card; returns whether the
    /// background resumed
    pub async fn activate_background(&self, target: PointerTarget) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ActivateBackground { target, reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }
}

fn stopped() -> Error {
    Error::InvalidState("card runtime stopped".to_string())
}

/// Build the controller, start the background, and spawn the runtime task
///
/// The task ends when every `CardHandle` has been dropped.
pub fn spawn(
    factory: Arc<dyn TrackFactory>,
    events: EventBus,
    settings: ControllerSettings,
) -> Result<(CardHandle, JoinHandle<()>)> {
    let (ended_tx, ended_rx) = mpsc::unbounded_channel();
    let mut controller = PlaybackController::new(factory, events, settings, ended_tx)?;
    controller.start();

    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let task = tokio::spawn(run(controller, rx, ended_rx));

    Ok((CardHandle { tx }, task))
}

async fn run(
    mut controller: PlaybackController,
    mut commands: mpsc::Receiver<Command>,
    mut ended: mpsc::UnboundedReceiver<u64>,
) {
    info!("Card runtime started");

    loop {
        tokio::select! {
            biased;

            Some(generation) = ended.recv() => {
                debug!("Greeting end signal {}", generation);
                controller.on_greeting_ended(generation);
            }

            command = commands.recv() => match command {
                Some(command) => handle(&mut controller, command),
                None => break,
            },
        }
    }

    info!("Card runtime stopped");
}

fn handle(controller: &mut PlaybackController, command: Command) {
    match command {
        Command::ActivateImage { id, reply } => {
            let _ = reply.send(controller.on_image_activated(id));
        }
        Command::ActivateBackground { target, reply } => {
            let _ = reply.send(controller.on_background_area_activated(target));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(controller.snapshot());
        }
    }
}
