//! Playback control: fades, the controller state machine, and the card runtime

pub mod controller;
pub mod fade;
pub mod runtime;
pub mod state;

pub use controller::PlaybackController;
pub use fade::{FadePlan, Fader, FADE_TICK};
pub use runtime::{CardHandle, Command};
pub use state::{ControllerSnapshot, PointerTarget};
