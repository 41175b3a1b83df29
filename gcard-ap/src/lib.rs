//! # Greeting Card Audio Player Library (gcard-ap)
//!
//! Plays the looping background track of the card, swaps in a personal
//! greeting when a portrait is activated, and crossfades between them.
//!
//! **Architecture:** one card runtime task owns the PlaybackController;
//! volume fades run as 50 ms interval tasks; audio is decoded with
//! symphonia, resampled with rubato, mixed in process and played via cpal.

pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
