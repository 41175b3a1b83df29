//! Audio backend
//!
//! Decoded assets are mixed in-process and pushed to a cpal device, or to
//! a headless timer when no device is available.

pub mod assets;
pub mod decoder;
pub mod mixer;
pub mod output;
pub mod resampler;
pub mod track;
pub mod types;

pub use assets::AssetCache;
pub use decoder::{DecodedAudio, SimpleDecoder};
pub use mixer::{Mixer, MixerTrack, MixerTrackFactory, Voice};
pub use output::{AudioOutput, HeadlessOutput, OutputHandle};
pub use resampler::{Resampler, DEFAULT_SAMPLE_RATE};
pub use track::{EndSignal, MemoryTrack, Track, TrackFactory};
pub use types::{AudioFrame, TrackBuffer};
