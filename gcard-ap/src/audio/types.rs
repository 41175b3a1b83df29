//! Core audio data types
//!
//! Decoded assets are held fully in RAM as interleaved stereo f32 at the
//! output sample rate. Greeting cards use short clips, so there is no
//! streaming decode.

/// Decoded, resampled audio ready for the mixer
///
/// **Format:** f32 samples (-1.0 to 1.0), stereo interleaved `[L, R, L, R, ...]`
#[derive(Debug, Clone)]
pub struct TrackBuffer {
    /// PCM audio samples (interleaved stereo)
    pub samples: Vec<f32>,

    /// Sample rate (the output device rate after resampling)
    pub sample_rate: u32,

    /// Number of stereo frames (samples.len() / 2)
    pub frame_count: usize,
}

impl TrackBuffer {
    /// Create a buffer from interleaved stereo samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let frame_count = samples.len() / 2;
        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    /// Zero-length buffer, used in place of a missing asset
    pub fn silent(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frame_count as u64 * 1000) / self.sample_rate as u64
    }

    /// Get audio frame at specific frame index
    pub fn get_frame(&self, frame_index: usize) -> Option<AudioFrame> {
        let sample_index = frame_index * 2;
        if sample_index + 1 < self.samples.len() {
            Some(AudioFrame {
                left: self.samples[sample_index],
                right: self.samples[sample_index + 1],
            })
        } else {
            None
        }
    }
}

/// Single stereo frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_stereo(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Scale both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }
}
