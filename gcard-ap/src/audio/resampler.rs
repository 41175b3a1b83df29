//! Audio resampling using rubato
//!
//! Converts decoded stereo audio to the output device sample rate.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Standard output sample rate when the device does not dictate one
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

const CHANNELS: usize = 2;

/// Audio resampler using rubato for sample rate conversion
pub struct Resampler;

impl Resampler {
    /// Resample interleaved stereo audio from `input_rate` to `output_rate`
    ///
    /// Returns a copy when the rates already match.
    pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Invalid sample rates: {}Hz -> {}Hz",
                input_rate, output_rate
            )));
        }

        let planar_input = Self::deinterleave(input);
        let input_frames = planar_input[0].len();
        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz",
            input_frames, input_rate, output_rate
        );

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // fixed ratio
            PolynomialDegree::Septic,
            input_frames,
            CHANNELS,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        Ok(Self::interleave(planar_output))
    }

    /// `[L, R, L, R, ...]` -> `[[L, L, ...], [R, R, ...]]`
    fn deinterleave(samples: &[f32]) -> Vec<Vec<f32>> {
        let frames = samples.len() / CHANNELS;
        let mut planar = vec![Vec::with_capacity(frames); CHANNELS];

        for frame in samples.chunks_exact(CHANNELS) {
            for (channel, &sample) in planar.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        planar
    }

    /// `[[L, L, ...], [R, R, ...]]` -> `[L, R, L, R, ...]`
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        if planar.is_empty() {
            return Vec::new();
        }

        let frames = planar[0].len();
        let mut interleaved = Vec::with_capacity(frames * planar.len());

        for frame_idx in 0..frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }
}
