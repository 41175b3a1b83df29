//! Audio decoder using symphonia
//!
//! Decodes a whole file (MP3, FLAC, AAC, Vorbis, WAV) to interleaved
//! stereo f32 samples at the source sample rate.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded file contents before resampling
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved stereo samples
    pub samples: Vec<f32>,
    /// Source sample rate
    pub sample_rate: u32,
    /// Channel count of the source (before stereo normalisation)
    pub source_channels: usize,
}

pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode entire audio file to stereo PCM
    ///
    /// Mono is duplicated to both channels; sources with more than two
    /// channels keep the first two.
    pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
        debug!("Decoding {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut source_channels = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => {
                    warn!("Error reading packet from {}: {}", path.display(), e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decode failed: {}", e))),
            };

            let spec = *decoded.spec();
            source_channels = spec.channels.count();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            append_as_stereo(buffer.samples(), source_channels, &mut samples);
        }

        debug!(
            "Decoded {} frames at {}Hz from {}",
            samples.len() / 2,
            sample_rate,
            path.display()
        );

        Ok(DecodedAudio {
            samples,
            sample_rate,
            source_channels,
        })
    }
}

/// Append interleaved samples with `channels` channels as stereo
pub(crate) fn append_as_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            output.reserve(input.len() * 2);
            for &sample in input {
                output.push(sample);
                output.push(sample);
            }
        }
        2 => output.extend_from_slice(input),
        n => {
            output.reserve(input.len() / n * 2);
            for frame in input.chunks_exact(n) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_duplicated() {
        let mut out = Vec::new();
        append_as_stereo(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_surround_keeps_front_pair() {
        let mut out = vec![0.9, 0.9];
        append_as_stereo(&[0.1, 0.2, 0.5, 0.6, 0.3, 0.4, 0.7, 0.8], 4, &mut out);
        assert_eq!(out, vec![0.9, 0.9, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let result = SimpleDecoder::decode_file(Path::new("/nonexistent/greeting1.mp3"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
