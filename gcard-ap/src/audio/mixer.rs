//! In-process mixer
//!
//! Sums every playing voice into the output buffer. A voice is one track's
//! playback cursor over a shared decoded buffer. Voice state lives in
//! atomics so the controller thread and the audio thread never block each
//! other; the voice list itself sits behind a mutex that is only held for
//! one render call or one insertion.

use gcard_common::MessageId;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

use crate::audio::assets::AssetCache;
use crate::audio::track::{EndSignal, Track, TrackFactory};
use crate::audio::types::{AudioFrame, TrackBuffer};
use crate::{Error, Result};

/// Playback cursor over a decoded buffer
pub struct Voice {
    name: String,
    buffer: Arc<TrackBuffer>,
    looping: bool,
    /// Next frame to render
    position: AtomicUsize,
    /// f32 bits
    volume: AtomicU32,
    paused: AtomicBool,
    /// Owning track dropped; mixer removes the voice on next render
    released: AtomicBool,
    ended: AtomicBool,
    end_signal: Option<EndSignal>,
}

impl Voice {
    pub fn new(
        name: impl Into<String>,
        buffer: Arc<TrackBuffer>,
        looping: bool,
        end_signal: Option<EndSignal>,
    ) -> Self {
        Self {
            name: name.into(),
            buffer,
            looping,
            position: AtomicUsize::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
            paused: AtomicBool::new(true),
            released: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            end_signal,
        }
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Mix this voice into `out` (interleaved, `channels` per frame)
    fn render_into(&self, out: &mut [f32], channels: usize) {
        if self.paused.load(Ordering::Acquire) {
            return;
        }

        let len = self.buffer.frame_count;
        if len == 0 {
            // Missing asset: a looping voice stays silent, a one-shot ends at once
            if !self.looping {
                self.finish();
            }
            return;
        }

        let volume = self.volume();
        let start = self.position();
        let mut pos = start;

        for frame in out.chunks_mut(channels) {
            if pos >= len {
                if self.looping {
                    pos = 0;
                } else {
                    break;
                }
            }

            let mut sample = self.buffer.get_frame(pos).unwrap_or_else(AudioFrame::zero);
            sample.apply_volume(volume);
            if channels == 1 {
                frame[0] += (sample.left + sample.right) * 0.5;
            } else {
                frame[0] += sample.left;
                frame[1] += sample.right;
            }
            pos += 1;
        }

        // A rewind from the controller wins over the rendered position
        let _ = self
            .position
            .compare_exchange(start, pos, Ordering::AcqRel, Ordering::Acquire);

        if !self.looping && pos >= len {
            self.finish();
        }
    }

    fn finish(&self) {
        self.paused.store(true, Ordering::Release);
        if !self.ended.swap(true, Ordering::AcqRel) {
            trace!("Voice '{}' reached end of buffer", self.name);
            if let Some(signal) = &self.end_signal {
                signal.fire();
            }
        }
    }
}

/// Sums voices into output buffers
pub struct Mixer {
    voices: Mutex<Vec<Arc<Voice>>>,
    sample_rate: u32,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            voices: Mutex::new(Vec::new()),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn add_voice(&self, voice: Arc<Voice>) {
        let mut voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
        voices.push(voice);
    }

    pub fn voice_count(&self) -> usize {
        self.voices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fill `out` with the mix of all playing voices
    ///
    /// `out` is interleaved with `channels` samples per frame; stereo
    /// sources are folded to mono on single-channel devices and extra
    /// device channels stay silent.
    pub fn render(&self, out: &mut [f32], channels: usize) {
        out.fill(0.0);
        if channels == 0 {
            return;
        }

        let mut voices = self.voices.lock().unwrap_or_else(PoisonError::into_inner);
        voices.retain(|voice| !voice.released.load(Ordering::Acquire));

        for voice in voices.iter() {
            voice.render_into(out, channels);
        }
        drop(voices);

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}

/// Track backed by a mixer voice
pub struct MixerTrack {
    voice: Arc<Voice>,
}

impl MixerTrack {
    /// Register a new voice with the mixer and wrap it
    pub fn attach(mixer: &Mixer, voice: Voice) -> Self {
        let voice = Arc::new(voice);
        mixer.add_voice(Arc::clone(&voice));
        Self { voice }
    }

    /// Playback position in frames
    pub fn position(&self) -> usize {
        self.voice.position()
    }
}

impl Track for MixerTrack {
    fn name(&self) -> &str {
        &self.voice.name
    }

    fn volume(&self) -> f32 {
        self.voice.volume()
    }

    fn set_volume(&self, volume: f32) {
        self.voice
            .volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    fn is_paused(&self) -> bool {
        self.voice.paused.load(Ordering::Acquire)
    }

    fn play(&self) -> Result<()> {
        if self.voice.released.load(Ordering::Acquire) {
            return Err(Error::Playback(format!(
                "track '{}' was released",
                self.voice.name
            )));
        }
        self.voice.paused.store(false, Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.voice.paused.store(true, Ordering::Release);
    }

    fn rewind(&self) {
        self.voice.position.store(0, Ordering::Release);
    }
}

impl Drop for MixerTrack {
    fn drop(&mut self) {
        self.voice.paused.store(true, Ordering::Release);
        self.voice.released.store(true, Ordering::Release);
    }
}

/// TrackFactory producing mixer voices over preloaded assets
pub struct MixerTrackFactory {
    mixer: Arc<Mixer>,
    assets: Arc<AssetCache>,
}

impl MixerTrackFactory {
    pub fn new(mixer: Arc<Mixer>, assets: Arc<AssetCache>) -> Self {
        Self { mixer, assets }
    }
}

impl TrackFactory for MixerTrackFactory {
    fn background(&self) -> Result<Arc<dyn Track>> {
        let voice = Voice::new("background", self.assets.background(), true, None);
        let track: Arc<dyn Track> = Arc::new(MixerTrack::attach(&self.mixer, voice));
        Ok(track)
    }

    fn greeting(&self, id: MessageId, on_end: EndSignal) -> Result<Arc<dyn Track>> {
        let buffer = self
            .assets
            .greeting(id)
            .ok_or_else(|| Error::NotFound(format!("no greeting audio for portrait {}", id)))?;

        debug!(
            "Opening greeting {} ({}ms, generation {})",
            id,
            buffer.duration_ms(),
            on_end.generation()
        );

        let voice = Voice::new(format!("greeting{}", id), buffer, false, Some(on_end));
        let track: Arc<dyn Track> = Arc::new(MixerTrack::attach(&self.mixer, voice));
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn buffer(frames: usize, value: f32) -> Arc<TrackBuffer> {
        Arc::new(TrackBuffer::new(vec![value; frames * 2], 1000))
    }

    #[test]
    fn test_paused_voice_is_silent() {
        let mixer = Mixer::new(1000);
        let _track = MixerTrack::attach(&mixer, Voice::new("bg", buffer(8, 0.5), true, None));

        let mut out = vec![1.0; 8];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_volume_scales_output() {
        let mixer = Mixer::new(1000);
        let track = MixerTrack::attach(&mixer, Voice::new("bg", buffer(8, 0.5), true, None));
        track.set_volume(0.5);
        track.play().unwrap();

        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
        assert_eq!(track.position(), 4);
    }

    #[test]
    fn test_looping_voice_wraps() {
        let mixer = Mixer::new(1000);
        let track = MixerTrack::attach(&mixer, Voice::new("bg", buffer(3, 0.5), true, None));
        track.play().unwrap();

        let mut out = vec![0.0; 10];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.5));
        assert_eq!(track.position(), 2);
        assert!(!track.is_paused());
    }

    #[tokio::test]
    async fn test_one_shot_voice_fires_end_signal_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mixer = Mixer::new(1000);
        let track = MixerTrack::attach(
            &mixer,
            Voice::new("greeting1", buffer(3, 0.5), false, Some(EndSignal::new(4, tx))),
        );
        track.play().unwrap();

        let mut out = vec![0.0; 10];
        mixer.render(&mut out, 2);
        assert_eq!(&out[..6], &[0.5; 6]);
        assert_eq!(&out[6..], &[0.0; 4]);
        assert!(track.is_paused());
        assert_eq!(rx.recv().await, Some(4));

        mixer.render(&mut out, 2);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_mix_is_summed_and_clamped() {
        let mixer = Mixer::new(1000);
        let a = MixerTrack::attach(&mixer, Voice::new("a", buffer(4, 0.7), true, None));
        let b = MixerTrack::attach(&mixer, Voice::new("b", buffer(4, 0.7), true, None));
        a.play().unwrap();
        b.play().unwrap();

        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 2);
        assert!(out.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_mono_device_folds_channels() {
        let mixer = Mixer::new(1000);
        let samples = vec![0.2, 0.4, 0.2, 0.4];
        let voice = Voice::new("bg", Arc::new(TrackBuffer::new(samples, 1000)), true, None);
        let track = MixerTrack::attach(&mixer, voice);
        track.play().unwrap();

        let mut out = vec![0.0; 2];
        mixer.render(&mut out, 1);
        assert!(out.iter().all(|&s| (s - 0.3).abs() < 1e-6));
    }

    #[test]
    fn test_dropped_track_is_removed() {
        let mixer = Mixer::new(1000);
        let track = MixerTrack::attach(&mixer, Voice::new("g", buffer(4, 0.5), false, None));
        track.play().unwrap();
        assert_eq!(mixer.voice_count(), 1);

        drop(track);
        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 2);
        assert_eq!(mixer.voice_count(), 0);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rewind_restarts_from_first_frame() {
        let mixer = Mixer::new(1000);
        let track = MixerTrack::attach(&mixer, Voice::new("bg", buffer(10, 0.5), true, None));
        track.play().unwrap();

        let mut out = vec![0.0; 8];
        mixer.render(&mut out, 2);
        assert_eq!(track.position(), 4);

        track.rewind();
        assert_eq!(track.position(), 0);
    }
}
