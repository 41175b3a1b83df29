//! Decode, asset loading and mixer tests against real WAV files
//!
//! Files are synthesised with hound into a temporary assets root.

use gcard_ap::audio::{
    AssetCache, EndSignal, HeadlessOutput, Mixer, MixerTrackFactory, SimpleDecoder, Track,
    TrackFactory,
};
use gcard_ap::config::ControllerSettings;
use gcard_ap::playback::runtime;
use gcard_ap::Error;
use gcard_common::config::CardConfig;
use gcard_common::events::{EventBus, PlaybackPhase};
use gcard_common::MessageId;
use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn write_sine(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let frames = (sample_rate as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn test_card() -> CardConfig {
    CardConfig {
        background: "background.wav".to_string(),
        greeting_template: "greeting{id}.wav".to_string(),
        ..CardConfig::default()
    }
}

#[test]
fn test_decode_mono_wav_to_stereo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("greeting1.wav");
    write_sine(&path, 22050, 1, 0.25);

    let decoded = SimpleDecoder::decode_file(&path).unwrap();
    assert_eq!(decoded.sample_rate, 22050);
    assert_eq!(decoded.source_channels, 1);

    let frames = decoded.samples.len() / 2;
    assert!((5400..=5600).contains(&frames), "got {} frames", frames);

    // Mono duplicated into both channels
    for frame in decoded.samples.chunks_exact(2).take(100) {
        assert_eq!(frame[0], frame[1]);
    }
    assert!(decoded.samples.iter().any(|&s| s.abs() > 0.3));
}

#[test]
fn test_decode_garbage_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"definitely not audio").unwrap();

    assert!(matches!(
        SimpleDecoder::decode_file(&path),
        Err(Error::Decode(_))
    ));
}

#[test]
fn test_asset_cache_resamples_and_skips_missing() {
    let dir = TempDir::new().unwrap();
    write_sine(&dir.path().join("background.wav"), 44100, 2, 1.0);
    write_sine(&dir.path().join("greeting1.wav"), 22050, 1, 0.5);
    // greeting2.wav deliberately absent

    let cache = AssetCache::load(dir.path(), &test_card(), 44100);

    let background = cache.background();
    assert_eq!(background.sample_rate, 44100);
    assert!((950..=1050).contains(&background.duration_ms()));

    let greeting = cache.greeting(MessageId(1)).unwrap();
    assert_eq!(greeting.sample_rate, 44100);
    assert!(
        (400..=600).contains(&greeting.duration_ms()),
        "got {}ms",
        greeting.duration_ms()
    );

    assert!(cache.greeting(MessageId(2)).is_none());
    assert_eq!(cache.greeting_count(), 1);
}

#[tokio::test]
async fn test_mixer_factory_plays_greeting_to_end() {
    let dir = TempDir::new().unwrap();
    write_sine(&dir.path().join("greeting1.wav"), 8000, 1, 0.1);

    let cache = AssetCache::load_async(dir.path().to_path_buf(), test_card(), 8000)
        .await
        .unwrap();
    assert!(cache.background().is_empty());

    let mixer = Arc::new(Mixer::new(8000));
    let factory = MixerTrackFactory::new(Arc::clone(&mixer), Arc::new(cache));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let background = factory.background().unwrap();
    background.play().unwrap();

    let missing = factory.greeting(MessageId(2), EndSignal::new(1, tx.clone()));
    assert!(matches!(missing, Err(Error::NotFound(_))));

    let greeting = factory.greeting(MessageId(1), EndSignal::new(2, tx)).unwrap();
    greeting.set_volume(1.0);
    greeting.play().unwrap();
    assert_eq!(mixer.voice_count(), 2);

    // 0.1s at 8kHz is 800 frames; render 1000
    let mut out = vec![0.0f32; 2000];
    mixer.render(&mut out, 2);

    assert!(out[..1000].iter().any(|&s| s.abs() > 0.3));
    assert!(out[1800..].iter().all(|&s| s == 0.0));
    assert!(greeting.is_paused());
    assert_eq!(rx.recv().await, Some(2));

    // Silent looping background never ends
    assert!(!background.is_paused());

    drop(greeting);
    mixer.render(&mut out, 2);
    assert_eq!(mixer.voice_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_greeting_on_headless_mixer() {
    let dir = TempDir::new().unwrap();
    write_sine(&dir.path().join("background.wav"), 1000, 2, 1.0);
    write_sine(&dir.path().join("greeting1.wav"), 1000, 1, 0.5);
    write_sine(&dir.path().join("greeting2.wav"), 1000, 1, 0.3);

    let cache = AssetCache::load(dir.path(), &test_card(), 1000);
    assert_eq!(cache.greeting_count(), 2);

    let mixer = Arc::new(Mixer::new(1000));
    let factory = Arc::new(MixerTrackFactory::new(Arc::clone(&mixer), Arc::new(cache)));
    let (card, _task) =
        runtime::spawn(factory, EventBus::new(64), ControllerSettings::default()).unwrap();
    let output = HeadlessOutput::spawn(Arc::clone(&mixer));

    card.activate_image(MessageId(1)).await.unwrap();
    card.activate_image(MessageId(2)).await.unwrap();

    // The superseded greeting's voice is dropped on the next render
    sleep(HeadlessOutput::PERIOD * 2).await;
    assert_eq!(mixer.voice_count(), 2);

    let snapshot = card.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, PlaybackPhase::GreetingPlaying);
    assert_eq!(snapshot.active_message_id, Some(MessageId(2)));
    assert_eq!(snapshot.generation, 2);

    // Greeting 2 runs 300ms, then the background fades back in over 1s
    sleep(Duration::from_millis(1500)).await;

    let snapshot = card.snapshot().await.unwrap();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert_eq!(snapshot.active_message_id, None);
    assert_eq!(snapshot.generation, 2);
    assert_eq!(snapshot.background_volume, 1.0);
    assert!(!snapshot.background_paused);

    // Only the background voice is left
    assert_eq!(mixer.voice_count(), 1);

    output.stop();
}
