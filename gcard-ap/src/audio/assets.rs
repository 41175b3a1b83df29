//! Card audio assets
//!
//! Decodes the background loop and every portrait greeting once at startup
//! and keeps them resampled to the output rate. Missing or undecodable
//! files are logged and left out: the background falls back to silence and
//! the affected portrait reports NotFound when activated.

use gcard_common::config::CardConfig;
use gcard_common::MessageId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::decoder::SimpleDecoder;
use crate::audio::resampler::Resampler;
use crate::audio::types::TrackBuffer;
use crate::{Error, Result};

/// Decoded card audio at the output sample rate
#[derive(Debug)]
pub struct AssetCache {
    background: Arc<TrackBuffer>,
    greetings: HashMap<MessageId, Arc<TrackBuffer>>,
    sample_rate: u32,
}

impl AssetCache {
    /// Decode all assets named by `card` under `root` (blocking)
    pub fn load(root: &Path, card: &CardConfig, sample_rate: u32) -> Self {
        let background_path = root.join(&card.background);
        let background = match load_buffer(&background_path, sample_rate) {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(
                    "Background audio unavailable ({}), continuing silently: {}",
                    background_path.display(),
                    e
                );
                TrackBuffer::silent(sample_rate)
            }
        };

        let mut greetings = HashMap::new();
        for id in card.message_ids() {
            let Some(file) = card.greeting_file(id) else {
                continue;
            };
            let path = root.join(&file);
            match load_buffer(&path, sample_rate) {
                Ok(buffer) => {
                    greetings.insert(id, Arc::new(buffer));
                }
                Err(e) => warn!("Greeting {} unavailable ({}): {}", id, path.display(), e),
            }
        }

        info!(
            "Loaded card audio: background {}ms, {} of {} greetings at {}Hz",
            background.duration_ms(),
            greetings.len(),
            card.portraits.len(),
            sample_rate
        );

        Self {
            background: Arc::new(background),
            greetings,
            sample_rate,
        }
    }

    /// Run `load` on the blocking pool
    pub async fn load_async(root: PathBuf, card: CardConfig, sample_rate: u32) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::load(&root, &card, sample_rate))
            .await
            .map_err(|e| Error::Decode(format!("Asset loading task failed: {}", e)))
    }

    pub fn background(&self) -> Arc<TrackBuffer> {
        Arc::clone(&self.background)
    }

    pub fn greeting(&self, id: MessageId) -> Option<Arc<TrackBuffer>> {
        self.greetings.get(&id).cloned()
    }

    pub fn greeting_count(&self) -> usize {
        self.greetings.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn load_buffer(path: &Path, sample_rate: u32) -> Result<TrackBuffer> {
    let decoded = SimpleDecoder::decode_file(path)?;
    let samples = Resampler::resample(&decoded.samples, decoded.sample_rate, sample_rate)?;
    Ok(TrackBuffer::new(samples, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_assets_fall_back() {
        let card = CardConfig::default();
        let cache = AssetCache::load(Path::new("/nonexistent/public"), &card, 44100);

        assert!(cache.background().is_empty());
        assert_eq!(cache.greeting_count(), 0);
        assert!(cache.greeting(MessageId(1)).is_none());
        assert_eq!(cache.sample_rate(), 44100);
    }
}
