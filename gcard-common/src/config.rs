//! Configuration loading and card catalog
//!
//! Bootstrap configuration comes from a single TOML file. The file is found
//! in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `GCARD_CONFIG` environment variable
//! 3. `<config_dir>/gcard/config.toml`
//! 4. Built-in defaults (no file)
//!
//! A missing file at priority 2 or 3 is not an error: the built-in defaults
//! describe the stock birthday card. A missing file named explicitly on the
//! command line is an error.

use crate::{Error, MessageId, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "GCARD_CONFIG";

/// Placeholder replaced by the message id in `greeting_template`
pub const ID_PLACEHOLDER: &str = "{id}";

/// Upper bound for a configured fade
pub const MAX_FADE_DURATION_MS: u64 = 60_000;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Folder holding the background and greeting audio files
    pub assets_root: PathBuf,

    /// Whether the background starts on its own at startup
    pub initial_play_state: InitialPlayState,

    pub audio: AudioConfig,
    pub fade: FadeConfig,
    pub card: CardConfig,
    pub logging: LoggingConfig,
}

/// Background state at startup
///
/// `Paused` behaves like a browser that blocks autoplay: the background
/// waits for the first user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialPlayState {
    Playing,
    Paused,
}

/// Audio output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,

    /// Render without an output device (clock-driven, silent)
    pub headless: bool,
}

/// Volume fade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    /// Duration of the background fade-out and fade-in
    pub duration_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

/// Card content: title, background track, and portraits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub title: String,

    /// Background audio file, relative to `assets_root`
    pub background: String,

    /// Greeting audio file name with `{id}` placeholder
    pub greeting_template: String,

    pub portraits: Vec<PortraitConfig>,
}

/// One clickable portrait and its greeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortraitConfig {
    pub id: MessageId,
    pub image: String,
    #[serde(default)]
    pub alt: String,
    /// Caption shown under the portrait
    pub caption: String,
    /// Greeting text shown while the greeting plays
    pub message: String,
    /// Explicit greeting audio file; falls back to `greeting_template`
    #[serde(default)]
    pub audio: Option<String>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5760,
            assets_root: PathBuf::from("./public"),
            initial_play_state: InitialPlayState::Playing,
            audio: AudioConfig::default(),
            fade: FadeConfig::default(),
            card: CardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self { duration_ms: 1000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            title: "Happy Birthday, Audrey, Too Cute!".to_string(),
            background: "birthday.mp3".to_string(),
            greeting_template: "greeting{id}.mp3".to_string(),
            portraits: vec![
                PortraitConfig {
                    id: MessageId(1),
                    image: "her-picture.jpg".to_string(),
                    alt: "Too Cute".to_string(),
                    caption: "Click for birthday message from Uncle Osas".to_string(),
                    message: "Surprise! You're growing more beautiful every day, and I'm so proud of you!"
                        .to_string(),
                    audio: None,
                },
                PortraitConfig {
                    id: MessageId(2),
                    image: "her-picture-2.jpg".to_string(),
                    alt: "Too Cute 2".to_string(),
                    caption: "Click for birthday message from Grandpa".to_string(),
                    message: "Surprise! You're amazing and keep shining brighter every day my grand child!"
                        .to_string(),
                    audio: None,
                },
            ],
        }
    }
}

impl CardConfig {
    /// Look up a portrait by id
    pub fn portrait(&self, id: MessageId) -> Option<&PortraitConfig> {
        self.portraits.iter().find(|p| p.id == id)
    }

    /// Greeting text for a message id
    pub fn message_text(&self, id: MessageId) -> Option<&str> {
        self.portrait(id).map(|p| p.message.as_str())
    }

    /// Greeting audio file for a message id, relative to the assets root
    pub fn greeting_file(&self, id: MessageId) -> Option<String> {
        let portrait = self.portrait(id)?;
        Some(match &portrait.audio {
            Some(file) => file.clone(),
            None => self
                .greeting_template
                .replace(ID_PLACEHOLDER, &id.to_string()),
        })
    }

    /// Ids of all portraits in display order
    pub fn message_ids(&self) -> Vec<MessageId> {
        self.portraits.iter().map(|p| p.id).collect()
    }
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve and load the configuration, falling back to defaults
    ///
    /// Returns the configuration and the file it came from (None = defaults).
    pub fn load_or_default(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = cli_path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        match resolve_config_path(None) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Ok((Self::load(&path)?, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok((Self::default(), None))
            }
            None => {
                info!("No config file, using built-in defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.card.portraits.is_empty() {
            return Err(Error::Config("card must define at least one portrait".to_string()));
        }

        let mut seen = HashSet::new();
        for portrait in &self.card.portraits {
            if !seen.insert(portrait.id) {
                return Err(Error::Config(format!(
                    "duplicate portrait id {}",
                    portrait.id
                )));
            }
        }

        let needs_template = self.card.portraits.iter().any(|p| p.audio.is_none());
        if needs_template && !self.card.greeting_template.contains(ID_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "greeting_template '{}' must contain {}",
                self.card.greeting_template, ID_PLACEHOLDER
            )));
        }

        if self.fade.duration_ms > MAX_FADE_DURATION_MS {
            return Err(Error::Config(format!(
                "fade.duration_ms {} exceeds {}",
                self.fade.duration_ms, MAX_FADE_DURATION_MS
            )));
        }

        Ok(())
    }
}

/// Find the configuration file path by priority
///
/// Does not check existence; the caller decides how to treat a missing file.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    dirs::config_dir().map(|d| d.join("gcard").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_card_matches_stock_birthday_card() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.card.portraits.len(), 2);
        assert_eq!(config.fade.duration_ms, 1000);
        assert_eq!(config.initial_play_state, InitialPlayState::Playing);
        assert_eq!(
            config.card.greeting_file(MessageId(2)).as_deref(),
            Some("greeting2.mp3")
        );
    }

    #[test]
    fn test_explicit_audio_overrides_template() {
        let mut card = CardConfig::default();
        card.portraits[0].audio = Some("uncle.ogg".to_string());
        assert_eq!(card.greeting_file(MessageId(1)).as_deref(), Some("uncle.ogg"));
        assert_eq!(card.greeting_file(MessageId(3)), None);
    }

    #[test]
    fn test_message_text_lookup() {
        let card = CardConfig::default();
        assert!(card.message_text(MessageId(1)).unwrap().starts_with("Surprise!"));
        assert!(card.message_text(MessageId(9)).is_none());
        assert_eq!(card.message_ids(), vec![MessageId(1), MessageId(2)]);
    }
}
