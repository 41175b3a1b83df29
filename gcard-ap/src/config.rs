//! gcard-ap runtime configuration
//!
//! Merges the TOML bootstrap file with command-line overrides.
//! Command-line values always win over the file.

use gcard_common::config::{CardConfig, InitialPlayState, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Values supplied on the command line (None = keep file value)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub assets_root: Option<PathBuf>,
    pub device: Option<String>,
    pub headless: bool,
    pub paused: bool,
    pub log_level: Option<String>,
}

/// Audio Player configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub assets_root: PathBuf,
    pub device: Option<String>,
    pub headless: bool,
    pub log_level: String,
    pub card: CardConfig,
    pub controller: ControllerSettings,
}

/// Settings consumed by the PlaybackController
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Duration of background fade-out/fade-in
    pub fade_duration: Duration,

    /// Try to start the background at startup
    pub autoplay: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_millis(1000),
            autoplay: true,
        }
    }
}

impl Config {
    pub fn new(file: TomlConfig, overrides: Overrides) -> Self {
        let autoplay =
            file.initial_play_state == InitialPlayState::Playing && !overrides.paused;

        Self {
            port: overrides.port.unwrap_or(file.port),
            assets_root: overrides.assets_root.unwrap_or(file.assets_root),
            device: overrides.device.or(file.audio.device),
            headless: overrides.headless || file.audio.headless,
            log_level: overrides.log_level.unwrap_or(file.logging.level),
            card: file.card,
            controller: ControllerSettings {
                fade_duration: Duration::from_millis(file.fade.duration_ms),
                autoplay,
            },
        }
    }
}
