//! Greeting card audio player (gcard-ap) - main entry point
//!
//! Loads the card configuration, preloads the card audio, starts the card
//! runtime and serves the HTTP/SSE control surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gcard_common::config::TomlConfig;
use gcard_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gcard_ap::api::{self, AppState};
use gcard_ap::audio::{
    AssetCache, AudioOutput, HeadlessOutput, Mixer, MixerTrackFactory, OutputHandle,
    DEFAULT_SAMPLE_RATE,
};
use gcard_ap::config::{Config, Overrides};
use gcard_ap::playback::runtime;

const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for gcard-ap
#[derive(Parser, Debug)]
#[command(name = "gcard-ap")]
#[command(about = "Audio player for interactive greeting cards")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "GCARD_PORT")]
    port: Option<u16>,

    /// Directory holding the card's audio files
    #[arg(short, long, env = "GCARD_ASSETS_ROOT")]
    assets_root: Option<PathBuf>,

    /// Output device name (default device if omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Render audio without an output device
    #[arg(long)]
    headless: bool,

    /// Start with the background paused until the first click
    #[arg(long)]
    paused: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        let devices = AudioOutput::list_devices().context("Failed to list audio devices")?;
        if devices.is_empty() {
            println!("No output devices found");
        }
        for name in devices {
            println!("{}", name);
        }
        return Ok(());
    }

    let (file_config, config_path) = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let config = Config::new(
        file_config,
        Overrides {
            port: args.port,
            assets_root: args.assets_root,
            device: args.device,
            headless: args.headless,
            paused: args.paused,
            log_level: args.log_level,
        },
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "gcard_ap={},gcard_common={},tower_http=info",
                    config.log_level, config.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gcard-ap v{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }
    info!("Card: \"{}\" ({} portraits)", config.card.title, config.card.portraits.len());
    info!("Assets root: {}", config.assets_root.display());

    // Open the device first so assets are decoded at its rate
    let device = if config.headless {
        None
    } else {
        match AudioOutput::open(config.device.as_deref()) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("No audio output available, running headless: {}", e);
                None
            }
        }
    };
    let sample_rate = device
        .as_ref()
        .map(AudioOutput::sample_rate)
        .unwrap_or(DEFAULT_SAMPLE_RATE);

    let assets =
        AssetCache::load_async(config.assets_root.clone(), config.card.clone(), sample_rate)
            .await
            .context("Failed to load card audio")?;

    let mixer = Arc::new(Mixer::new(sample_rate));
    let factory = Arc::new(MixerTrackFactory::new(Arc::clone(&mixer), Arc::new(assets)));
    let events = EventBus::new(EVENT_BUS_CAPACITY);

    let (card, runtime_task) = runtime::spawn(factory, events.clone(), config.controller.clone())
        .context("Failed to start card runtime")?;

    let output = match device {
        Some(mut output) => match output.start(Arc::clone(&mixer)) {
            Ok(()) => OutputHandle::Device(output),
            Err(e) => {
                warn!("Audio stream failed to start, running headless: {}", e);
                OutputHandle::Headless(HeadlessOutput::spawn(Arc::clone(&mixer)))
            }
        },
        None => OutputHandle::Headless(HeadlessOutput::spawn(Arc::clone(&mixer))),
    };
    info!("Audio output: {}", output.describe());

    let state = AppState {
        card,
        catalog: Arc::new(config.card.clone()),
        events,
    };

    api::serve(config.port, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Dropping the last handle stops the runtime
    drop(output);
    if let Err(e) = runtime_task.await {
        warn!("Card runtime ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
