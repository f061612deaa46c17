//! PanelHunt - scavenger hunt panel-code matcher
//!
//! Scans camera frames for three-digit panel codes. Codes seen in question
//! mode are the ones being sought; panels scanned in answer mode are
//! captured, and a captured panel is revealed once its code is sought.

mod analysis;
mod app;
mod capture;
mod commands;
mod config;
mod hotkey;
mod overlay;
mod shared;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::analysis::{EngineConfig, ModeEngine, ScanMode};
use crate::app::HuntApp;
use crate::capture::{FrameSource, ImageFileSource};
use crate::config::AppConfig;
use crate::overlay::DirectorySink;
use crate::vision::{CloudVisionRecognizer, DetectionSession};

/// PanelHunt - match panel codes between question and answer scans
#[derive(Parser, Debug)]
#[command(name = "panel-hunt")]
#[command(about = "Scan camera frames for panel codes and reveal matching answers")]
struct Args {
    /// Config file (defaults to config.toml in the config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the interactive hunt console
    Run {
        /// Frame image or directory of frames (overrides capture.source)
        #[arg(short, long)]
        frames: Option<PathBuf>,

        /// Directory for rendered thumbnails (overrides render.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Starting mode: question or answer (defaults to general.start_mode)
        #[arg(short, long)]
        mode: Option<ScanMode>,
    },
    /// Detect codes in a single image and exit
    Scan {
        /// Image to scan
        image: PathBuf,

        /// Margin profile used for --save crops: question or answer
        /// (defaults to general.start_mode)
        #[arg(short, long)]
        mode: Option<ScanMode>,

        /// Write a crop per detected code into this directory
        #[arg(short, long)]
        save: Option<PathBuf>,
    },
    /// Write a default config file
    InitConfig {
        /// Where to write it (defaults to --config or the config directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Store the Cloud Vision API key
    SetKey {
        /// The API key
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    // These two never read the configuration
    match &args.command {
        Command::InitConfig { path, force } => {
            let path = path.clone().unwrap_or(config_path);
            config::write_default_config(&path, *force)?;
            println!("Wrote default configuration to {}", path.display());
            return Ok(());
        }
        Command::SetKey { key } => {
            let path = storage::save_api_key(key)?;
            println!("API key stored in {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    let loaded = config::load_if_present(&config_path);

    let log_level = match &loaded {
        Ok(Some(config)) => config.general.log_level.clone(),
        _ => AppConfig::default().general.log_level,
    };
    init_logging(&log_level)?;

    let config = match loaded? {
        Some(config) => {
            info!("Loaded configuration from {:?}", config_path);
            config
        }
        None => {
            info!("Using default configuration");
            AppConfig::default()
        }
    };

    match args.command {
        Command::Run {
            frames,
            output,
            mode,
        } => {
            let mode = mode.unwrap_or(config.general.start_mode);
            run_hunt(config, frames, output, mode).await
        }
        Command::Scan { image, mode, save } => {
            let mode = mode.unwrap_or(config.general.start_mode);
            let margins = match mode {
                ScanMode::Seeking => config.crop.question,
                ScanMode::Matching => config.crop.answer,
            };
            let session = detection_session(&config)?;
            commands::scan_image(
                &session,
                &image,
                mode,
                &margins,
                save.as_deref(),
                &mut std::io::stdout(),
            )
            .await?;
            Ok(())
        }
        Command::InitConfig { .. } | Command::SetKey { .. } => Ok(()),
    }
}

fn default_config_path() -> Result<PathBuf> {
    Ok(storage::get_config_dir()?.join("config.toml"))
}

/// Log to stderr; RUST_LOG wins over the configured level
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Build the detection session, refusing to start without a key
fn detection_session(config: &AppConfig) -> Result<DetectionSession> {
    let api_key = storage::load_api_key(&config.vision.api_key_env);
    let recognizer = CloudVisionRecognizer::new(&config.vision, api_key)?;
    if !recognizer.has_credential() {
        anyhow::bail!(
            "No Cloud Vision API key: set ${} or run `panel-hunt set-key <KEY>`",
            config.vision.api_key_env
        );
    }
    Ok(DetectionSession::new(Arc::new(recognizer)))
}

/// Interactive console driving one game session
async fn run_hunt(
    config: AppConfig,
    frames: Option<PathBuf>,
    output: Option<PathBuf>,
    mode: ScanMode,
) -> Result<()> {
    let frames = frames
        .or_else(|| config.capture.source.clone())
        .context("No frame source: pass --frames or set capture.source")?;
    let output = match output.or_else(|| config.render.output_dir.clone()) {
        Some(dir) => dir,
        None => storage::get_data_dir()?.join("render"),
    };

    let session = detection_session(&config)?;
    let source: Arc<dyn FrameSource> = Arc::new(ImageFileSource::open(&frames)?);
    let sink = DirectorySink::create(&output)?;
    let engine = ModeEngine::new(sink, EngineConfig::from_app_config(&config));
    let interval = Duration::from_millis(config.general.scan_interval_ms.max(1));

    let mut app = HuntApp::new(engine, session, source, interval, mode);

    println!("PanelHunt ready in {} mode. Thumbnails: {}", app.mode(), output.display());
    println!("{}", hotkey::HELP);

    let result = commands::run_console(
        &mut app,
        BufReader::new(tokio::io::stdin()),
        &mut std::io::stdout(),
    )
    .await;

    app.shutdown().await;
    info!("PanelHunt shutdown complete");
    result
}
