//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::ScanMode;
use crate::vision::CropMargins;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Frame capture settings
    pub capture: CaptureSettings,
    /// Text recognition settings
    pub vision: VisionSettings,
    /// Crop margin profiles
    pub crop: CropSettings,
    /// Render output settings
    pub render: RenderSettings,
    /// Reset behavior
    pub reset: ResetSettings,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Delay between repeated scans while held, in milliseconds
    pub scan_interval_ms: u64,
    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
    /// Mode the console starts in when `--mode` is not given
    pub start_mode: ScanMode,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 1000,
            log_level: "info".to_string(),
            start_mode: ScanMode::Seeking,
        }
    }
}

/// Frame capture settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Image file or directory of frames written by the camera tool
    pub source: Option<PathBuf>,
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    /// Cloud Vision `images:annotate` endpoint
    pub endpoint: String,
    /// Environment variable checked first for the API key
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// JPEG quality for uploaded frames (1 - 100)
    pub jpeg_quality: u8,
    /// Annotation feature requested from the service
    pub feature: String,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key_env: "VISION_API_KEY".to_string(),
            timeout_secs: 10,
            jpeg_quality: 85,
            feature: "TEXT_DETECTION".to_string(),
        }
    }
}

/// Crop margin profiles for the two modes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropSettings {
    /// Margins for question thumbnails
    pub question: CropMargins,
    /// Margins for answer captures
    pub answer: CropMargins,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            question: CropMargins::question(),
            answer: CropMargins::answer(),
        }
    }
}

/// Render output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Accent color for question entries
    pub question_color: String,
    /// Accent color for revealed answers
    pub answer_color: String,
    /// Directory for rendered thumbnails (defaults to the data directory)
    pub output_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            question_color: "#ff9800".to_string(),
            answer_color: "#4caf50".to_string(),
            output_dir: None,
        }
    }
}

/// Reset behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetSettings {
    /// Drop captured answers on a soft reset too
    pub soft_clears_cache: bool,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(config)
}

/// Load the configuration if the file exists. A file that exists but cannot
/// be read or parsed is an error, never a silent fallback to defaults.
pub fn load_if_present(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    load_config(path).map(Some)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Write the default configuration, refusing to replace an existing file
/// unless `force` is set
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    save_config(&AppConfig::default(), path)
        .with_context(|| format!("Failed to write config {:?}", path))
}
