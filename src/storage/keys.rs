//! API key store
//!
//! The key comes from an environment variable when set, otherwise from an
//! `api_key` file in the configuration directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the stored key inside the config directory
pub const KEY_FILE_NAME: &str = "api_key";

/// Load the API key: environment first, then the key file
pub fn load_api_key(env_var: &str) -> Option<String> {
    let dir = super::get_config_dir().ok();
    load_api_key_from(env_var, dir.as_deref())
}

/// Load the API key using an explicit key directory
pub fn load_api_key_from(env_var: &str, dir: Option<&Path>) -> Option<String> {
    if let Some(key) = std::env::var(env_var).ok().and_then(non_empty) {
        debug!("Using API key from ${}", env_var);
        return Some(key);
    }

    let path = dir?.join(KEY_FILE_NAME);
    let key = std::fs::read_to_string(&path).ok().and_then(non_empty)?;
    debug!("Using API key from {:?}", path);
    Some(key)
}

/// Store the API key in the config directory
pub fn save_api_key(key: &str) -> Result<PathBuf> {
    let dir = super::get_config_dir()?;
    save_api_key_to(key, &dir)
}

/// Store the API key in an explicit directory
pub fn save_api_key_to(key: &str, dir: &Path) -> Result<PathBuf> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Refusing to store an empty API key");
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(KEY_FILE_NAME);
    std::fs::write(&path, key).with_context(|| format!("Failed to write {:?}", path))?;
    info!("Stored API key at {:?}", path);
    Ok(path)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
