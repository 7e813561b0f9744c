//! Settings file location and loading

use anyhow::{Context, Result};
use pgkeep_standards::Settings;
use std::path::{Path, PathBuf};

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("pgkeep"))
}

pub fn config_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pgkeep")
        .join("logs")
}

/// Load settings from `explicit`, else from the default config file when it
/// exists, else built-in defaults. Environment overrides apply in every case.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_file().ok().filter(|p| p.exists()),
    };
    Settings::load(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("Failed to load settings from {}", path.display()),
        None => "Failed to load settings".to_string(),
    })
}
