//! Configuration loading for yapcli
//!
//! Provides utilities for locating the shared yapcli config directory
//! (~/.config/yapcli/), the data directory, and for loading `.env` files.
//!
//! Call [`init`] at application startup to bootstrap the config directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data roots
const APP_NAME: &str = "yapcli";

/// Environment file name looked up in the working directory and config directory
const ENV_FILE: &str = ".env";

/// Initialize the yapcli config directory.
///
/// Creates ~/.config/yapcli/ if it doesn't exist.
/// Call this once at application startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the yapcli config directory (~/.config/yapcli/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME))
}

/// Get the path to a file within the yapcli config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Get the yapcli data directory (~/.local/share/yapcli/ on Linux)
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join(APP_NAME))
}

/// Get a path within the yapcli data directory
pub fn data_path(name: &str) -> Option<PathBuf> {
    data_dir().map(|p| p.join(name))
}

/// Ensure the yapcli config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Create a directory (and its parents) if missing
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Load environment variables from `.env` files.
///
/// Precedence (highest to lowest):
/// 1. Variables already present in the process environment
/// 2. `./.env` in the current working directory
/// 3. `~/.config/yapcli/.env`
///
/// Returns the files that existed and were applied, in load order.
pub fn load_env_files() -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(ENV_FILE));
    }
    if let Some(path) = config_path(ENV_FILE) {
        candidates.push(path);
    }
    load_env_files_from(&candidates)
}

/// Apply `.env` files in priority order; earlier files win.
///
/// dotenvy never overrides a variable that is already set, so loading the
/// highest-priority file first gives shell > first file > later files.
pub fn load_env_files_from(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut loaded = Vec::new();
    for path in paths {
        if !path.is_file() {
            continue;
        }
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file: {}", path.display()))?;
        loaded.push(path.clone());
    }
    Ok(loaded)
}
