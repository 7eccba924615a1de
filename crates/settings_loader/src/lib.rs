//! Centralized settings loading for the trade ingestion pipeline.
//!
//! Configuration lives in a small JSON file (`settings.json` by default)
//! holding the ambiguous-date convention, the strict-quantity filter flag,
//! and the minimum trade count the insights gate enforces. A missing or
//! unreadable file degrades to `Settings::default()` where the caller asks
//! for that behavior.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::Settings;

/// Loads settings from a JSON file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from the default location (settings.json in the current directory).
pub fn load_default_settings() -> Result<Settings> {
    load_settings("settings.json")
}

/// Loads settings from an optional path, returning None if no path is provided.
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<Settings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Resolves settings for a CLI invocation: an explicitly provided path must
/// load (errors propagate), otherwise the default location is tried and a
/// missing file falls back to `Settings::default()`.
pub fn load_settings_or_default(path: Option<&PathBuf>) -> Result<Settings> {
    if let Some(settings_path) = path {
        return load_settings(settings_path);
    }
    match load_default_settings() {
        Ok(settings) => Ok(settings),
        Err(_) => Ok(Settings::default()),
    }
}

/// Checks if a settings file exists at the given path.
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}
