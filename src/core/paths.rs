// src/core/paths.rs

use crate::constants::CONFIG_FILENAME;
use lazy_static::lazy_static;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref CRANK_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Overrides the configuration directory (useful for tests and sandboxes).
pub const CONFIG_DIR_ENV: &str = "CRANK_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to expand path template '{template}': {reason}")]
    Expansion { template: String, reason: String },
}

/// Returns the path to the crank configuration directory (`~/.config/crank`).
/// Creates it if it doesn't exist.
///
/// Memoized: the first call computes and caches the path, later calls return
/// the cached value.
pub fn get_crank_config_dir() -> Result<PathBuf, PathError> {
    // The cached value survives a poisoned lock.
    let mut cached_path_guard = CRANK_CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    // 1. Environment override, then the system config directory.
    let config_path = match env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join("crank"),
    };

    // 2. Ensure the directory exists on the filesystem.
    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to the global `config.toml` file.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_crank_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a configured path.
pub fn expand_path_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Resolves a configured (possibly relative) path against the working directory
/// and returns a clean, canonical-looking form.
pub fn resolve_against(work_dir: &Path, template: &str) -> Result<PathBuf, PathError> {
    let expanded = expand_path_template(template)?;
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        work_dir.join(expanded)
    };
    Ok(dunce::simplified(&joined).to_path_buf())
}
