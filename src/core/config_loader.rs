//! # Config Loader
//!
//! Loads the global `config.toml` from the crank configuration directory, writing a
//! default one on first use, and applies environment overrides on top of it.
use crate::{
    constants::{DEFAULT_COMMANDS_DIR, DEFAULT_EXEC_TIMEOUT_SECS, DEFAULT_ROLES_DIR},
    core::paths::{self, PathError},
};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Overrides `commands_dir` for a single invocation.
pub const COMMANDS_DIR_ENV: &str = "CRANK_COMMANDS_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Path(#[from] PathError),
    #[error("Failed to parse config.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn default_commands_dir() -> String {
    DEFAULT_COMMANDS_DIR.to_string()
}

fn default_roles_dir() -> String {
    DEFAULT_ROLES_DIR.to_string()
}

fn default_exec_timeout_secs() -> u64 {
    DEFAULT_EXEC_TIMEOUT_SECS
}

fn default_interactive() -> bool {
    true
}

/// Represents the deserialized structure of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CrankConfig {
    /// Root of the command tree. Relative paths are resolved against the working directory.
    #[serde(default = "default_commands_dir")]
    pub commands_dir: String,
    /// Where role variable files live. Relative to the working directory unless absolute.
    #[serde(default = "default_roles_dir")]
    pub roles_dir: String,
    /// Upper bound for a single `exec` action.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
    /// When false, questions without a scripted answer fail instead of prompting.
    #[serde(default = "default_interactive")]
    pub interactive: bool,
}

impl Default for CrankConfig {
    fn default() -> Self {
        Self {
            commands_dir: default_commands_dir(),
            roles_dir: default_roles_dir(),
            exec_timeout_secs: default_exec_timeout_secs(),
            interactive: default_interactive(),
        }
    }
}

impl CrankConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// The absolute command root for a given working directory.
    pub fn commands_root(&self, work_dir: &Path) -> Result<PathBuf, PathError> {
        paths::resolve_against(work_dir, &self.commands_dir)
    }

    /// The absolute role variables directory for a given working directory.
    pub fn roles_root(&self, work_dir: &Path) -> Result<PathBuf, PathError> {
        paths::resolve_against(work_dir, &self.roles_dir)
    }

    /// Applies `CRANK_*` environment overrides.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(dir) = env::var(COMMANDS_DIR_ENV)
            && !dir.trim().is_empty()
        {
            log::debug!("Using commands dir from {}: {}", COMMANDS_DIR_ENV, dir);
            self.commands_dir = dir;
        }
        self
    }
}

/// Loads `config.toml`, creating it with defaults when missing.
pub fn load_config() -> Result<CrankConfig, ConfigError> {
    let config_path = paths::get_config_file_path()?;
    let config = load_or_create(&config_path)?;
    Ok(config.apply_env_overrides())
}

/// Reads the config at `path`, or writes the default configuration there first.
pub fn load_or_create(path: &Path) -> Result<CrankConfig, ConfigError> {
    if !path.exists() {
        log::debug!("No config found at {}. Writing defaults.", path.display());
        let default_config = CrankConfig::default();
        let toml_string = toml::to_string_pretty(&default_config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml_string)?;
        return Ok(default_config);
    }

    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
