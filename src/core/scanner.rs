// src/core/scanner.rs

use crate::{
    constants::{COMMAND_MANIFEST_ALT_FILENAME, COMMAND_MANIFEST_FILENAME},
    core::commons::is_hidden,
    models::Command,
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Could not list command directory '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A command discovered on disk: its directory plus the model built from it.
#[derive(Debug, Clone)]
pub struct ScannedCommand {
    pub dir_name: String,
    pub path: PathBuf,
    pub command: Command,
}

// Identity and ordering follow the directory, which is what makes a command unique.
impl PartialEq for ScannedCommand {
    fn eq(&self, other: &Self) -> bool {
        self.dir_name == other.dir_name && self.path == other.path
    }
}

impl Eq for ScannedCommand {}

impl PartialOrd for ScannedCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScannedCommand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dir_name
            .cmp(&other.dir_name)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// The two-level command hierarchy found under a command root.
#[derive(Debug, Default)]
pub struct CommandScanResults {
    pub command_subcommand_map: BTreeMap<ScannedCommand, Vec<ScannedCommand>>,
}

impl CommandScanResults {
    pub fn is_empty(&self) -> bool {
        self.command_subcommand_map.is_empty()
    }
}

/// Scans `root` for `<command>/<sub-command>/` directories.
///
/// Every non-hidden directory directly under `root` yields one command, with or
/// without sub-commands. Anything deeper than two levels belongs to the
/// sub-command's action files and is not interpreted here.
///
/// # Errors
/// Returns [`ScanError::Io`] if `root` itself cannot be listed.
pub fn scan(root: &Path) -> Result<CommandScanResults, ScanError> {
    log::debug!("Scanning command root '{}'", root.display());
    let mut results = CommandScanResults::default();

    for (dir_name, path) in list_subdirectories(root)? {
        let command = load_command(&path, &dir_name);

        let subcommands = match list_subdirectories(&path) {
            Ok(entries) => entries
                .into_iter()
                .map(|(sub_name, sub_path)| ScannedCommand {
                    command: load_command(&sub_path, &sub_name),
                    dir_name: sub_name,
                    path: sub_path,
                })
                .collect(),
            Err(e) => {
                log::warn!("{}. Command '{}' will have no sub-commands.", e, dir_name);
                Vec::new()
            }
        };

        log::trace!(
            "Found command '{}' with {} sub-command(s).",
            dir_name,
            subcommands.len()
        );
        results.command_subcommand_map.insert(
            ScannedCommand {
                dir_name,
                path,
                command,
            },
            subcommands,
        );
    }

    Ok(results)
}

/// Like [`scan`], but a root that cannot be listed simply means "no custom commands".
pub fn scan_or_empty(root: &Path) -> CommandScanResults {
    scan(root).unwrap_or_else(|e| {
        log::debug!("{}. Continuing without custom commands.", e);
        CommandScanResults::default()
    })
}

/// Lists the immediate, non-hidden subdirectories of `dir`, sorted by name.
fn list_subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, ScanError> {
    let io_error = |source| ScanError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        if is_hidden(&path) || !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non UTF-8 directory name '{}'.", path.display());
            continue;
        };
        found.push((name.to_string(), path.clone()));
    }
    found.sort();
    Ok(found)
}

/// Finds the manifest of a command directory, if any.
pub fn manifest_path(dir: &Path) -> Option<PathBuf> {
    [COMMAND_MANIFEST_FILENAME, COMMAND_MANIFEST_ALT_FILENAME]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Builds a command from its optional manifest. An unreadable or invalid manifest is
/// reported and replaced by the defaults, so one broken command never hides the rest.
fn load_command(dir: &Path, dir_name: &str) -> Command {
    let Some(manifest) = manifest_path(dir) else {
        return Command::with_defaults(dir_name);
    };

    let parsed = fs::read_to_string(&manifest)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_yaml::from_str::<Option<Command>>(&content).map_err(|e| e.to_string())
        })
        .and_then(|command| {
            let command = command
                .map(|c| c.fill_defaults(dir_name))
                .unwrap_or_else(|| Command::with_defaults(dir_name));
            command.validate().map_err(|e| e.to_string())?;
            Ok(command)
        });

    match parsed {
        Ok(command) => command,
        Err(reason) => {
            log::warn!(
                "Ignoring invalid manifest '{}': {}",
                manifest.display(),
                reason
            );
            Command::with_defaults(dir_name)
        }
    }
}
