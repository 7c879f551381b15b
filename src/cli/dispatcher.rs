// src/cli/dispatcher.rs

use anyhow::{Context as _, Result, anyhow};
use clap::FromArgMatches;
use std::{
    env,
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    cli::{args::BuiltinCommand, build_cli, handlers},
    constants::RESERVED_COMMAND_NAMESPACE,
    core::{
        config_loader::{self, CrankConfig},
        registrar, scanner,
    },
};

/// Everything a handler needs to know about the current invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub work_dir: PathBuf,
    pub commands_root: PathBuf,
    pub config: CrankConfig,
}

impl Session {
    pub fn new(work_dir: &Path, config: CrankConfig) -> Result<Self> {
        let work_dir = dunce::simplified(work_dir).to_path_buf();
        let commands_root = config.commands_root(&work_dir)?;
        Ok(Self {
            work_dir,
            commands_root,
            config,
        })
    }

    /// Loads `config.toml` and binds it to the current directory.
    pub fn from_env() -> Result<Self> {
        let work_dir = env::current_dir().context("Could not determine the working directory")?;
        Self::new(&work_dir, config_loader::load_config()?)
    }
}

/// Parses `args` against the discovered command tree and runs the selected command.
///
/// Parse failures are returned as [`clap::Error`] inside the `anyhow` error, so the
/// binary can let clap print usage and pick the exit code.
pub fn dispatch<I, T>(args: I, session: &Session) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let results = scanner::scan_or_empty(&session.commands_root);
    let commands = registrar::register(&results);

    let matches = build_cli(&commands).try_get_matches_from(args)?;
    log::debug!("Parsed invocation: {:?}", matches.subcommand_name());

    let Some((name, group)) = matches.subcommand() else {
        return Ok(());
    };

    if name == RESERVED_COMMAND_NAMESPACE {
        return match BuiltinCommand::from_arg_matches(group)? {
            BuiltinCommand::List { paths } => {
                handlers::command_list::handle(&results, paths, session)
            }
            BuiltinCommand::New { name, sub } => handlers::command_new::handle(&name, &sub, session),
        };
    }

    let (sub_name, sub_matches) = group
        .subcommand()
        .ok_or_else(|| anyhow!("Command '{}' needs a sub-command.", name))?;
    let unit = registrar::find(&commands, name, sub_name)
        .ok_or_else(|| anyhow!("Unknown command '{} {}'.", name, sub_name))?;

    handlers::run::handle(unit, sub_matches, session)
}
