// src/cli/handlers/run.rs

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::io::IsTerminal;

use crate::{
    cli::dispatcher::Session,
    core::{
        action_loader,
        context_builder::{self, ModelPopulator},
        interpolator::MustacheEngine,
        pipeline::ActionPipeline,
        populators::{MavenPopulator, RoleVarsPopulator, SystemPopulator},
        registrar::InvocableCommand,
    },
    maven::patcher::PomPatcher,
    system::{
        prompt::{NonInteractivePrompter, Prompter, TerminalPrompter},
        var_store::RoleStore,
    },
};

/// Runs the action files of one user command against a freshly built context.
pub fn handle(unit: &InvocableCommand, matches: &ArgMatches, session: &Session) -> Result<()> {
    let cli_values = unit.bind_options(matches);
    log::debug!(
        "Running '{} {}' with {:?}",
        unit.name(),
        unit.subcommand_name(),
        cli_values
    );

    let files = action_loader::find_action_files(&unit.path)?;
    let roles_dir = session.config.roles_root(&session.work_dir)?;
    let store = RoleStore::new(roles_dir);

    // Later populators overwrite earlier keys.
    let populators: Vec<Box<dyn ModelPopulator>> = vec![
        Box::new(SystemPopulator),
        Box::new(MavenPopulator),
        Box::new(RoleVarsPopulator::new(store.clone())),
    ];
    let mut context = context_builder::build_context(&cli_values, &populators, &session.work_dir)
        .context("Could not build the evaluation context")?;

    let mut prompter: Box<dyn Prompter> =
        if session.config.interactive && std::io::stdin().is_terminal() {
            Box::new(TerminalPrompter)
        } else {
            Box::new(NonInteractivePrompter)
        };

    println!(
        "{} {} {}",
        "→".blue(),
        "run".bold(),
        format!("{} {}", unit.name(), unit.subcommand_name()).cyan()
    );

    let mut pipeline = ActionPipeline {
        engine: &MustacheEngine,
        patcher: &PomPatcher,
        store: &store,
        prompter: prompter.as_mut(),
        work_dir: &session.work_dir,
        timeout: session.config.exec_timeout(),
    };
    let summary = pipeline.run(&files, &mut context)?;

    println!(
        "\n{} {} file(s), {} action(s) applied, {} skipped.",
        "✔".green(),
        summary.files,
        summary.executed,
        summary.skipped
    );
    Ok(())
}
