// src/cli/handlers/command_list.rs

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::dispatcher::Session,
    core::{graph_display, scanner::CommandScanResults},
};

pub fn handle(results: &CommandScanResults, show_paths: bool, session: &Session) -> Result<()> {
    println!(
        "\n{} {}",
        "Commands under".bold(),
        session.commands_root.display().to_string().cyan()
    );
    graph_display::display_command_tree(results, &session.commands_root, show_paths);
    Ok(())
}
