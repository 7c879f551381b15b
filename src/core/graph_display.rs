// src/core/graph_display.rs

use crate::core::scanner::{CommandScanResults, ScannedCommand};
use colored::Colorize;
use std::path::Path;

/// Renders the command hierarchy as an ASCII tree, one line per (sub-)command.
pub fn render_command_tree(results: &CommandScanResults, root: &Path, show_paths: bool) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str(&format!(
            "No commands found under '{}'. Use 'crank command new <name>' to create one.\n",
            root.display()
        ));
        return out;
    }

    let total = results.command_subcommand_map.len();
    for (i, (command, subcommands)) in results.command_subcommand_map.iter().enumerate() {
        let is_last = i == total - 1;
        push_node(&mut out, command, root, show_paths, "", is_last);

        let child_prefix = if is_last { "   " } else { "│  " };
        for (j, sub) in subcommands.iter().enumerate() {
            let is_last_child = j == subcommands.len() - 1;
            push_node(&mut out, sub, root, show_paths, child_prefix, is_last_child);
        }
    }
    out
}

fn push_node(
    out: &mut String,
    node: &ScannedCommand,
    root: &Path,
    show_paths: bool,
    prefix: &str,
    is_last: bool,
) {
    let connector = if is_last { "└─" } else { "├─" };
    let mut line = format!(
        "{}{}{} {}",
        prefix,
        connector,
        node.command.name.bold(),
        node.command.description.dimmed()
    );
    if show_paths {
        let shown = node.path.strip_prefix(root).unwrap_or(&node.path);
        line.push_str(&format!(" [{}]", shown.display()));
    }
    if !node.command.options.is_empty() {
        let flags: Vec<String> = node
            .command
            .options
            .iter()
            .map(|o| format!("--{}", o.flag_name()))
            .collect();
        line.push_str(&format!(" {}", flags.join(" ").cyan()));
    }
    out.push_str(&line);
    out.push('\n');
}

/// Prints [`render_command_tree`] to stdout.
pub fn display_command_tree(results: &CommandScanResults, root: &Path, show_paths: bool) {
    print!("{}", render_command_tree(results, root, show_paths));
}
