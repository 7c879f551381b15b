// src/cli/args.rs
use clap::Subcommand;

/// Built-in management commands, reached through `crank command <...>`.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BuiltinCommand {
    /// Prints the discovered command hierarchy as a tree.
    #[command(visible_alias = "ls")]
    List {
        /// Show the directory of each command, relative to the command root.
        #[arg(long, short)]
        paths: bool,
    },

    /// Scaffolds a runnable hello-world command under the command root.
    New {
        /// Name of the top-level command.
        name: String,

        /// Name of the sub-command.
        #[arg(default_value = "run")]
        sub: String,
    },
}
