//! # Command Line Surface
//!
//! The root `clap::Command` is assembled at runtime: user commands come from the
//! scanned command tree, the `command` namespace from [`args::BuiltinCommand`].

use crate::{
    constants::RESERVED_COMMAND_NAMESPACE,
    core::registrar::{self, InvocableCommand},
};
use args::BuiltinCommand;
use clap::Subcommand;
use clap::builder::styling::{AnsiColor, Styles};

pub mod args;
pub mod dispatcher;
pub mod handlers;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Yellow.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Green.on_default())
}

/// The full CLI: one sub-command group per user command plus the built-ins.
pub fn build_cli(commands: &[InvocableCommand]) -> clap::Command {
    let builtins = BuiltinCommand::augment_subcommands(
        clap::Command::new(RESERVED_COMMAND_NAMESPACE)
            .about("Manage crank commands")
            .subcommand_required(true)
            .arg_required_else_help(true),
    );

    let root = clap::Command::new("crank")
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .styles(styles())
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(builtins);

    registrar::attach(root, commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli(&[]).debug_assert();
    }

    #[test]
    fn test_builtins_parse() {
        let matches = build_cli(&[])
            .try_get_matches_from(["crank", "command", "new", "greet"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, RESERVED_COMMAND_NAMESPACE);

        use clap::FromArgMatches;
        let builtin = BuiltinCommand::from_arg_matches(sub).unwrap();
        assert_eq!(
            builtin,
            BuiltinCommand::New {
                name: "greet".into(),
                sub: "run".into()
            }
        );
    }

    #[test]
    fn test_missing_command_is_a_usage_error() {
        assert!(build_cli(&[]).try_get_matches_from(["crank"]).is_err());
    }
}
