// src/core/registrar.rs

use crate::{
    constants::RESERVED_COMMAND_NAMESPACE,
    core::scanner::{CommandScanResults, ScannedCommand},
    models::{Command, CommandOption},
};
use clap::{Arg, ArgAction, ArgMatches, builder::PossibleValue, value_parser};
use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
};

/// Names a user command may not take: they belong to crank or to clap.
const RESERVED_NAMES: &[&str] = &[RESERVED_COMMAND_NAMESPACE, "help"];
const RESERVED_FLAGS: &[&str] = &["help", "version"];

/// Whether `name` is taken by crank itself and cannot name a user command.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// The CLI type an option's `dataType` maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Int,
    Long,
    Short,
    Double,
    Float,
    Bool,
    Str,
}

impl OptionKind {
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type.trim().to_ascii_lowercase().as_str() {
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            "double" => Some(Self::Double),
            "float" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            "string" | "" => Some(Self::Str),
            _ => None,
        }
    }
}

/// An option that survived type mapping.
#[derive(Debug, Clone)]
pub struct BoundOption {
    pub option: CommandOption,
    pub kind: OptionKind,
}

impl BoundOption {
    fn to_arg(&self) -> Arg {
        let flag = self.option.flag_name();
        let mut arg = Arg::new(flag.clone()).long(flag);
        if let Some(description) = &self.option.description {
            arg = arg.help(description.clone());
        }
        if let Some(label) = &self.option.param_label {
            arg = arg.value_name(label.clone());
        }

        arg = match self.kind {
            OptionKind::Int => arg.value_parser(value_parser!(i32)),
            OptionKind::Long => arg.value_parser(value_parser!(i64)),
            OptionKind::Short => arg.value_parser(value_parser!(i16)),
            OptionKind::Double => arg.value_parser(value_parser!(f64)),
            OptionKind::Float => arg.value_parser(value_parser!(f32)),
            // `--flag` alone means true; `--flag false` is accepted too.
            OptionKind::Bool => arg
                .value_parser(value_parser!(bool))
                .num_args(0..=1)
                .default_missing_value("true"),
            OptionKind::Str if !self.option.choices.is_empty() => {
                let choices = self
                    .option
                    .choices
                    .iter()
                    .map(|(key, help)| PossibleValue::new(key.clone()).help(help.clone()));
                arg.value_parser(clap::builder::PossibleValuesParser::new(choices))
            }
            OptionKind::Str => arg.value_parser(value_parser!(String)),
        };
        arg = arg.action(ArgAction::Set);

        match &self.option.default_value {
            Some(default) => arg.default_value(default.clone()),
            None => arg.required(self.option.required),
        }
    }

    /// The parsed value as context text, if the option was given or defaulted.
    fn read(&self, matches: &ArgMatches) -> Option<String> {
        let id = self.option.flag_name();
        let id = id.as_str();
        match self.kind {
            OptionKind::Int => get::<i32>(matches, id),
            OptionKind::Long => get::<i64>(matches, id),
            OptionKind::Short => get::<i16>(matches, id),
            OptionKind::Double => get::<f64>(matches, id),
            OptionKind::Float => get::<f32>(matches, id),
            OptionKind::Bool => get::<bool>(matches, id),
            OptionKind::Str => get::<String>(matches, id),
        }
    }
}

fn get<T>(matches: &ArgMatches, id: &str) -> Option<String>
where
    T: ToString + Clone + Send + Sync + 'static,
{
    matches
        .try_get_one::<T>(id)
        .inspect_err(|e| log::warn!("Option '--{}' could not be read: {}", id, e))
        .ok()
        .flatten()
        .map(ToString::to_string)
}

/// One runnable `crank <command> <sub-command>` unit.
#[derive(Debug, Clone)]
pub struct InvocableCommand {
    pub command: Command,
    pub subcommand: Command,
    /// The sub-command directory holding the action files.
    pub path: PathBuf,
    pub options: Vec<BoundOption>,
}

impl InvocableCommand {
    fn new(command: &ScannedCommand, subcommand: &ScannedCommand) -> Self {
        let mut options = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        // Sub-command options first: on a clash they shadow the command's own.
        let declared = subcommand
            .command
            .options
            .iter()
            .chain(command.command.options.iter());
        for option in declared {
            let flag = option.flag_name();
            if RESERVED_FLAGS.contains(&flag.as_str()) {
                log::warn!(
                    "Option '{}' of '{} {}' is reserved and was ignored.",
                    option.name,
                    command.command.name,
                    subcommand.command.name
                );
                continue;
            }
            let Some(kind) = OptionKind::from_data_type(&option.data_type) else {
                log::warn!(
                    "Option '{}' of '{} {}' has unknown dataType '{}' and was ignored.",
                    option.name,
                    command.command.name,
                    subcommand.command.name,
                    option.data_type
                );
                continue;
            };
            if !seen.insert(flag) {
                log::debug!("Option '{}' is shadowed by the sub-command.", option.name);
                continue;
            }
            options.push(BoundOption {
                option: option.clone(),
                kind,
            });
        }

        Self {
            command: command.command.clone(),
            subcommand: subcommand.command.clone(),
            path: subcommand.path.clone(),
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.command.name
    }

    pub fn subcommand_name(&self) -> &str {
        &self.subcommand.name
    }

    /// The clap sub-command for this unit, with one flag per bound option.
    pub fn to_clap(&self) -> clap::Command {
        let mut cmd = clap::Command::new(self.subcommand.name.clone())
            .about(self.subcommand.description.clone());
        for bound in &self.options {
            cmd = cmd.arg(bound.to_arg());
        }
        cmd
    }

    /// Reads every given or defaulted option back, keyed by flag name.
    pub fn bind_options(&self, matches: &ArgMatches) -> BTreeMap<String, String> {
        self.options
            .iter()
            .filter_map(|bound| Some((bound.option.flag_name(), bound.read(matches)?)))
            .collect()
    }
}

/// Turns a scanned hierarchy into runnable units, one per (command, sub-command).
///
/// The reserved namespace is skipped with a warning, as are duplicate names.
pub fn register(results: &CommandScanResults) -> Vec<InvocableCommand> {
    let mut units = Vec::new();
    let mut taken: HashSet<(String, String)> = HashSet::new();

    for (command, subcommands) in &results.command_subcommand_map {
        let name = command.command.name.as_str();
        if is_reserved(name) || is_reserved(&command.dir_name) {
            log::warn!(
                "Command directory '{}' uses a reserved name and was ignored.",
                command.path.display()
            );
            continue;
        }
        for subcommand in subcommands {
            let key = (name.to_string(), subcommand.command.name.clone());
            if subcommand.command.name == "help" || !taken.insert(key) {
                log::warn!(
                    "Sub-command '{} {}' at '{}' is reserved or defined twice and was ignored.",
                    name,
                    subcommand.command.name,
                    subcommand.path.display()
                );
                continue;
            }
            units.push(InvocableCommand::new(command, subcommand));
        }
    }
    log::debug!("Registered {} invocable command(s).", units.len());
    units
}

/// Adds every unit to `root`, grouped under its top-level command.
pub fn attach(root: clap::Command, commands: &[InvocableCommand]) -> clap::Command {
    let mut groups: BTreeMap<&str, Vec<&InvocableCommand>> = BTreeMap::new();
    for unit in commands {
        groups.entry(unit.name()).or_default().push(unit);
    }

    groups.into_iter().fold(root, |root, (name, units)| {
        let about = units
            .first()
            .map(|u| u.command.description.clone())
            .unwrap_or_default();
        let group = units.iter().fold(
            clap::Command::new(name.to_string())
                .about(about)
                .subcommand_required(true)
                .arg_required_else_help(true),
            |group, unit| group.subcommand(unit.to_clap()),
        );
        root.subcommand(group)
    })
}

/// The unit selected by a parsed `<command> <sub-command>` pair.
pub fn find<'a>(
    commands: &'a [InvocableCommand],
    name: &str,
    subcommand: &str,
) -> Option<&'a InvocableCommand> {
    commands
        .iter()
        .find(|c| c.name() == name && c.subcommand_name() == subcommand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner;
    use std::fs;
    use tempfile::tempdir;

    fn write(path: &std::path::Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("hello/world/command.yaml"),
            r#"
description: Greets someone
options:
  - name: name
    defaultValue: world
  - name: times
    dataType: int
  - name: loud
    dataType: bool
  - name: when
    dataType: date
  - name: flavor
    choices:
      web: Web app
      cli: Command line
"#,
        );
        fs::create_dir_all(root.join("hello/other")).unwrap();
        fs::create_dir_all(root.join("command/list")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        dir
    }

    #[test]
    fn test_register_maps_types_and_skips_reserved() {
        // --- Setup ---
        let dir = fixture();
        let results = scanner::scan(dir.path()).unwrap();

        // --- Execute ---
        let units = register(&results);

        // --- Assert ---
        let names: Vec<_> = units
            .iter()
            .map(|u| format!("{} {}", u.name(), u.subcommand_name()))
            .collect();
        assert_eq!(names, vec!["hello other", "hello world"]);

        let world = find(&units, "hello", "world").unwrap();
        let kinds: Vec<_> = world.options.iter().map(|o| (o.option.name.as_str(), o.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("name", OptionKind::Str),
                ("times", OptionKind::Int),
                ("loud", OptionKind::Bool),
                ("flavor", OptionKind::Str),
            ]
        );
    }

    #[test]
    fn test_parse_and_bind_options() {
        let dir = fixture();
        let units = register(&scanner::scan(dir.path()).unwrap());
        let root = attach(clap::Command::new("crank"), &units);

        let matches = root
            .clone()
            .try_get_matches_from(["crank", "hello", "world", "--times", "3", "--loud"])
            .unwrap();
        let (_, group) = matches.subcommand().unwrap();
        let (_, sub) = group.subcommand().unwrap();
        let values = find(&units, "hello", "world").unwrap().bind_options(sub);

        assert_eq!(values.get("name").map(String::as_str), Some("world"));
        assert_eq!(values.get("times").map(String::as_str), Some("3"));
        assert_eq!(values.get("loud").map(String::as_str), Some("true"));
        assert!(!values.contains_key("flavor"));

        let bad_type = root
            .clone()
            .try_get_matches_from(["crank", "hello", "world", "--times", "many"]);
        assert!(bad_type.is_err());
        let bad_choice = root
            .clone()
            .try_get_matches_from(["crank", "hello", "world", "--flavor", "gui"]);
        assert!(bad_choice.is_err());
        let unknown_flag = root.try_get_matches_from(["crank", "hello", "world", "--when", "x"]);
        assert!(unknown_flag.is_err());
    }

    #[test]
    fn test_empty_results_register_nothing() {
        assert!(register(&CommandScanResults::default()).is_empty());
    }
}
