// src/models.rs

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::core::commons::kebab_case;

/// The per-run evaluation context: every template and conditional is resolved against it.
pub type Context = BTreeMap<String, Value>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Option at position {0} has an empty name.")]
    EmptyOptionName(usize),
    #[error("Options '{0}' and '{1}' map to the same flag '--{2}'.")]
    DuplicateOption(String, String, String),
    #[error("An action must declare exactly one kind, but none was found.")]
    NoActionKind,
    #[error("An action must declare exactly one kind, but found several: {0}.")]
    MultipleActionKinds(String),
    #[error("Invalid '{kind}' action: {reason}")]
    InvalidAction { kind: &'static str, reason: String },
}

// --- COMMAND MANIFEST MODELS (command.yaml) ---

fn default_data_type() -> String {
    "string".to_string()
}

/// Accepts any YAML scalar (`8080`, `true`, `"x"`) and keeps its textual form.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar value, found {:?}",
            other
        ))),
    }
}

/// Same as [`scalar_as_string`], for every value of a map.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let text = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Null => String::new(),
            other => {
                return Err(D::Error::custom(format!(
                    "value of '{}' must be a scalar, found {:?}",
                    key, other
                )));
            }
        };
        out.insert(key, text);
    }
    Ok(out)
}

/// A typed option declared by a command manifest. It becomes one `--flag` on the CLI
/// and one context key (its kebab-cased name).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub param_label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub choices: BTreeMap<String, String>,
}

impl CommandOption {
    /// The long flag name and the context key of this option.
    pub fn flag_name(&self) -> String {
        kebab_case(&self.name)
    }
}

/// A command or sub-command, as described by its directory and optional manifest.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Command {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl Command {
    /// The command a directory yields when it carries no manifest.
    pub fn with_defaults(dir_name: &str) -> Self {
        Self {
            name: dir_name.to_string(),
            description: format!("{} commands", dir_name),
            options: Vec::new(),
        }
    }

    /// Fills blank manifest fields from the directory name.
    pub fn fill_defaults(mut self, dir_name: &str) -> Self {
        if self.name.trim().is_empty() {
            self.name = dir_name.to_string();
        }
        if self.description.trim().is_empty() {
            self.description = format!("{} commands", dir_name);
        }
        self
    }

    /// Checks that option names are present and unique once turned into flags.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen: HashSet<String> = HashSet::new();
        for (position, option) in self.options.iter().enumerate() {
            if option.name.trim().is_empty() {
                return Err(ManifestError::EmptyOptionName(position));
            }
            let flag = option.flag_name();
            if !seen.insert(flag.clone()) {
                let first = self
                    .options
                    .iter()
                    .find(|o| o.flag_name() == flag)
                    .map(|o| o.name.clone())
                    .unwrap_or_default();
                return Err(ManifestError::DuplicateOption(
                    first,
                    option.name.clone(),
                    flag,
                ));
            }
        }
        Ok(())
    }
}

// --- ACTION FILE MODELS ---

/// Gate evaluated before any action of a file runs.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Conditional {
    /// The artifact that must be declared as a dependency of the project.
    pub artifact_id: String,
}

/// One parsed action-definition file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ActionsFile {
    #[serde(default)]
    pub conditional: Option<Conditional>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<Action>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Action>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Generate {
    #[serde(default)]
    pub text: Option<String>,
    /// A template file, relative to the directory of the action file.
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Inject {
    pub to: String,
    pub text: String,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub skip: Option<String>,
}

/// Payload shared by the four build-descriptor injections.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MavenInjection {
    pub text: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Exec {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub command_file: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub errto: Option<String>,
    #[serde(default)]
    pub json_path: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct QuestionOptions {
    #[serde(default, deserialize_with = "scalar_map")]
    pub choices: BTreeMap<String, String>,
    #[serde(default)]
    pub multiple: bool,
}

fn default_question_type() -> String {
    "input".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Question {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// One of `input`, `dropdown`, `path`.
    #[serde(rename = "type", default = "default_question_type")]
    pub kind: String,
    #[serde(default)]
    pub options: QuestionOptions,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default_value: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Vars {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub data: BTreeMap<String, String>,
    /// Role of the persistent store the values go to; the default role when absent.
    #[serde(default)]
    pub role: Option<String>,
}

/// One step of an action file. Exactly one kind is populated per YAML entry.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "RawAction")]
pub enum Action {
    Generate(Generate),
    Inject(Inject),
    InjectMavenDependency(MavenInjection),
    InjectMavenDependencyManagement(MavenInjection),
    InjectMavenRepository(MavenInjection),
    InjectMavenBuildPlugin(MavenInjection),
    Exec(Exec),
    Vars(Vars),
}

impl Action {
    /// Whether this action only queues a build descriptor change.
    pub fn is_descriptor_injection(&self) -> bool {
        matches!(
            self,
            Self::InjectMavenDependency(_)
                | Self::InjectMavenDependencyManagement(_)
                | Self::InjectMavenRepository(_)
                | Self::InjectMavenBuildPlugin(_)
        )
    }

    /// The YAML key naming this kind of action.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
            Self::Inject(_) => "inject",
            Self::InjectMavenDependency(_) => "injectMavenDependency",
            Self::InjectMavenDependencyManagement(_) => "injectMavenDependencyManagement",
            Self::InjectMavenRepository(_) => "injectMavenRepository",
            Self::InjectMavenBuildPlugin(_) => "injectMavenBuildPlugin",
            Self::Exec(_) => "exec",
            Self::Vars(_) => "vars",
        }
    }
}

/// The on-disk shape of an action: one optional field per kind.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawAction {
    generate: Option<Generate>,
    inject: Option<Inject>,
    inject_maven_dependency: Option<MavenInjection>,
    inject_maven_dependency_management: Option<MavenInjection>,
    inject_maven_repository: Option<MavenInjection>,
    inject_maven_build_plugin: Option<MavenInjection>,
    exec: Option<Exec>,
    vars: Option<Vars>,
}

impl TryFrom<RawAction> for Action {
    type Error = ManifestError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let mut found: Vec<Self> = Vec::new();
        found.extend(raw.generate.map(Self::Generate));
        found.extend(raw.inject.map(Self::Inject));
        found.extend(raw.inject_maven_dependency.map(Self::InjectMavenDependency));
        found.extend(
            raw.inject_maven_dependency_management
                .map(Self::InjectMavenDependencyManagement),
        );
        found.extend(raw.inject_maven_repository.map(Self::InjectMavenRepository));
        found.extend(raw.inject_maven_build_plugin.map(Self::InjectMavenBuildPlugin));
        found.extend(raw.exec.map(Self::Exec));
        found.extend(raw.vars.map(Self::Vars));

        if found.len() > 1 {
            let kinds = found.iter().map(Self::kind).collect::<Vec<_>>().join(", ");
            return Err(ManifestError::MultipleActionKinds(kinds));
        }
        let action = found.pop().ok_or(ManifestError::NoActionKind)?;
        action.validate()?;
        Ok(action)
    }
}

impl Action {
    fn validate(&self) -> Result<(), ManifestError> {
        let invalid = |reason: &str| ManifestError::InvalidAction {
            kind: self.kind(),
            reason: reason.to_string(),
        };
        match self {
            Self::Generate(g) => match (&g.text, &g.from) {
                (Some(_), Some(_)) => Err(invalid("'text' and 'from' are mutually exclusive")),
                (None, None) => Err(invalid("one of 'text' or 'from' is required")),
                _ => Ok(()),
            },
            Self::Inject(i) if i.after.is_some() && i.before.is_some() => {
                Err(invalid("'after' and 'before' are mutually exclusive"))
            }
            Self::Exec(e) => match (&e.command, &e.command_file) {
                (Some(_), Some(_)) => {
                    Err(invalid("'command' and 'commandFile' are mutually exclusive"))
                }
                (None, None) => Err(invalid("one of 'command' or 'commandFile' is required")),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}
