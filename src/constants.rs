// src/constants.rs

/// The name of the directory holding crank data inside a project.
pub const CRANK_DIR: &str = ".crank";

/// Default location of the command tree, relative to the working directory.
pub const DEFAULT_COMMANDS_DIR: &str = ".crank/commands";

/// Default location of the role variable files, relative to the working directory.
pub const DEFAULT_ROLES_DIR: &str = ".crank/roles/vars";

/// The manifest describing a command or sub-command (inside its directory).
pub const COMMAND_MANIFEST_FILENAME: &str = "command.yaml";

/// Accepted alternative spelling of the manifest file name.
pub const COMMAND_MANIFEST_ALT_FILENAME: &str = "command.yml";

/// The name of the global configuration file (in ~/.config/crank/).
pub const CONFIG_FILENAME: &str = "config.toml";

/// The build descriptor patched by the maven actions and read by the maven populator.
pub const POM_FILENAME: &str = "pom.xml";

/// Upper bound for a single `exec` action, in seconds.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 300;

/// Top-level namespace reserved for the built-in management commands.
pub const RESERVED_COMMAND_NAMESPACE: &str = "command";

// --- Context keys written by actions and populators ---

pub const CTX_STDOUT: &str = "stdout";
pub const CTX_STDERR: &str = "stderr";
pub const CTX_EXIT_VALUE: &str = "exit-value";
pub const CTX_STDOUT_JSON_PATH: &str = "stdout-json-path";
pub const CTX_MAVEN_MODEL: &str = "maven-model";
