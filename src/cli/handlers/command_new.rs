// src/cli/handlers/command_new.rs

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use std::fs;

use crate::{
    cli::dispatcher::Session,
    constants::COMMAND_MANIFEST_FILENAME,
    core::registrar,
};

const HELLO_MANIFEST: &str = r#"description: Says hello
options:
  - name: name
    description: Who to greet
    defaultValue: world
"#;

const HELLO_ACTIONS: &str = r#"actions:
  - generate:
      to: hello.txt
      text: "Hello {{name}}"
"#;

/// The file holding the scaffolded actions.
pub const HELLO_ACTIONS_FILENAME: &str = "hello.yaml";

fn check_name(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        bail!(
            "Invalid {} name '{}'. Use letters, digits, '-' or '_'.",
            kind,
            name
        );
    }
    Ok(())
}

/// Creates `<root>/<name>/<sub>/` with a manifest and one generate action.
pub fn handle(name: &str, sub: &str, session: &Session) -> Result<()> {
    check_name("command", name)?;
    check_name("sub-command", sub)?;
    if registrar::is_reserved(name) || sub == "help" {
        bail!("'{} {}' uses a reserved name.", name, sub);
    }

    let dir = session.commands_root.join(name).join(sub);
    if dir.exists() {
        bail!("'{}' already exists.", dir.display());
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create '{}'", dir.display()))?;
    for (file, content) in [
        (COMMAND_MANIFEST_FILENAME, HELLO_MANIFEST),
        (HELLO_ACTIONS_FILENAME, HELLO_ACTIONS),
    ] {
        let path = dir.join(file);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        println!("{} {} {}", "→".blue(), "create".bold(), path.display().to_string().green());
    }

    println!(
        "\n{} Try it with: {}",
        "✔".green(),
        format!("crank {} {} --name you", name, sub).cyan()
    );
    Ok(())
}
