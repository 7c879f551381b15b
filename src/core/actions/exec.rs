// src/core/actions/exec.rs

use super::{ActionEnv, ActionOutcome, announce, notice, read_text};
use crate::constants::{CTX_EXIT_VALUE, CTX_STDERR, CTX_STDOUT, CTX_STDOUT_JSON_PATH};
use crate::core::json_path::JsonPath;
use crate::core::pipeline::PipelineError;
use crate::models::{Context, Exec};
use crate::system::executor::{self, ExecRequest};
use colored::Colorize;
use serde_json::Value;

/// Runs the command and records `exit-value`, captured streams and the optional JSON query.
/// A non-zero exit is reported and recorded, never raised.
pub fn run(
    action: &Exec,
    env: &ActionEnv<'_>,
    context: &mut Context,
) -> Result<ActionOutcome, PipelineError> {
    let command_line = command_line(action, env, context)?;
    let cwd = match &action.dir {
        Some(dir) => env.resolve(dir, context)?,
        None => env.work_dir.to_path_buf(),
    };
    let stdout_to = action
        .to
        .as_deref()
        .map(|t| env.resolve(t, context))
        .transpose()?;
    let stderr_to = action
        .errto
        .as_deref()
        .map(|t| env.resolve(t, context))
        .transpose()?;

    announce("exec", &command_line);
    let request = ExecRequest {
        command_line: command_line.clone(),
        cwd,
        stdout_to,
        stderr_to,
        timeout: env.timeout,
    };
    let outcome = executor::execute_with_capture(&request)?;
    log::debug!("'{}' exited with code {}.", command_line, outcome.exit_code);

    context.insert(CTX_EXIT_VALUE.to_string(), Value::from(outcome.exit_code));
    if let Some(stdout) = &outcome.stdout {
        context.insert(
            CTX_STDOUT.to_string(),
            Value::String(stdout.trim_end().to_string()),
        );
    }
    if let Some(stderr) = &outcome.stderr {
        context.insert(
            CTX_STDERR.to_string(),
            Value::String(stderr.trim_end().to_string()),
        );
    }

    if let Some(path) = &action.json_path
        && outcome.success()
        && let Some(stdout) = &outcome.stdout
    {
        let query = JsonPath::parse(&env.render(path, context)?)?;
        match serde_json::from_str::<Value>(stdout) {
            Ok(document) => {
                let found = query.query(&document).unwrap_or(Value::Null);
                context.insert(CTX_STDOUT_JSON_PATH.to_string(), found);
            }
            Err(e) => log::warn!("Output of '{}' is not JSON: {}", command_line, e),
        }
    }

    if !outcome.success() {
        notice(&format!(
            "'{}' exited with code {}.",
            command_line,
            outcome.exit_code.to_string().red()
        ));
    }
    Ok(ActionOutcome::Applied)
}

/// The inline command, or the first non-empty line of `commandFile`, rendered.
fn command_line(
    action: &Exec,
    env: &ActionEnv<'_>,
    context: &Context,
) -> Result<String, PipelineError> {
    match (&action.command, &action.command_file) {
        (Some(command), _) => env.render(command, context),
        (None, Some(file)) => {
            let path = env.action_dir.join(env.render(file, context)?);
            let content = read_text(&path)?;
            let line = content
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .ok_or_else(|| PipelineError::InvalidAction {
                    kind: "exec",
                    reason: format!("'{}' contains no command", path.display()),
                })?;
            env.render(line, context)
        }
        (None, None) => Err(PipelineError::InvalidAction {
            kind: "exec",
            reason: "one of 'command' or 'commandFile' is required".into(),
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::interpolator::MustacheEngine;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn exec(command: &str) -> Exec {
        Exec {
            command: Some(command.into()),
            ..Default::default()
        }
    }

    fn env(dir: &std::path::Path) -> ActionEnv<'_> {
        ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir,
            action_dir: dir,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_captures_trimmed_stdout_and_exit_value() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new();
        run(&exec("echo 123"), &env(dir.path()), &mut ctx).unwrap();
        assert_eq!(ctx[CTX_STDOUT], json!("123"));
        assert_eq!(ctx[CTX_EXIT_VALUE], json!(0));
    }

    #[test]
    fn test_missing_binary_is_recorded_not_raised() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new();
        let outcome = run(&exec("no-such-binary-for-crank"), &env(dir.path()), &mut ctx);
        assert!(outcome.is_ok());
        assert_ne!(ctx[CTX_EXIT_VALUE], json!(0));
        assert!(!ctx[CTX_STDERR].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_json_path_on_stdout() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new();
        let mut action = exec(r#"echo '{"project": {"version": "1.4.2"}}'"#);
        action.json_path = Some("$.project.version".into());
        run(&action, &env(dir.path()), &mut ctx).unwrap();
        assert_eq!(ctx[CTX_STDOUT_JSON_PATH], json!("1.4.2"));
    }

    #[test]
    fn test_command_file_and_redirect() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cmd.txt"), "\n  echo {{greeting}}\nignored\n").unwrap();
        let mut ctx = Context::new();
        ctx.insert("greeting".into(), json!("hey"));
        let action = Exec {
            command_file: Some("cmd.txt".into()),
            to: Some("logs/out.txt".into()),
            ..Default::default()
        };

        run(&action, &env(dir.path()), &mut ctx).unwrap();

        let logged = fs::read_to_string(dir.path().join("logs").join("out.txt")).unwrap();
        assert_eq!(logged.trim_end(), "hey");
        assert!(!ctx.contains_key(CTX_STDOUT));
        assert_eq!(ctx[CTX_EXIT_VALUE], json!(0));
    }
}
