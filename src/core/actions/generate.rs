// src/core/actions/generate.rs

use super::{ActionEnv, ActionOutcome, announce, notice, read_text, write_atomically};
use crate::core::pipeline::PipelineError;
use crate::models::{Context, Generate};

/// Writes `text` (or the rendered `from` template) to `to`.
/// An existing target is left untouched unless `overwrite` is set.
pub fn run(
    action: &Generate,
    env: &ActionEnv<'_>,
    context: &Context,
) -> Result<ActionOutcome, PipelineError> {
    let target = env.resolve(&action.to, context)?;
    let shown = env.display(&target);

    if target.exists() && !action.overwrite {
        notice(&format!("'{}' already exists, skipping.", shown));
        return Ok(ActionOutcome::Skipped);
    }

    let template = match (&action.text, &action.from) {
        (Some(text), _) => text.clone(),
        (None, Some(from)) => {
            let source = env.action_dir.join(env.render(from, context)?);
            log::debug!("Generating '{}' from '{}'.", shown, source.display());
            read_text(&source)?
        }
        (None, None) => {
            return Err(PipelineError::InvalidAction {
                kind: "generate",
                reason: "one of 'text' or 'from' is required".into(),
            });
        }
    };

    let content = env.render(&template, context)?;
    write_atomically(&target, content.as_bytes())?;
    announce("generate", &shown);
    Ok(ActionOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::MustacheEngine;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn generate(text: Option<&str>, from: Option<&str>, overwrite: bool) -> Generate {
        Generate {
            text: text.map(str::to_string),
            from: from.map(str::to_string),
            to: "out/{{name}}.txt".into(),
            overwrite,
        }
    }

    #[test]
    fn test_overwrite_controls_idempotence() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        let mut ctx = Context::new();
        ctx.insert("name".into(), json!("hello"));
        let target = dir.path().join("out").join("hello.txt");

        // --- Execute & Assert ---
        let first = run(&generate(Some("v1 {{name}}"), None, false), &env, &ctx).unwrap();
        assert_eq!(first, ActionOutcome::Applied);
        assert_eq!(fs::read_to_string(&target).unwrap(), "v1 hello");

        let second = run(&generate(Some("v2"), None, false), &env, &ctx).unwrap();
        assert_eq!(second, ActionOutcome::Skipped);
        assert_eq!(fs::read_to_string(&target).unwrap(), "v1 hello");

        let third = run(&generate(Some("v3"), None, true), &env, &ctx).unwrap();
        assert_eq!(third, ActionOutcome::Applied);
        assert_eq!(fs::read_to_string(&target).unwrap(), "v3");
    }

    #[test]
    fn test_from_reads_template_next_to_action_file() {
        let work = tempdir().unwrap();
        let actions = tempdir().unwrap();
        fs::write(actions.path().join("greeting.tpl"), "Hi {{name}}!").unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: work.path(),
            action_dir: actions.path(),
            timeout: Duration::from_secs(5),
        };
        let mut ctx = Context::new();
        ctx.insert("name".into(), json!("bob"));

        run(&generate(None, Some("greeting.tpl"), false), &env, &ctx).unwrap();

        let written = fs::read_to_string(work.path().join("out").join("bob.txt")).unwrap();
        assert_eq!(written, "Hi bob!");
    }

    #[test]
    fn test_unresolved_placeholder_fails_before_writing() {
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        let err = run(&generate(Some("x"), None, false), &env, &Context::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Template(_)));
        assert!(!dir.path().join("out").exists());
    }
}
