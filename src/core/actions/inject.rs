// src/core/actions/inject.rs

use super::{ActionEnv, ActionOutcome, announce, notice, read_text, write_atomically};
use crate::core::pipeline::PipelineError;
use crate::models::{Context, Inject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    After,
    Before,
}

/// Inserts rendered `text` into an existing file, at most once.
pub fn run(
    action: &Inject,
    env: &ActionEnv<'_>,
    context: &Context,
) -> Result<ActionOutcome, PipelineError> {
    let target = env.resolve(&action.to, context)?;
    let shown = env.display(&target);
    if !target.is_file() {
        notice(&format!("'{}' does not exist, nothing to inject into.", shown));
        return Ok(ActionOutcome::Skipped);
    }

    let anchor = match (&action.after, &action.before) {
        (Some(_), Some(_)) => {
            return Err(PipelineError::InvalidAction {
                kind: "inject",
                reason: "'after' and 'before' are mutually exclusive".into(),
            });
        }
        (Some(marker), None) => Some((Anchor::After, env.render(marker, context)?)),
        (None, Some(marker)) => Some((Anchor::Before, env.render(marker, context)?)),
        (None, None) => None,
    };

    let content = read_text(&target)?;
    let text = env.render(&action.text, context)?;

    if let Some(skip) = &action.skip {
        let skip = env.render(skip, context)?;
        if !skip.is_empty() && content.contains(&skip) {
            notice(&format!("'{}' already contains '{}', skipping.", shown, skip));
            return Ok(ActionOutcome::Skipped);
        }
    }
    let needle = text.trim_end();
    if !needle.is_empty() && content.contains(needle) {
        notice(&format!("'{}' already contains the text, skipping.", shown));
        return Ok(ActionOutcome::Skipped);
    }

    let Some(updated) = insert(&content, &text, anchor.as_ref()) else {
        let marker = anchor.map(|(_, m)| m).unwrap_or_default();
        notice(&format!("Marker '{}' not found in '{}', skipping.", marker, shown));
        return Ok(ActionOutcome::Skipped);
    };

    write_atomically(&target, updated.as_bytes())?;
    announce("inject", &shown);
    Ok(ActionOutcome::Applied)
}

/// `None` when the anchor marker does not occur in `content`.
fn insert(content: &str, text: &str, anchor: Option<&(Anchor, String)>) -> Option<String> {
    let mut block = text.to_string();
    if !block.ends_with('\n') {
        block.push('\n');
    }

    let Some((anchor, marker)) = anchor else {
        let mut out = content.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
        return Some(out);
    };

    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.contains(marker.as_str()) {
            let mut out = String::with_capacity(content.len() + block.len() + 1);
            match anchor {
                Anchor::Before => {
                    out.push_str(content.get(..offset)?);
                    out.push_str(&block);
                    out.push_str(content.get(offset..)?);
                }
                Anchor::After => {
                    let end = offset + line.len();
                    out.push_str(content.get(..end)?);
                    if !line.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(&block);
                    out.push_str(content.get(end..)?);
                }
            }
            return Some(out);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::MustacheEngine;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn inject(text: &str, after: Option<&str>, before: Option<&str>) -> Inject {
        Inject {
            to: "app.properties".into(),
            text: text.into(),
            after: after.map(str::to_string),
            before: before.map(str::to_string),
            skip: None,
        }
    }

    #[test]
    fn test_insert_positions() {
        let content = "a\n# marker\nb\n";
        let after = (Anchor::After, "marker".to_string());
        let before = (Anchor::Before, "marker".to_string());

        assert_eq!(insert(content, "x", Some(&after)).unwrap(), "a\n# marker\nx\nb\n");
        assert_eq!(insert(content, "x", Some(&before)).unwrap(), "a\nx\n# marker\nb\n");
        assert_eq!(insert(content, "x\n", None).unwrap(), "a\n# marker\nb\nx\n");
        assert_eq!(insert("no newline", "x", None).unwrap(), "no newline\nx\n");
        assert!(insert(content, "x", Some(&(Anchor::After, "nope".into()))).is_none());
    }

    #[test]
    fn test_injects_once_and_skips_missing_target() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        let ctx = Context::new();
        let action = inject("server.port=8080", Some("# server"), None);

        // --- Execute & Assert ---
        assert_eq!(run(&action, &env, &ctx).unwrap(), ActionOutcome::Skipped);

        let target = dir.path().join("app.properties");
        fs::write(&target, "# server\nname=demo\n").unwrap();
        assert_eq!(run(&action, &env, &ctx).unwrap(), ActionOutcome::Applied);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "# server\nserver.port=8080\nname=demo\n"
        );

        assert_eq!(run(&action, &env, &ctx).unwrap(), ActionOutcome::Skipped);
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "# server\nserver.port=8080\nname=demo\n"
        );
    }

    #[test]
    fn test_skip_marker_and_conflicting_anchors() {
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        fs::write(dir.path().join("app.properties"), "port=1\n").unwrap();

        let mut action = inject("port=2", None, None);
        action.skip = Some("port=".into());
        assert_eq!(run(&action, &env, &Context::new()).unwrap(), ActionOutcome::Skipped);

        let both = inject("x", Some("a"), Some("b"));
        assert!(matches!(
            run(&both, &env, &Context::new()),
            Err(PipelineError::InvalidAction { .. })
        ));
    }
}
