// src/core/actions/vars.rs

use super::{ActionEnv, ActionOutcome, announce};
use crate::core::commons::kebab_case;
use crate::core::interpolator::value_to_text;
use crate::core::pipeline::PipelineError;
use crate::models::{Context, Question, Vars};
use crate::system::prompt::Prompter;
use crate::system::var_store::VariableStore;
use serde_json::Value;

/// Question types that can be asked.
fn check_question(question: &Question) -> Result<(), PipelineError> {
    match question.kind.as_str() {
        "input" => Ok(()),
        "dropdown" if !question.options.multiple => Ok(()),
        _ => Err(PipelineError::InvalidQuestionType {
            name: question.name.clone(),
            kind: if question.options.multiple {
                format!("{} (multiple)", question.kind)
            } else {
                question.kind.clone()
            },
        }),
    }
}

/// Answers every question (from the context when already known, else by prompting)
/// and stores answers and `data` in the role store and the context.
pub fn run(
    action: &Vars,
    env: &ActionEnv<'_>,
    context: &mut Context,
    prompter: &mut dyn Prompter,
    store: &dyn VariableStore,
) -> Result<ActionOutcome, PipelineError> {
    // Every question is checked before the first prompt.
    for question in &action.questions {
        check_question(question)?;
    }
    let role = match &action.role {
        Some(role) => env.render(role, context)?,
        None => String::new(),
    };

    let mut names: Vec<&str> = Vec::new();
    for question in &action.questions {
        let answer = match known_answer(context, &question.name) {
            Some(answer) => {
                log::debug!("'{}' answered from the context.", question.name);
                answer
            }
            None => ask(question, env, context, prompter)?,
        };
        if !question.options.choices.is_empty()
            && !question.options.choices.contains_key(&answer)
        {
            log::warn!(
                "'{}' is not one of the choices declared for '{}'.",
                answer,
                question.name
            );
        }
        store.update_role(&role, &question.name, &answer)?;
        context.insert(question.name.clone(), Value::String(answer));
        names.push(&question.name);
    }

    for (key, template) in &action.data {
        let value = env.render(template, context)?;
        store.update_role(&role, key, &value)?;
        context.insert(key.clone(), Value::String(value));
        names.push(key);
    }

    if names.is_empty() {
        return Ok(ActionOutcome::Skipped);
    }
    let scope = if role.is_empty() { "default role" } else { role.as_str() };
    announce("vars", &format!("{} ({})", names.join(", "), scope));
    Ok(ActionOutcome::Applied)
}

fn known_answer(context: &Context, name: &str) -> Option<String> {
    context
        .get(name)
        .or_else(|| context.get(&kebab_case(name)))
        .filter(|v| !v.is_null())
        .map(value_to_text)
}

fn ask(
    question: &Question,
    env: &ActionEnv<'_>,
    context: &Context,
    prompter: &mut dyn Prompter,
) -> Result<String, PipelineError> {
    let label = match &question.label {
        Some(label) => env.render(label, context)?,
        None => question.name.clone(),
    };
    let default = question
        .default_value
        .as_deref()
        .map(|d| env.render(d, context))
        .transpose()?;

    let answer = if question.kind == "dropdown" {
        let choices: Vec<(String, String)> = question
            .options
            .choices
            .iter()
            .map(|(key, text)| (key.clone(), text.clone()))
            .collect();
        prompter.select(&label, &choices, default.as_deref())?
    } else {
        prompter.input(&label, default.as_deref())?
    };
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::MustacheEngine;
    use crate::models::QuestionOptions;
    use crate::system::prompt::ScriptedPrompter;
    use crate::system::var_store::RoleStore;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::tempdir;

    fn question(name: &str, kind: &str) -> Question {
        Question {
            name: name.into(),
            label: Some(format!("Your {}?", name)),
            kind: kind.into(),
            options: QuestionOptions::default(),
            default_value: None,
        }
    }

    #[test]
    fn test_answers_go_to_store_and_context() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        let store = RoleStore::new(dir.path().join("roles"));
        let mut prompter = ScriptedPrompter::new(["java"]);
        let mut ctx = Context::new();
        ctx.insert("build-tool".into(), json!("maven"));
        let action = Vars {
            questions: vec![question("language", "input"), question("buildTool", "dropdown")],
            data: BTreeMap::from([("summary".to_string(), "{{language}}/{{buildTool}}".to_string())]),
            role: Some("backend".into()),
        };

        // --- Execute ---
        let outcome = run(&action, &env, &mut ctx, &mut prompter, &store).unwrap();

        // --- Assert ---
        assert_eq!(outcome, ActionOutcome::Applied);
        // `buildTool` was known through its kebab-cased CLI value, only `language` was asked.
        assert_eq!(prompter.asked, vec!["Your language?".to_string()]);
        assert_eq!(ctx["summary"], json!("java/maven"));
        let stored = store.load_as_map("backend").unwrap();
        assert_eq!(stored.get("language").map(String::as_str), Some("java"));
        assert_eq!(stored.get("summary").map(String::as_str), Some("java/maven"));
    }

    #[test]
    fn test_unsupported_types_fail_before_any_prompt() {
        let dir = tempdir().unwrap();
        let env = ActionEnv {
            engine: &MustacheEngine,
            work_dir: dir.path(),
            action_dir: dir.path(),
            timeout: Duration::from_secs(5),
        };
        let store = RoleStore::new(dir.path());

        let mut multi = question("modules", "dropdown");
        multi.options.multiple = true;
        for bad in [question("where", "path"), multi] {
            let mut prompter = ScriptedPrompter::new(["x", "y"]);
            let action = Vars {
                questions: vec![question("first", "input"), bad],
                ..Default::default()
            };
            let err = run(&action, &env, &mut Context::new(), &mut prompter, &store).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidQuestionType { .. }));
            assert!(prompter.asked.is_empty());
        }
    }
}
