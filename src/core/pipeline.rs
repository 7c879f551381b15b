// src/core/pipeline.rs

use crate::{
    core::{
        actions::{self, ActionEnv, ActionOutcome, maven::MavenQueue},
        interpolator::{TemplateEngine, TemplateError},
        json_path::JsonPathError,
        paths::PathError,
        populators::maven_model_from,
    },
    maven::{
        descriptor::{DescriptorError, DescriptorKind},
        patcher::{DescriptorPatcher, PatchError},
    },
    models::{Action, ActionsFile, Context},
    system::{
        executor::ExecutionError,
        prompt::{PromptError, Prompter},
        var_store::{StoreError, VariableStore},
    },
};
use colored::Colorize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No action files found for this command.")]
    NoActionsFound,
    #[error("'{file}' requires the dependency '{artifact_id}', which the project does not declare.")]
    ConditionalNotSatisfied { file: String, artifact_id: String },
    #[error("Template Error: {0}")]
    Template(#[from] TemplateError),
    #[error("Build Descriptor Error: {0}")]
    Patch(#[from] PatchError),
    #[error("Invalid build descriptor entry: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("Failed to write '{path}': {source}")]
    IoWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read '{path}': {source}")]
    IoRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Execution Error: {0}")]
    ExecutionFailed(#[from] ExecutionError),
    #[error("Question '{name}' has unsupported type '{kind}'.")]
    InvalidQuestionType { name: String, kind: String },
    #[error("Variable Store Error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Prompt(#[from] PromptError),
    #[error("{0}")]
    JsonPath(#[from] JsonPathError),
    #[error("Invalid '{kind}' action: {reason}")]
    InvalidAction { kind: &'static str, reason: String },
    #[error("{0}")]
    Path(#[from] PathError),
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub executed: usize,
    pub skipped: usize,
}

/// Interprets action files against one evaluation context.
///
/// Files run in path order; actions within a file run in declaration order, each
/// seeing what earlier ones wrote to the context. The first error aborts the run.
/// Nothing already applied is rolled back.
pub struct ActionPipeline<'a> {
    pub engine: &'a dyn TemplateEngine,
    pub patcher: &'a dyn DescriptorPatcher,
    pub store: &'a dyn VariableStore,
    pub prompter: &'a mut dyn Prompter,
    pub work_dir: &'a Path,
    pub timeout: Duration,
}

impl ActionPipeline<'_> {
    pub fn run(
        &mut self,
        files: &BTreeMap<PathBuf, ActionsFile>,
        context: &mut Context,
    ) -> Result<RunSummary, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::NoActionsFound);
        }

        let mut summary = RunSummary::default();
        let mut queue = MavenQueue::default();

        for (path, file) in files {
            let action_dir = path.parent().unwrap_or(self.work_dir);
            let env = ActionEnv {
                engine: self.engine,
                work_dir: self.work_dir,
                action_dir,
                timeout: self.timeout,
            };
            let shown = env.display(path);

            if let Some(conditional) = &file.conditional {
                // Pending descriptor changes count towards the project model.
                queue.flush(self.patcher, self.work_dir, context)?;
                let artifact_id = env.render(&conditional.artifact_id, context)?;
                let satisfied = maven_model_from(context)
                    .is_some_and(|model| model.has_dependency(&artifact_id));
                if !satisfied {
                    return Err(PipelineError::ConditionalNotSatisfied {
                        file: shown,
                        artifact_id,
                    });
                }
                log::debug!("Conditional on '{}' satisfied for '{}'.", artifact_id, shown);
            }

            summary.files += 1;
            if file.actions.is_empty() {
                println!("{}", format!("'{}' declares no actions.", shown).dimmed());
                continue;
            }
            log::debug!("Running {} action(s) from '{}'.", file.actions.len(), shown);

            for action in &file.actions {
                let outcome = match self.execute(action, &env, context, &mut queue) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        // Entries queued before the failure were reported as applied.
                        if let Err(flush_err) = queue.flush(self.patcher, self.work_dir, context) {
                            log::warn!("Pending descriptor changes were not written: {}", flush_err);
                        }
                        return Err(e);
                    }
                };
                match outcome {
                    ActionOutcome::Applied => summary.executed += 1,
                    ActionOutcome::Skipped => summary.skipped += 1,
                }
            }
        }

        queue.flush(self.patcher, self.work_dir, context)?;
        Ok(summary)
    }

    fn execute(
        &mut self,
        action: &Action,
        env: &ActionEnv<'_>,
        context: &mut Context,
        queue: &mut MavenQueue,
    ) -> Result<ActionOutcome, PipelineError> {
        log::trace!("Executing '{}' action.", action.kind());
        if !action.is_descriptor_injection() {
            // Anything else may read pom.xml or render `maven-model`.
            queue.flush(self.patcher, env.work_dir, context)?;
        }
        match action {
            Action::Generate(generate) => actions::generate::run(generate, env, context),
            Action::Inject(inject) => actions::inject::run(inject, env, context),
            Action::InjectMavenDependency(m) => {
                actions::maven::queue(DescriptorKind::Dependency, m, env, context, queue)
            }
            Action::InjectMavenDependencyManagement(m) => {
                actions::maven::queue(DescriptorKind::ManagedDependency, m, env, context, queue)
            }
            Action::InjectMavenRepository(m) => {
                actions::maven::queue(DescriptorKind::Repository, m, env, context, queue)
            }
            Action::InjectMavenBuildPlugin(m) => {
                actions::maven::queue(DescriptorKind::Plugin, m, env, context, queue)
            }
            Action::Exec(exec) => actions::exec::run(exec, env, context),
            Action::Vars(vars) => {
                actions::vars::run(vars, env, context, &mut *self.prompter, self.store)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolator::MustacheEngine;
    use crate::maven::patcher::PomPatcher;
    use crate::system::prompt::ScriptedPrompter;
    use crate::system::var_store::RoleStore;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn file(yaml: &str) -> ActionsFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn run_files(
        work_dir: &Path,
        files: &BTreeMap<PathBuf, ActionsFile>,
        context: &mut Context,
    ) -> Result<RunSummary, PipelineError> {
        let store = RoleStore::new(work_dir.join(".crank/roles/vars"));
        let mut prompter = ScriptedPrompter::default();
        let mut pipeline = ActionPipeline {
            engine: &MustacheEngine,
            patcher: &PomPatcher,
            store: &store,
            prompter: &mut prompter,
            work_dir,
            timeout: Duration::from_secs(10),
        };
        pipeline.run(files, context)
    }

    #[test]
    fn test_empty_map_is_an_error() {
        let dir = tempdir().unwrap();
        let err = run_files(dir.path(), &BTreeMap::new(), &mut Context::new()).unwrap_err();
        assert!(matches!(err, PipelineError::NoActionsFound));
    }

    #[test]
    fn test_failed_conditional_stops_everything() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let actions = dir.path().join("actions");
        let files = BTreeMap::from([
            (
                actions.join("01-gated.yaml"),
                file("conditional:\n  artifactId: spring-boot-starter-web\nactions:\n  - generate:\n      text: x\n      to: gated.txt\n"),
            ),
            (
                actions.join("02-after.yaml"),
                file("actions:\n  - generate:\n      text: y\n      to: after.txt\n"),
            ),
        ]);
        let mut ctx = Context::new();
        ctx.insert("name".into(), json!("demo"));
        let before = ctx.clone();

        // --- Execute ---
        let err = run_files(dir.path(), &files, &mut ctx).unwrap_err();

        // --- Assert ---
        assert!(matches!(err, PipelineError::ConditionalNotSatisfied { .. }));
        assert!(!dir.path().join("gated.txt").exists());
        assert!(!dir.path().join("after.txt").exists());
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_empty_action_list_is_only_a_notice() {
        let dir = tempdir().unwrap();
        let files = BTreeMap::from([
            (dir.path().join("a.yaml"), file("actions: []\n")),
            (
                dir.path().join("b.yaml"),
                file("actions:\n  - generate:\n      text: ok\n      to: b.txt\n"),
            ),
        ]);
        let summary = run_files(dir.path(), &files, &mut Context::new()).unwrap();
        assert_eq!(
            summary,
            RunSummary {
                files: 2,
                executed: 1,
                skipped: 0
            }
        );
    }

    #[test]
    fn test_vars_data_flows_into_later_files() {
        let dir = tempdir().unwrap();
        let files = BTreeMap::from([
            (
                dir.path().join("1.yaml"),
                file("actions:\n  - vars:\n      data:\n        greeting: Hello {{name}}\n"),
            ),
            (
                dir.path().join("2.yaml"),
                file("actions:\n  - generate:\n      text: \"{{greeting}}\"\n      to: hello.txt\n"),
            ),
        ]);
        let mut ctx = Context::new();
        ctx.insert("name".into(), json!("world"));

        run_files(dir.path(), &files, &mut ctx).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("hello.txt")).unwrap(),
            "Hello world"
        );
        let stored = RoleStore::new(dir.path().join(".crank/roles/vars"))
            .load_as_map("")
            .unwrap();
        assert_eq!(stored.get("greeting").map(String::as_str), Some("Hello world"));
    }

    #[test]
    fn test_dependency_injection_is_flushed_at_end_of_run() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project>\n  <artifactId>demo</artifactId>\n</project>\n",
        )
        .unwrap();
        let files = BTreeMap::from([(
            dir.path().join("deps.yaml"),
            file("actions:\n  - injectMavenDependency:\n      text: org.example:lib:1.0\n  - injectMavenDependency:\n      text: org.example:lib:1.0\n"),
        )]);

        let summary = run_files(dir.path(), &files, &mut Context::new()).unwrap();

        assert_eq!(summary.executed, 1);
        assert_eq!(summary.skipped, 1);
        let pom = fs::read_to_string(dir.path().join("pom.xml")).unwrap();
        assert_eq!(pom.matches("<artifactId>lib</artifactId>").count(), 1);
        assert!(pom.contains("  <dependencies>\n    <dependency>"));
    }

    #[test]
    fn test_queued_dependency_is_visible_to_next_action() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project>\n  <artifactId>demo</artifactId>\n</project>\n",
        )
        .unwrap();
        let files = BTreeMap::from([(
            dir.path().join("deps.yaml"),
            file("actions:\n  - injectMavenDependency:\n      text: org.example:lib:1.0\n  - generate:\n      text: \"{{maven-model.dependencies.0.artifactId}}\"\n      to: dep.txt\n"),
        )]);
        let mut ctx = Context::new();
        crate::core::context_builder::ModelPopulator::populate(
            &crate::core::populators::MavenPopulator,
            dir.path(),
            &mut ctx,
        )
        .unwrap();

        // --- Execute ---
        run_files(dir.path(), &files, &mut ctx).unwrap();

        // --- Assert ---
        assert_eq!(fs::read_to_string(dir.path().join("dep.txt")).unwrap(), "lib");
    }

    #[test]
    fn test_queued_entries_are_written_when_a_later_action_fails() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project>\n  <artifactId>demo</artifactId>\n</project>\n",
        )
        .unwrap();
        let files = BTreeMap::from([(
            dir.path().join("deps.yaml"),
            file("actions:\n  - injectMavenDependency:\n      text: org.example:lib:1.0\n  - injectMavenDependency:\n      text: \"<dependency><artifactId>x</artifactId></dependency>\"\n"),
        )]);

        let err = run_files(dir.path(), &files, &mut Context::new()).unwrap_err();

        assert!(matches!(err, PipelineError::Descriptor(_)));
        let pom = fs::read_to_string(dir.path().join("pom.xml")).unwrap();
        assert!(pom.contains("<artifactId>lib</artifactId>"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_output_is_visible_to_later_actions() {
        let dir = tempdir().unwrap();
        let files = BTreeMap::from([(
            dir.path().join("run.yaml"),
            file("actions:\n  - exec:\n      command: echo 123\n  - generate:\n      text: \"{{stdout}}/{{exit-value}}\"\n      to: out.txt\n"),
        )]);
        let mut ctx = Context::new();

        run_files(dir.path(), &files, &mut ctx).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "123/0");
    }
}
