// src/core/populators.rs

use crate::constants::{CTX_MAVEN_MODEL, POM_FILENAME};
use crate::core::context_builder::ModelPopulator;
use crate::maven::pom::PomModel;
use crate::models::Context;
use crate::system::var_store::VariableStore;
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::path::Path;

/// Host facts: `os-name`, `os-arch` and `working-dir`.
#[derive(Debug, Default)]
pub struct SystemPopulator;

impl ModelPopulator for SystemPopulator {
    fn name(&self) -> &'static str {
        "system"
    }

    fn populate(&self, work_dir: &Path, context: &mut Context) -> Result<()> {
        context.insert("os-name".into(), Value::String(std::env::consts::OS.into()));
        context.insert("os-arch".into(), Value::String(std::env::consts::ARCH.into()));
        context.insert(
            "working-dir".into(),
            Value::String(dunce::simplified(work_dir).display().to_string()),
        );
        Ok(())
    }
}

/// Exposes the project's `pom.xml` as `maven-model`, plus a few flat convenience keys.
/// Contributes nothing when there is no descriptor.
#[derive(Debug, Default)]
pub struct MavenPopulator;

impl ModelPopulator for MavenPopulator {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn populate(&self, work_dir: &Path, context: &mut Context) -> Result<()> {
        let pom_path = work_dir.join(POM_FILENAME);
        if !pom_path.is_file() {
            log::debug!("No {} in '{}'.", POM_FILENAME, work_dir.display());
            return Ok(());
        }
        let model = PomModel::load(&pom_path)?;

        let flat = [
            ("artifact-id", model.artifact_id.as_deref()),
            ("group-id", model.group_id.as_deref()),
            ("project-version", model.version.as_deref()),
            ("java-version", model.java_version()),
        ];
        for (key, value) in flat {
            if let Some(value) = value {
                context.insert(key.to_string(), Value::String(value.to_string()));
            }
        }

        let json = serde_json::to_value(&model).context("Could not serialize the maven model")?;
        context.insert(CTX_MAVEN_MODEL.to_string(), json);
        Ok(())
    }
}

/// Merges the default role's persisted variables.
pub struct RoleVarsPopulator<S: VariableStore> {
    store: S,
}

impl<S: VariableStore> RoleVarsPopulator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: VariableStore> ModelPopulator for RoleVarsPopulator<S> {
    fn name(&self) -> &'static str {
        "role-vars"
    }

    fn populate(&self, _work_dir: &Path, context: &mut Context) -> Result<()> {
        for (key, value) in self.store.load_as_map("")? {
            let value = Value::String(value);
            if let Some(previous) = context.get(&key)
                && *previous != value
            {
                log::warn!(
                    "Stored variable '{}' overrides the value given for this run ({} -> {}).",
                    key,
                    previous,
                    value
                );
            }
            context.insert(key, value);
        }
        Ok(())
    }
}

/// Reads the resolved project model back out of a context, if a populator put one there.
pub fn maven_model_from(context: &Context) -> Option<PomModel> {
    let value = context.get(CTX_MAVEN_MODEL)?;
    serde_json::from_value(value.clone())
        .inspect_err(|e| log::warn!("'{}' is not a project model: {}", CTX_MAVEN_MODEL, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::var_store::RoleStore;
    use tempfile::tempdir;

    #[test]
    fn test_system_facts() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new();
        SystemPopulator.populate(dir.path(), &mut ctx).unwrap();
        assert_eq!(ctx["os-name"], Value::String(std::env::consts::OS.into()));
        assert!(ctx.contains_key("working-dir"));
    }

    #[test]
    fn test_maven_facts_and_round_trip_through_context() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("pom.xml"),
            "<project>\n  <groupId>com.acme</groupId>\n  <artifactId>shop</artifactId>\n  \
             <version>1.2.0</version>\n  <properties>\n    <java.version>17</java.version>\n  \
             </properties>\n  <dependencies>\n    <dependency>\n      <groupId>g</groupId>\n      \
             <artifactId>a</artifactId>\n    </dependency>\n  </dependencies>\n</project>\n",
        )
        .unwrap();
        let mut ctx = Context::new();

        // --- Execute ---
        MavenPopulator.populate(dir.path(), &mut ctx).unwrap();

        // --- Assert ---
        assert_eq!(ctx["artifact-id"], Value::String("shop".into()));
        assert_eq!(ctx["group-id"], Value::String("com.acme".into()));
        assert_eq!(ctx["java-version"], Value::String("17".into()));
        assert_eq!(ctx[CTX_MAVEN_MODEL]["version"], "1.2.0");

        let model = maven_model_from(&ctx).unwrap();
        assert!(model.has_dependency("a"));
    }

    #[test]
    fn test_no_pom_contributes_nothing() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new();
        MavenPopulator.populate(dir.path(), &mut ctx).unwrap();
        assert!(ctx.is_empty());
        assert!(maven_model_from(&ctx).is_none());
    }

    #[test]
    fn test_role_vars_are_merged() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path());
        store.update_role("", "language", "java").unwrap();
        let mut ctx = Context::new();
        RoleVarsPopulator::new(store).populate(dir.path(), &mut ctx).unwrap();
        assert_eq!(ctx["language"], Value::String("java".into()));
    }

    #[test]
    fn test_stored_role_var_overrides_given_value() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path());
        store.update_role("", "name", "stored").unwrap();
        let mut ctx = Context::new();
        ctx.insert("name".into(), Value::String("given".into()));
        ctx.insert("other".into(), Value::String("kept".into()));

        RoleVarsPopulator::new(store).populate(dir.path(), &mut ctx).unwrap();

        assert_eq!(ctx["name"], Value::String("stored".into()));
        assert_eq!(ctx["other"], Value::String("kept".into()));
    }
}
