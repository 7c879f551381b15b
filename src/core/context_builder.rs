// src/core/context_builder.rs

use crate::core::commons::kebab_case;
use crate::models::Context;
use anyhow::{Context as _, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A pluggable source of derived project facts, merged into the context before a run.
pub trait ModelPopulator {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;
    fn populate(&self, work_dir: &Path, context: &mut Context) -> Result<()>;
}

/// Seeds the evaluation context for one run.
///
/// Every CLI value is bound first under its kebab-cased name, as a string. Populators
/// then run in registration order and may overwrite any key written before them.
pub fn build_context(
    cli_values: &BTreeMap<String, String>,
    populators: &[Box<dyn ModelPopulator>],
    work_dir: &Path,
) -> Result<Context> {
    let mut context: Context = cli_values
        .iter()
        .map(|(name, value)| (kebab_case(name), Value::String(value.clone())))
        .collect();
    log::debug!("Bound {} option value(s) into the context.", context.len());

    for populator in populators {
        let before = context.len();
        populator
            .populate(work_dir, &mut context)
            .with_context(|| format!("Populator '{}' failed", populator.name()))?;
        log::trace!(
            "Populator '{}' ran ({} new key(s)).",
            populator.name(),
            context.len() - before
        );
    }
    Ok(context)
}
