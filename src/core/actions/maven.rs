// src/core/actions/maven.rs

use super::{ActionEnv, ActionOutcome, announce, notice, write_atomically};
use crate::constants::{CTX_MAVEN_MODEL, POM_FILENAME};
use crate::core::pipeline::PipelineError;
use crate::core::populators::maven_model_from;
use crate::maven::descriptor::{Descriptor, DescriptorKind};
use crate::maven::patcher::DescriptorPatcher;
use crate::maven::pom::PomModel;
use crate::models::{Context, MavenInjection};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Build descriptor entries waiting to be written, grouped by target document.
#[derive(Debug, Default)]
pub struct MavenQueue {
    pending: BTreeMap<PathBuf, Vec<Descriptor>>,
}

impl MavenQueue {
    pub fn is_empty(&self) -> bool {
        self.pending.values().all(Vec::is_empty)
    }

    fn contains(&self, target: &PathBuf, descriptor: &Descriptor) -> bool {
        self.pending.get(target).is_some_and(|queued| {
            queued
                .iter()
                .any(|q| q.kind == descriptor.kind && q.key() == descriptor.key())
        })
    }

    /// Applies everything queued, one patch per document, and refreshes `maven-model`
    /// for the working directory's descriptor. Returns how many documents changed.
    pub fn flush(
        &mut self,
        patcher: &dyn DescriptorPatcher,
        work_dir: &Path,
        context: &mut Context,
    ) -> Result<usize, PipelineError> {
        let mut changed = 0;
        for (target, descriptors) in std::mem::take(&mut self.pending) {
            if descriptors.is_empty() {
                continue;
            }
            let original = super::read_text(&target)?;
            let patched = patcher.patch(&target, &descriptors)?;
            if patched == original {
                log::debug!("'{}' already up to date.", target.display());
                continue;
            }
            write_atomically(&target, patched.as_bytes())?;
            let shown = target.strip_prefix(work_dir).unwrap_or(&target).display().to_string();
            announce("patch", &format!("{} ({} entries)", shown, descriptors.len()));
            changed += 1;

            if target == work_dir.join(POM_FILENAME)
                && let Some(model) = PomModel::parse(&patched)
                && let Ok(json) = serde_json::to_value(&model)
            {
                context.insert(CTX_MAVEN_MODEL.to_string(), json);
            }
        }
        Ok(changed)
    }
}

/// Parses the entries of an injection action and queues those not yet declared.
pub fn queue(
    kind: DescriptorKind,
    action: &MavenInjection,
    env: &ActionEnv<'_>,
    context: &Context,
    queue: &mut MavenQueue,
) -> Result<ActionOutcome, PipelineError> {
    let target = env.work_dir.join(POM_FILENAME);
    if !target.is_file() {
        notice(&format!("No {} in the working directory, skipping {}.", POM_FILENAME, kind));
        return Ok(ActionOutcome::Skipped);
    }

    let text = env.render(&action.text, context)?;
    let descriptors = Descriptor::parse_all(kind, &text)?;
    let model = maven_model_from(context);

    let mut queued = 0;
    for descriptor in descriptors {
        let declared = model.as_ref().is_some_and(|m| descriptor.is_declared_in(m));
        if declared || queue.contains(&target, &descriptor) {
            notice(&format!("{} '{}' already declared.", kind, descriptor.key()));
            continue;
        }
        log::debug!("Queued {} '{}' for '{}'.", kind, descriptor.key(), target.display());
        queue.pending.entry(target.clone()).or_default().push(descriptor);
        queued += 1;
    }

    Ok(if queued > 0 {
        ActionOutcome::Applied
    } else {
        ActionOutcome::Skipped
    })
}
