//! # Action Handlers
//!
//! One module per action kind. Handlers render their templated fields against the
//! context, act on the filesystem or a child process, and report whether they applied.
//!
//! - **`generate`**: writes a new file from inline text or a template file.
//! - **`inject`**: inserts text into an existing file, once.
//! - **`maven`**: queues build descriptor entries for a single patch per document.
//! - **`exec`**: runs a command and records its output in the context.
//! - **`vars`**: asks questions and persists the answers in the role store.

pub mod exec;
pub mod generate;
pub mod inject;
pub mod maven;
pub mod vars;

use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::core::interpolator::TemplateEngine;
use crate::core::paths;
use crate::core::pipeline::PipelineError;
use crate::models::Context;

/// Whether an action changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    Skipped,
}

/// The collaborators and locations shared by every handler during one action.
pub struct ActionEnv<'a> {
    pub engine: &'a dyn TemplateEngine,
    /// The invocation working directory. Relative targets resolve against it.
    pub work_dir: &'a Path,
    /// Directory of the action file being executed.
    pub action_dir: &'a Path,
    pub timeout: Duration,
}

impl ActionEnv<'_> {
    pub fn render(&self, template: &str, context: &Context) -> Result<String, PipelineError> {
        Ok(self.engine.render(template, context)?)
    }

    /// Renders a path template and resolves it against the working directory.
    pub fn resolve(&self, template: &str, context: &Context) -> Result<PathBuf, PipelineError> {
        let rendered = self.render(template, context)?;
        Ok(paths::resolve_against(self.work_dir, &rendered)?)
    }

    /// A path relative to the working directory when possible, for display.
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(self.work_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Writes `content` through a temporary file in the target directory, then moves it in place.
pub fn write_atomically(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    let io_err = |source: std::io::Error| PipelineError::IoWrite {
        path: path.display().to_string(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Reads a file the action depends on.
pub fn read_text(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|e| PipelineError::IoRead {
        path: path.display().to_string(),
        source: e,
    })
}

pub(crate) fn announce(kind: &str, detail: &str) {
    println!("{} {} {}", "→".blue(), kind.bold(), detail.green());
}

pub(crate) fn notice(message: &str) {
    println!("  {}", message.dimmed());
}
