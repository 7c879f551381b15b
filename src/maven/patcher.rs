// src/maven/patcher.rs

use std::fs;
use std::path::Path;
use thiserror::Error;

use super::descriptor::{Descriptor, DescriptorKind};
use super::xml::{self, Element};

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Failed to read build descriptor '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Build descriptor '{0}' has no <project> root element.")]
    NoProject(String),
}

/// Merges entries into a build descriptor file and returns its new content.
/// Implementations must be idempotent: entries already present are left alone.
pub trait DescriptorPatcher {
    fn patch(&self, path: &Path, descriptors: &[Descriptor]) -> Result<String, PatchError>;
}

/// Maven's element order below `<project>`.
const PROJECT_ORDER: &[&str] = &[
    "modelVersion",
    "parent",
    "groupId",
    "artifactId",
    "version",
    "packaging",
    "name",
    "description",
    "url",
    "inceptionYear",
    "organization",
    "licenses",
    "developers",
    "contributors",
    "mailingLists",
    "prerequisites",
    "modules",
    "scm",
    "issueManagement",
    "ciManagement",
    "distributionManagement",
    "properties",
    "dependencyManagement",
    "dependencies",
    "repositories",
    "pluginRepositories",
    "build",
    "reporting",
    "profiles",
];

/// Maven's element order below `<build>`.
const BUILD_ORDER: &[&str] = &[
    "defaultGoal",
    "directory",
    "finalName",
    "sourceDirectory",
    "scriptSourceDirectory",
    "testSourceDirectory",
    "outputDirectory",
    "testOutputDirectory",
    "extensions",
    "resources",
    "testResources",
    "filters",
    "pluginManagement",
    "plugins",
];

fn canonical_order(parent: &str) -> &'static [&'static str] {
    match parent {
        "project" => PROJECT_ORDER,
        "build" => BUILD_ORDER,
        _ => &[],
    }
}

/// Elements leading from `<project>` to the section holding entries of `kind`.
fn section_path(kind: DescriptorKind) -> &'static [&'static str] {
    match kind {
        DescriptorKind::Dependency => &["dependencies"],
        DescriptorKind::ManagedDependency => &["dependencyManagement", "dependencies"],
        DescriptorKind::Repository => &["repositories"],
        DescriptorKind::Plugin => &["build", "plugins"],
    }
}

/// Formatting conventions detected from the document being patched.
#[derive(Debug)]
struct Layout {
    unit: String,
    newline: &'static str,
}

impl Layout {
    fn detect(doc: &str, project: &Element) -> Self {
        let newline = if doc.contains("\r\n") { "\r\n" } else { "\n" };
        let project_indent = xml::line_indent(doc, project.outer.start).unwrap_or_default();
        let unit = xml::child_elements(doc, project.inner.clone())
            .first()
            .and_then(|child| xml::line_indent(doc, child.outer.start))
            .and_then(|indent| indent.strip_prefix(&project_indent).map(str::to_string))
            .filter(|unit| !unit.is_empty())
            .unwrap_or_else(|| "    ".to_string());
        Self { unit, newline }
    }

    /// Indentation for a new child of `parent`: that of an existing child, else one level deeper.
    fn child_indent(&self, doc: &str, parent: &Element) -> String {
        xml::child_elements(doc, parent.inner.clone())
            .first()
            .and_then(|child| xml::line_indent(doc, child.outer.start))
            .unwrap_or_else(|| {
                let base = xml::line_indent(doc, parent.outer.start).unwrap_or_default();
                format!("{}{}", base, self.unit)
            })
    }

    /// Re-indents an entry so it sits at `indent`, keeping its inner structure.
    fn render_entry(&self, entry: &str, indent: &str) -> String {
        let lines: Vec<&str> = entry.lines().collect();
        if lines.len() == 1
            && let Some(expanded) = self.expand_single_line(entry, indent)
        {
            return expanded;
        }

        let width = |line: &str| line.len() - line.trim_start().len();
        let continuation: Vec<usize> = lines
            .iter()
            .skip(1)
            .copied()
            .filter(|l| !l.trim().is_empty())
            .map(width)
            .collect();
        let base = continuation.iter().copied().min().unwrap_or(0);
        let step = continuation
            .iter()
            .map(|w| w - base)
            .filter(|w| *w > 0)
            .min()
            .unwrap_or(1);

        lines
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, line)| {
                let level = if i == 0 { 0 } else { (width(line) - base) / step };
                format!("{}{}{}", indent, self.unit.repeat(level), line.trim())
            })
            .collect::<Vec<_>>()
            .join(self.newline)
    }

    /// `<dependency><groupId>g</groupId>...</dependency>` becomes one child per line.
    fn expand_single_line(&self, entry: &str, indent: &str) -> Option<String> {
        let root = xml::root_element(entry)?;
        let children = xml::child_elements(entry, root.inner.clone());
        let all_leaves = children
            .iter()
            .all(|c| xml::child_elements(entry, c.inner.clone()).is_empty());
        if children.is_empty() || !all_leaves {
            return None;
        }

        let open = entry.get(root.outer.start..root.inner.start)?;
        let close = entry.get(root.inner.end..root.outer.end)?;
        let mut out = vec![format!("{}{}", indent, open)];
        for child in &children {
            out.push(format!("{}{}{}", indent, self.unit, entry.get(child.outer.clone())?));
        }
        out.push(format!("{}{}", indent, close));
        Some(out.join(self.newline))
    }

    /// `<a><b>entry</b></a>` for a chain of sections that do not exist yet.
    fn render_chain(&self, chain: &[&str], indent: &str, entry: &str) -> String {
        match chain.split_first() {
            None => self.render_entry(entry, indent),
            Some((name, rest)) => {
                let inner_indent = format!("{}{}", indent, self.unit);
                format!(
                    "{indent}<{name}>{nl}{inner}{nl}{indent}</{name}>",
                    inner = self.render_chain(rest, &inner_indent, entry),
                    nl = self.newline,
                )
            }
        }
    }
}

/// Textual `pom.xml` patcher. Everything outside the inserted entries is kept byte for byte.
#[derive(Debug, Default, Clone, Copy)]
pub struct PomPatcher;

impl PomPatcher {
    /// Merges `descriptors` into descriptor text, in order, skipping entries already present.
    pub fn apply(doc: &str, descriptors: &[Descriptor]) -> Option<String> {
        let mut out = doc.to_string();
        let project = xml::root_element(&out).filter(|e| e.name == "project")?;
        let layout = Layout::detect(&out, &project);

        for descriptor in descriptors {
            if insert_descriptor(&mut out, descriptor, &layout)? {
                log::debug!("Inserted {} '{}'.", descriptor.kind, descriptor.key());
            } else {
                log::debug!("{} '{}' already present.", descriptor.kind, descriptor.key());
            }
        }
        Some(out)
    }
}

impl DescriptorPatcher for PomPatcher {
    fn patch(&self, path: &Path, descriptors: &[Descriptor]) -> Result<String, PatchError> {
        let content = fs::read_to_string(path).map_err(|e| PatchError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::apply(&content, descriptors)
            .ok_or_else(|| PatchError::NoProject(path.display().to_string()))
    }
}

/// Inserts one entry. `Some(false)` when it was already there, `None` without a project root.
fn insert_descriptor(doc: &mut String, descriptor: &Descriptor, layout: &Layout) -> Option<bool> {
    let mut parent = xml::root_element(doc).filter(|e| e.name == "project")?;
    let mut remaining = section_path(descriptor.kind);

    while let Some((name, rest)) = remaining.split_first() {
        match xml::find_child(doc, &parent, name) {
            Some(child) => {
                parent = child;
                remaining = rest;
            }
            None => {
                let indent = layout.child_indent(doc, &parent);
                let block = layout.render_chain(remaining, &indent, &descriptor.xml);
                insert_section(doc, &parent, name, &block, layout);
                return Some(true);
            }
        }
    }

    let key = descriptor.key();
    let present = xml::find_children(doc, &parent, descriptor.kind.element())
        .iter()
        .any(|e| Descriptor::read(descriptor.kind, doc, e).key() == key);
    if present {
        return Some(false);
    }

    let indent = layout.child_indent(doc, &parent);
    let entry = layout.render_entry(&descriptor.xml, &indent);
    append_entry(doc, &parent, &entry, layout);
    Some(true)
}

/// Places a new section block in `parent`, after the last sibling that precedes it in Maven's order.
fn insert_section(doc: &mut String, parent: &Element, name: &str, block: &str, layout: &Layout) {
    let nl = layout.newline;
    let parent_indent = xml::line_indent(doc, parent.outer.start).unwrap_or_default();

    if parent.self_closing {
        let replacement = format!("<{p}>{nl}{block}{nl}{parent_indent}</{p}>", p = parent.name);
        doc.replace_range(parent.outer.clone(), &replacement);
        return;
    }

    let order = canonical_order(&parent.name);
    let rank = |n: &str| order.iter().position(|o| *o == n);
    let children = xml::child_elements(doc, parent.inner.clone());
    if children.is_empty() {
        doc.replace_range(
            parent.inner.clone(),
            &format!("{nl}{block}{nl}{parent_indent}"),
        );
        return;
    }

    let target = rank(name);
    let anchor = children
        .iter()
        .filter(|c| matches!((rank(c.name.as_str()), target), (Some(r), Some(t)) if r < t))
        .last();
    let position = match (anchor, target) {
        (Some(a), _) => a.outer.end,
        // Nothing precedes it canonically: lead the parent.
        (None, Some(_)) => parent.inner.start,
        (None, None) => children.last().map_or(parent.inner.start, |c| c.outer.end),
    };
    doc.insert_str(position, &format!("{nl}{block}"));
}

/// Appends an already indented entry as the last child of an existing section.
fn append_entry(doc: &mut String, section: &Element, entry: &str, layout: &Layout) {
    let nl = layout.newline;
    let section_indent = xml::line_indent(doc, section.outer.start).unwrap_or_default();

    if section.self_closing {
        let replacement = format!(
            "<{s}>{nl}{entry}{nl}{section_indent}</{s}>",
            s = section.name
        );
        doc.replace_range(section.outer.clone(), &replacement);
    } else if xml::line_indent(doc, section.inner.end).is_some() {
        // Closing tag on a line of its own: the entry goes on the line above it.
        let at = xml::line_start(doc, section.inner.end);
        doc.insert_str(at, &format!("{entry}{nl}"));
    } else {
        doc.insert_str(section.inner.end, &format!("{nl}{entry}{nl}{section_indent}"));
    }
}
