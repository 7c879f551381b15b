// src/core/action_loader.rs

use crate::{
    constants::{COMMAND_MANIFEST_ALT_FILENAME, COMMAND_MANIFEST_FILENAME},
    core::commons::is_hidden,
    models::ActionsFile,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Editor and tool leftovers that are never action files.
const BACKUP_SUFFIXES: &[&str] = &["~", ".bak", ".orig", ".swp", ".tmp"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not walk '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("Two action files resolve to the same path '{0}'.")]
    DuplicatePath(String),
}

/// Why a candidate file did not become an action file.
#[derive(Debug)]
enum Rejection {
    NotText,
    NotActionShape,
    Malformed(String),
}

/// Discovers every action file below a sub-command directory.
///
/// The map is keyed by path, so iteration order (and therefore execution order)
/// is lexicographic and identical across runs for the same directory snapshot.
/// Files that are not action definitions (generator templates, scripts, docs)
/// are silently left out.
pub fn find_action_files(
    subcommand_path: &Path,
) -> Result<BTreeMap<PathBuf, ActionsFile>, LoaderError> {
    let mut files = BTreeMap::new();

    let walker = WalkDir::new(subcommand_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = entry.map_err(|e| LoaderError::Walk {
            path: subcommand_path.display().to_string(),
            source: e,
        })?;
        if !is_candidate(&entry) {
            continue;
        }

        let path = dunce::simplified(entry.path()).to_path_buf();
        match parse_actions_file(&path)? {
            Ok(actions_file) => {
                log::trace!(
                    "Loaded action file '{}' ({} action(s)).",
                    path.display(),
                    actions_file.actions.len()
                );
                if files.contains_key(&path) {
                    return Err(LoaderError::DuplicatePath(path.display().to_string()));
                }
                files.insert(path, actions_file);
            }
            Err(Rejection::Malformed(reason)) => {
                log::warn!("Ignoring malformed action file '{}': {}", path.display(), reason);
            }
            Err(rejection) => {
                log::trace!("'{}' is not an action file ({:?}).", path.display(), rejection);
            }
        }
    }

    log::debug!(
        "Found {} action file(s) under '{}'.",
        files.len(),
        subcommand_path.display()
    );
    Ok(files)
}

fn is_candidate(entry: &DirEntry) -> bool {
    if !entry.file_type().is_file() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if entry.depth() == 1
        && (name == COMMAND_MANIFEST_FILENAME || name == COMMAND_MANIFEST_ALT_FILENAME)
    {
        return false;
    }
    !BACKUP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Reads a file and tries to interpret it as an action definition.
/// The outer `Result` carries I/O failures; the inner one the verdict.
fn parse_actions_file(path: &Path) -> Result<Result<ActionsFile, Rejection>, LoaderError> {
    let bytes = fs::read(path).map_err(|e| LoaderError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let Ok(content) = String::from_utf8(bytes) else {
        return Ok(Err(Rejection::NotText));
    };
    Ok(parse_actions_text(&content))
}

/// Parses action-definition text: a leading `---` front-matter block if present,
/// otherwise the whole text, must be a YAML mapping with an `actions` key.
fn parse_actions_text(content: &str) -> Result<ActionsFile, Rejection> {
    let document = extract_front_matter(content).unwrap_or(content);

    let value: serde_yaml::Value =
        serde_yaml::from_str(document).map_err(|_| Rejection::NotActionShape)?;
    let has_actions_key = value
        .as_mapping()
        .is_some_and(|m| m.contains_key(serde_yaml::Value::from("actions")));
    if !has_actions_key {
        return Err(Rejection::NotActionShape);
    }

    serde_yaml::from_value::<ActionsFile>(value).map_err(|e| Rejection::Malformed(e.to_string()))
}

/// Returns the YAML between an opening `---` line and the next `---` line.
pub fn extract_front_matter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return content.get(start..offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Action;
    use tempfile::tempdir;

    const HELLO_ACTIONS: &str = r#"actions:
  - generate:
      to: hello.txt
      text: "Hello {{name}}"
"#;

    #[test]
    fn test_front_matter_extraction() {
        let text = "---\nactions: []\n---\n# Body\n";
        assert_eq!(extract_front_matter(text), Some("actions: []\n"));
        assert_eq!(extract_front_matter("actions: []\n"), None);
        assert_eq!(extract_front_matter("---\nunterminated: true\n"), None);
    }

    #[test]
    fn test_plain_and_front_matter_files_are_loaded_in_path_order() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b-second.yaml"), HELLO_ACTIONS).unwrap();
        fs::write(
            dir.path().join("a-first.md"),
            format!("---\n{}---\nSome documentation below.\n", HELLO_ACTIONS),
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.yml"), "actions: []\n").unwrap();

        // --- Execute ---
        let files = find_action_files(dir.path()).unwrap();

        // --- Assert ---
        let names: Vec<_> = files
            .keys()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a-first.md", "b-second.yaml", "nested/c.yml"]);
        let first = files.values().next().unwrap();
        assert!(matches!(&first.actions[0], Action::Generate(g) if g.to == "hello.txt"));
    }

    #[test]
    fn test_non_action_files_are_excluded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(COMMAND_MANIFEST_FILENAME), "name: hello\nactions: []\n").unwrap();
        fs::write(dir.path().join("template.java"), "public class {{name}} {}").unwrap();
        fs::write(dir.path().join("other.yaml"), "kind: Deployment\n").unwrap();
        fs::write(dir.path().join("binary.bin"), [0xff_u8, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("old.yaml.bak"), HELLO_ACTIONS).unwrap();
        fs::write(dir.path().join(".hidden.yaml"), HELLO_ACTIONS).unwrap();
        fs::write(
            dir.path().join("two-kinds.yaml"),
            "actions:\n  - generate: { to: a, text: a }\n    exec: { command: ls }\n",
        )
        .unwrap();

        let files = find_action_files(dir.path()).unwrap();
        assert!(files.is_empty(), "Unexpected files: {:?}", files.keys());
    }

    #[test]
    fn test_ordering_is_stable_across_calls() {
        let dir = tempdir().unwrap();
        for name in ["zeta.yaml", "alpha.yaml", "mid.yaml"] {
            fs::write(dir.path().join(name), HELLO_ACTIONS).unwrap();
        }
        let first: Vec<_> = find_action_files(dir.path()).unwrap().into_keys().collect();
        let second: Vec<_> = find_action_files(dir.path()).unwrap().into_keys().collect();
        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
    }
}
