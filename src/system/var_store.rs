// src/system/var_store.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Filesystem Error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Role file '{path}' is not a valid YAML map: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to serialize role variables: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("Invalid role name '{0}'. Use letters, digits, '-' or '_'.")]
    InvalidRole(String),
}

/// Persistent, named variable sets ("roles").
pub trait VariableStore {
    /// Sets one variable of a role, creating the role if needed. `""` is the default role.
    fn update_role(&self, role: &str, key: &str, value: &str) -> Result<(), StoreError>;
    /// Every variable of a role; an unknown role is empty.
    fn load_as_map(&self, role: &str) -> Result<BTreeMap<String, String>, StoreError>;
}

/// Stores each role as a YAML map in `<dir>/vars.yaml` (default role) or
/// `<dir>/vars-<role>.yaml`. Every update is a read-modify-write of one file.
#[derive(Debug, Clone)]
pub struct RoleStore {
    dir: PathBuf,
}

impl RoleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file backing a role.
    pub fn role_file(&self, role: &str) -> Result<PathBuf, StoreError> {
        if role.is_empty() {
            return Ok(self.dir.join("vars.yaml"));
        }
        let valid = role
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidRole(role.to_string()));
        }
        Ok(self.dir.join(format!("vars-{}.yaml", role)))
    }
}

impl VariableStore for RoleStore {
    fn update_role(&self, role: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.role_file(role)?;
        let mut vars = self.load_as_map(role)?;
        vars.insert(key.to_string(), value.to_string());

        let yaml = serde_yaml::to_string(&vars)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })?;
        fs::write(&path, yaml).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Stored '{}' in role file '{}'.", key, path.display());
        Ok(())
    }

    fn load_as_map(&self, role: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let path = self.role_file(role)?;
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let vars: Option<BTreeMap<String, String>> =
            serde_yaml::from_str(&content).map_err(|e| StoreError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(vars.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_role_round_trip_and_isolation() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path().join("roles"));

        // --- Execute ---
        store.update_role("", "language", "java").unwrap();
        store.update_role("", "build", "maven").unwrap();
        store.update_role("qa", "language", "kotlin").unwrap();

        // --- Assert ---
        let default = store.load_as_map("").unwrap();
        assert_eq!(default.get("language").map(String::as_str), Some("java"));
        assert_eq!(default.len(), 2);
        let qa = store.load_as_map("qa").unwrap();
        assert_eq!(qa.get("language").map(String::as_str), Some("kotlin"));
        assert!(dir.path().join("roles").join("vars.yaml").exists());
        assert!(dir.path().join("roles").join("vars-qa.yaml").exists());
    }

    #[test]
    fn test_unknown_role_is_empty() {
        let dir = tempdir().unwrap();
        let store = RoleStore::new(dir.path());
        assert!(store.load_as_map("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_role_names_cannot_escape_the_directory() {
        let store = RoleStore::new("/tmp/roles");
        assert!(matches!(
            store.role_file("../etc"),
            Err(StoreError::InvalidRole(_))
        ));
    }
}
