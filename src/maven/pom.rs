// src/maven/pom.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::xml::{self, Element};

#[derive(Error, Debug)]
pub enum PomError {
    #[error("Failed to read build descriptor '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' has no <project> root element.")]
    NoProject(String),
}

/// Coordinates of a dependency or plugin as declared in a descriptor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Coordinates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Repository {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The subset of a `pom.xml` exposed to templates as `maven-model`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PomModel {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Coordinates>,
    pub dependency_management: Vec<Coordinates>,
    pub repositories: Vec<Repository>,
    pub plugins: Vec<Coordinates>,
}

impl PomModel {
    pub fn load(path: &Path) -> Result<Self, PomError> {
        let content = fs::read_to_string(path).map_err(|e| PomError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content).ok_or_else(|| PomError::NoProject(path.display().to_string()))
    }

    /// Reads the model out of descriptor text. `None` when there is no `<project>` root.
    pub fn parse(doc: &str) -> Option<Self> {
        let project = xml::root_element(doc).filter(|e| e.name == "project")?;
        let parent = xml::find_child(doc, &project, "parent");
        let inherited = |field: &str| {
            xml::child_text(doc, &project, field)
                .or_else(|| parent.as_ref().and_then(|p| xml::child_text(doc, p, field)))
        };

        let properties = xml::find_child(doc, &project, "properties")
            .map(|props| {
                xml::child_elements(doc, props.inner.clone())
                    .iter()
                    .map(|p| (p.name.clone(), xml::text_of(doc, p)))
                    .collect()
            })
            .unwrap_or_default();

        let dependency_management = xml::find_child(doc, &project, "dependencyManagement")
            .map(|dm| coordinates_in(doc, &dm, "dependencies", "dependency"))
            .unwrap_or_default();

        let plugins = xml::find_child(doc, &project, "build")
            .map(|build| coordinates_in(doc, &build, "plugins", "plugin"))
            .unwrap_or_default();

        let repositories = xml::find_child(doc, &project, "repositories")
            .map(|repos| {
                xml::find_children(doc, &repos, "repository")
                    .iter()
                    .map(|r| Repository {
                        id: xml::child_text(doc, r, "id"),
                        url: xml::child_text(doc, r, "url"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            group_id: inherited("groupId"),
            artifact_id: xml::child_text(doc, &project, "artifactId"),
            version: inherited("version"),
            packaging: xml::child_text(doc, &project, "packaging").unwrap_or_else(|| "jar".into()),
            name: xml::child_text(doc, &project, "name"),
            description: xml::child_text(doc, &project, "description"),
            properties,
            dependencies: coordinates_in(doc, &project, "dependencies", "dependency"),
            dependency_management,
            repositories,
            plugins,
        })
    }

    /// Whether `artifact_id` is declared as a direct dependency.
    pub fn has_dependency(&self, artifact_id: &str) -> bool {
        self.dependencies.iter().any(|d| d.artifact_id == artifact_id)
    }

    /// The Java release the project targets, from the usual properties.
    pub fn java_version(&self) -> Option<&str> {
        ["java.version", "maven.compiler.release", "maven.compiler.source"]
            .iter()
            .find_map(|key| self.properties.get(*key))
            .map(String::as_str)
    }
}

/// Reads `<section><entry>...</entry></section>` below `parent`.
fn coordinates_in(doc: &str, parent: &Element, section: &str, entry: &str) -> Vec<Coordinates> {
    let Some(section) = xml::find_child(doc, parent, section) else {
        return Vec::new();
    };
    xml::find_children(doc, &section, entry)
        .iter()
        .filter_map(|e| {
            Some(Coordinates {
                group_id: xml::child_text(doc, e, "groupId"),
                artifact_id: xml::child_text(doc, e, "artifactId")?,
                version: xml::child_text(doc, e, "version"),
                scope: xml::child_text(doc, e, "scope"),
                kind: xml::child_text(doc, e, "type"),
                classifier: xml::child_text(doc, e, "classifier"),
            })
        })
        .collect()
}
