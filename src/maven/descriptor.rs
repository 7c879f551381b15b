// src/maven/descriptor.rs

use std::fmt;
use thiserror::Error;

use super::pom::{Coordinates, PomModel};
use super::xml;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("No <{0}> element found in the injected text.")]
    NoEntries(&'static str),
    #[error("A <{element}> entry is missing its <{field}>.")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },
    #[error("'{0}' is not a 'groupId:artifactId[:version[:scope]]' coordinate.")]
    BadCoordinate(String),
}

/// Which section of the descriptor an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Dependency,
    ManagedDependency,
    Repository,
    Plugin,
}

impl DescriptorKind {
    /// The element holding one entry.
    pub fn element(self) -> &'static str {
        match self {
            Self::Dependency | Self::ManagedDependency => "dependency",
            Self::Repository => "repository",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Dependency => "dependency",
            Self::ManagedDependency => "managed dependency",
            Self::Repository => "repository",
            Self::Plugin => "plugin",
        };
        f.write_str(label)
    }
}

/// One entry to be merged into a build descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub packaging: Option<String>,
    pub classifier: Option<String>,
    pub id: Option<String>,
    pub url: Option<String>,
    /// The element as written by the action author, without surrounding whitespace.
    pub xml: String,
}

impl Descriptor {
    /// Parses every entry of `kind` out of an action's `text`.
    ///
    /// Dependency kinds also accept one `groupId:artifactId[:version[:scope]]`
    /// coordinate per line instead of XML.
    pub fn parse_all(kind: DescriptorKind, text: &str) -> Result<Vec<Self>, DescriptorError> {
        let trimmed = text.trim();
        let is_dependency = matches!(
            kind,
            DescriptorKind::Dependency | DescriptorKind::ManagedDependency
        );
        if is_dependency && !trimmed.starts_with('<') {
            return trimmed
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|line| Self::from_coordinate(kind, line))
                .collect();
        }

        let entries: Vec<Self> = xml::child_elements(trimmed, 0..trimmed.len())
            .into_iter()
            .filter(|e| e.name == kind.element())
            .map(|e| Self::from_element(kind, trimmed, &e))
            .collect::<Result<_, _>>()?;

        if entries.is_empty() {
            return Err(DescriptorError::NoEntries(kind.element()));
        }
        Ok(entries)
    }

    fn from_element(
        kind: DescriptorKind,
        doc: &str,
        element: &xml::Element,
    ) -> Result<Self, DescriptorError> {
        let descriptor = Self::read(kind, doc, element);
        descriptor.check()?;
        Ok(descriptor)
    }

    /// Reads an entry without validating it, as found in an existing document.
    pub(crate) fn read(kind: DescriptorKind, doc: &str, element: &xml::Element) -> Self {
        let field = |name: &str| xml::child_text(doc, element, name);
        Self {
            kind,
            group_id: field("groupId"),
            artifact_id: field("artifactId"),
            version: field("version"),
            scope: field("scope"),
            packaging: field("type"),
            classifier: field("classifier"),
            id: field("id"),
            url: field("url"),
            xml: doc.get(element.outer.clone()).unwrap_or_default().to_string(),
        }
    }

    fn from_coordinate(kind: DescriptorKind, line: &str) -> Result<Self, DescriptorError> {
        let parts: Vec<&str> = line.split(':').map(str::trim).collect();
        let (group, artifact, version, scope) = match parts.as_slice() {
            [g, a] => (*g, *a, None, None),
            [g, a, v] => (*g, *a, Some(*v), None),
            [g, a, v, s] => (*g, *a, Some(*v), Some(*s)),
            _ => return Err(DescriptorError::BadCoordinate(line.to_string())),
        };
        if group.is_empty() || artifact.is_empty() {
            return Err(DescriptorError::BadCoordinate(line.to_string()));
        }

        let mut xml = format!(
            "<dependency>\n    <groupId>{}</groupId>\n    <artifactId>{}</artifactId>",
            group, artifact
        );
        if let Some(v) = version.filter(|v| !v.is_empty()) {
            xml.push_str(&format!("\n    <version>{}</version>", v));
        }
        if let Some(s) = scope.filter(|s| !s.is_empty()) {
            xml.push_str(&format!("\n    <scope>{}</scope>", s));
        }
        xml.push_str("\n</dependency>");

        Ok(Self {
            kind,
            group_id: Some(group.to_string()),
            artifact_id: Some(artifact.to_string()),
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
            scope: scope.filter(|s| !s.is_empty()).map(str::to_string),
            packaging: None,
            classifier: None,
            id: None,
            url: None,
            xml,
        })
    }

    fn check(&self) -> Result<(), DescriptorError> {
        let element = self.kind.element();
        let missing = |field| DescriptorError::MissingField { element, field };
        match self.kind {
            DescriptorKind::Dependency | DescriptorKind::ManagedDependency => {
                self.group_id.as_ref().ok_or_else(|| missing("groupId"))?;
                self.artifact_id.as_ref().ok_or_else(|| missing("artifactId"))?;
            }
            DescriptorKind::Plugin => {
                self.artifact_id.as_ref().ok_or_else(|| missing("artifactId"))?;
            }
            DescriptorKind::Repository => {
                if self.id.is_none() && self.url.is_none() {
                    return Err(missing("id"));
                }
            }
        }
        Ok(())
    }

    /// Identity used for de-duplication. Versions and scopes do not take part.
    pub fn key(&self) -> String {
        match self.kind {
            DescriptorKind::Repository => self
                .id
                .clone()
                .or_else(|| self.url.clone())
                .unwrap_or_default(),
            DescriptorKind::Plugin => format!(
                "{}:{}",
                self.group_id.as_deref().unwrap_or("org.apache.maven.plugins"),
                self.artifact_id.as_deref().unwrap_or_default()
            ),
            DescriptorKind::Dependency | DescriptorKind::ManagedDependency => {
                let mut key = format!(
                    "{}:{}",
                    self.group_id.as_deref().unwrap_or_default(),
                    self.artifact_id.as_deref().unwrap_or_default()
                );
                if let Some(t) = self.packaging.as_deref().filter(|t| *t != "jar") {
                    key.push_str(&format!(":{}", t));
                }
                if let Some(c) = &self.classifier {
                    key.push_str(&format!(":{}", c));
                }
                key
            }
        }
    }

    /// Whether the resolved project model already declares this entry.
    pub fn is_declared_in(&self, model: &PomModel) -> bool {
        match self.kind {
            DescriptorKind::Dependency => {
                model.dependencies.iter().any(|d| self.same_coordinates(d))
            }
            DescriptorKind::ManagedDependency => model
                .dependency_management
                .iter()
                .any(|d| self.same_coordinates(d)),
            DescriptorKind::Plugin => model.plugins.iter().any(|p| {
                let group = p.group_id.as_deref().unwrap_or("org.apache.maven.plugins");
                format!("{}:{}", group, p.artifact_id) == self.key()
            }),
            DescriptorKind::Repository => model.repositories.iter().any(|r| match &self.id {
                Some(id) => r.id.as_ref() == Some(id),
                None => r.url == self.url,
            }),
        }
    }

    fn same_coordinates(&self, declared: &Coordinates) -> bool {
        fn packaging(t: Option<&str>) -> Option<&str> {
            t.filter(|t| *t != "jar")
        }
        declared.group_id.as_deref() == self.group_id.as_deref()
            && Some(declared.artifact_id.as_str()) == self.artifact_id.as_deref()
            && packaging(declared.kind.as_deref()) == packaging(self.packaging.as_deref())
            && declared.classifier == self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_several_xml_entries() {
        let text = r#"
<dependency>
    <groupId>org.projectlombok</groupId>
    <artifactId>lombok</artifactId>
    <optional>true</optional>
</dependency>
<dependency>
    <groupId>com.h2database</groupId>
    <artifactId>h2</artifactId>
    <scope>runtime</scope>
</dependency>
"#;
        let entries = Descriptor::parse_all(DescriptorKind::Dependency, text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key(), "org.projectlombok:lombok");
        assert_eq!(entries[1].scope.as_deref(), Some("runtime"));
        assert!(entries[0].xml.starts_with("<dependency>"));
        assert!(entries[0].xml.ends_with("</dependency>"));
    }

    #[test]
    fn test_parses_coordinates() {
        let entries =
            Descriptor::parse_all(DescriptorKind::Dependency, "g:a:1.0\ng2:b:2.0:test").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version.as_deref(), Some("1.0"));
        assert_eq!(entries[1].scope.as_deref(), Some("test"));
        assert!(entries[0].xml.contains("<artifactId>a</artifactId>"));

        assert_eq!(
            Descriptor::parse_all(DescriptorKind::Dependency, "just-a-name"),
            Err(DescriptorError::BadCoordinate("just-a-name".into()))
        );
    }

    #[test]
    fn test_wrong_element_or_missing_fields() {
        assert_eq!(
            Descriptor::parse_all(DescriptorKind::Repository, "<dependency/>"),
            Err(DescriptorError::NoEntries("repository"))
        );
        assert_eq!(
            Descriptor::parse_all(
                DescriptorKind::Dependency,
                "<dependency><artifactId>a</artifactId></dependency>"
            ),
            Err(DescriptorError::MissingField {
                element: "dependency",
                field: "groupId"
            })
        );
    }

    #[test]
    fn test_declared_in_model() {
        let model = PomModel::parse(
            "<project><dependencies><dependency><groupId>g</groupId>\
             <artifactId>a</artifactId><version>1.0</version></dependency>\
             </dependencies></project>",
        )
        .unwrap();

        let same = Descriptor::parse_all(DescriptorKind::Dependency, "g:a:2.0").unwrap();
        assert!(same[0].is_declared_in(&model));
        let other = Descriptor::parse_all(DescriptorKind::Dependency, "g:b").unwrap();
        assert!(!other[0].is_declared_in(&model));
        let managed = Descriptor::parse_all(DescriptorKind::ManagedDependency, "g:a").unwrap();
        assert!(!managed[0].is_declared_in(&model));
    }
}
