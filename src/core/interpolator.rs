// src/core/interpolator.rs

use crate::models::Context;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

lazy_static! {
    /// `{{ key }}`, `{{ a.b.0 }}`, optionally escaped as `\{{ ... }}`.
    static ref PLACEHOLDER_RE: Regex =
        Regex::new(r"(\\)?\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder regex is valid");
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Placeholder '{{{{{0}}}}}' could not be resolved from the current context.")]
    Unresolved(String),
}

/// Renders template text against the evaluation context.
pub trait TemplateEngine {
    fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError>;
}

/// Mustache-style substitution: `{{name}}` is replaced by the context value `name`,
/// `{{maven-model.artifactId}}` walks into nested objects and arrays.
/// An unresolved placeholder is an error, never left behind silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct MustacheEngine;

impl TemplateEngine for MustacheEngine {
    fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        // Fast path: most fields (paths, flags) contain no placeholder at all.
        if !template.contains("{{") {
            return Ok(template.to_string());
        }

        let mut failure: Option<TemplateError> = None;
        let rendered = PLACEHOLDER_RE.replace_all(template, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            if caps.get(1).is_some() {
                // Escaped: drop the backslash, keep the braces.
                return whole.get(1..).unwrap_or_default().to_string();
            }
            let key = caps.get(2).map_or("", |m| m.as_str());
            match lookup(context, key) {
                Some(value) => value_to_text(value),
                None => {
                    if failure.is_none() {
                        failure = Some(TemplateError::Unresolved(key.to_string()));
                    }
                    String::new()
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(rendered.into_owned()),
        }
    }
}

/// Resolves a (possibly dotted) key. A literal key wins over a nested path, so
/// populated keys such as `java.version` stay reachable.
pub fn lookup<'a>(context: &'a Context, key: &str) -> Option<&'a Value> {
    if let Some(value) = context.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let mut current = context.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// The textual form a context value takes inside rendered output.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
