// src/core/json_path.rs

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JsonPathError {
    #[error("Invalid JSON path '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A small JSON path: `$.a.b`, `$.items[0].name`, `$['odd key']`, `$.items[*].id`.
#[derive(Debug, Clone)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

impl JsonPath {
    pub fn parse(path: &str) -> Result<Self, JsonPathError> {
        let invalid = |reason: &str| JsonPathError::Invalid {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.trim();
        let body = trimmed.strip_prefix('$').unwrap_or(trimmed);
        let chars: Vec<char> = body.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while let Some(&c) = chars.get(i) {
            match c {
                '.' => {
                    i += 1;
                    let start = i;
                    while chars.get(i).is_some_and(|ch| *ch != '.' && *ch != '[') {
                        i += 1;
                    }
                    let key: String = chars.get(start..i).unwrap_or_default().iter().collect();
                    if key.is_empty() {
                        return Err(invalid("empty key after '.'"));
                    }
                    if key == "*" {
                        segments.push(PathSegment::Wildcard);
                    } else {
                        segments.push(PathSegment::Key(key));
                    }
                }
                '[' => {
                    let close = chars
                        .iter()
                        .skip(i)
                        .position(|ch| *ch == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid("unclosed '['"))?;
                    let inner: String =
                        chars.get(i + 1..close).unwrap_or_default().iter().collect();
                    let inner = inner.trim();
                    if inner == "*" {
                        segments.push(PathSegment::Wildcard);
                    } else if let Some(quoted) = inner
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                    {
                        segments.push(PathSegment::Key(quoted.to_string()));
                    } else {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| invalid(&format!("invalid array index '{}'", inner)))?;
                        segments.push(PathSegment::Index(index));
                    }
                    i = close + 1;
                }
                _ if segments.is_empty() && i == 0 => {
                    // Bare `a.b` without the leading `$.`
                    let start = i;
                    while chars.get(i).is_some_and(|ch| *ch != '.' && *ch != '[') {
                        i += 1;
                    }
                    let key: String = chars.get(start..i).unwrap_or_default().iter().collect();
                    segments.push(PathSegment::Key(key));
                }
                _ => return Err(invalid(&format!("unexpected character '{}'", c))),
            }
        }

        Ok(Self { segments })
    }

    /// Evaluates the path. A wildcard yields an array of every match; a path
    /// that matches nothing yields `None`.
    pub fn query(&self, root: &Value) -> Option<Value> {
        let mut current: Vec<&Value> = vec![root];
        let mut fanned_out = false;

        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                match segment {
                    PathSegment::Key(key) => next.extend(value.get(key.as_str())),
                    PathSegment::Index(idx) => next.extend(value.get(*idx)),
                    PathSegment::Wildcard => {
                        fanned_out = true;
                        match value {
                            Value::Array(items) => next.extend(items.iter()),
                            Value::Object(map) => next.extend(map.values()),
                            _ => {}
                        }
                    }
                }
            }
            current = next;
        }

        if fanned_out {
            return Some(Value::Array(current.into_iter().cloned().collect()));
        }
        current.first().map(|v| (*v).clone())
    }
}
