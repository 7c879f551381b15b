// src/maven/xml.rs

//! A minimal, position-preserving element walker for build descriptors.
//!
//! It only understands what a `pom.xml` uses: nested elements, comments, the
//! XML declaration and self-closing tags. Every element keeps its byte offsets in
//! the original text, which is what lets the patcher insert new content without
//! reformatting anything else.

use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Range;

lazy_static! {
    static ref TAG_RE: Regex =
        Regex::new(r"<(/?)([A-Za-z_][\w.\-:]*)((?:[^>/]|/[^>])*)(/?)>").expect("tag regex is valid");
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>")
        .expect("comment regex is valid");
}

/// An element located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// From `<` of the opening tag to `>` of the closing tag (exclusive).
    pub outer: Range<usize>,
    /// The content between the tags. Empty for self-closing elements.
    pub inner: Range<usize>,
    pub self_closing: bool,
}

#[derive(Debug)]
struct Tag {
    name: String,
    range: Range<usize>,
    closing: bool,
    self_closing: bool,
}

fn tags_in(doc: &str, range: Range<usize>) -> Vec<Tag> {
    let Some(slice) = doc.get(range.clone()) else {
        return Vec::new();
    };
    let ignored: Vec<Range<usize>> = COMMENT_RE.find_iter(slice).map(|m| m.range()).collect();

    TAG_RE
        .captures_iter(slice)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if ignored.iter().any(|r| r.contains(&whole.start())) {
                return None;
            }
            Some(Tag {
                name: caps.get(2)?.as_str().to_string(),
                range: (range.start + whole.start())..(range.start + whole.end()),
                closing: caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
                self_closing: caps.get(4).is_some_and(|m| !m.as_str().is_empty()),
            })
        })
        .collect()
}

/// The direct child elements found within `range` of `doc`, in document order.
/// Unbalanced markup ends the scan; what was matched so far is returned.
pub fn child_elements(doc: &str, range: Range<usize>) -> Vec<Element> {
    let mut children = Vec::new();
    let mut stack: Vec<Tag> = Vec::new();

    for tag in tags_in(doc, range) {
        if tag.self_closing {
            if stack.is_empty() {
                children.push(Element {
                    name: tag.name,
                    inner: tag.range.end..tag.range.end,
                    outer: tag.range,
                    self_closing: true,
                });
            }
            continue;
        }
        if !tag.closing {
            stack.push(tag);
            continue;
        }
        match stack.pop() {
            Some(open) if open.name == tag.name => {
                if stack.is_empty() {
                    children.push(Element {
                        name: open.name,
                        outer: open.range.start..tag.range.end,
                        inner: open.range.end..tag.range.start,
                        self_closing: false,
                    });
                }
            }
            _ => {
                log::debug!("Unbalanced closing tag '</{}>' in document.", tag.name);
                break;
            }
        }
    }
    children
}

/// The first direct child named `name`.
pub fn find_child(doc: &str, parent: &Element, name: &str) -> Option<Element> {
    child_elements(doc, parent.inner.clone())
        .into_iter()
        .find(|e| e.name == name)
}

/// Every direct child named `name`.
pub fn find_children(doc: &str, parent: &Element, name: &str) -> Vec<Element> {
    child_elements(doc, parent.inner.clone())
        .into_iter()
        .filter(|e| e.name == name)
        .collect()
}

/// The root element of a document (skipping the declaration and comments).
pub fn root_element(doc: &str) -> Option<Element> {
    child_elements(doc, 0..doc.len()).into_iter().next()
}

/// Trimmed text content of an element, with the basic entities decoded.
pub fn text_of(doc: &str, element: &Element) -> String {
    let raw = doc.get(element.inner.clone()).unwrap_or_default().trim();
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Text of the direct child `name`, if present and non-empty.
pub fn child_text(doc: &str, parent: &Element, name: &str) -> Option<String> {
    find_child(doc, parent, name)
        .map(|e| text_of(doc, &e))
        .filter(|t| !t.is_empty())
}

/// Whitespace between the start of the line and `offset`, when only whitespace precedes it.
pub fn line_indent(doc: &str, offset: usize) -> Option<String> {
    let line_start = doc.get(..offset)?.rfind('\n').map_or(0, |i| i + 1);
    let prefix = doc.get(line_start..offset)?;
    prefix
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then(|| prefix.to_string())
}

/// Start of the line containing `offset`.
pub fn line_start(doc: &str, offset: usize) -> usize {
    doc.get(..offset)
        .and_then(|s| s.rfind('\n'))
        .map_or(0, |i| i + 1)
}
