//! Tolerant HTML scanning
//!
//! Just enough of an HTML reader to pull text out of a rendered search page:
//! start/end tags with attributes, text nodes, comments, doctype, raw-text
//! elements (`script`, `style`) and void elements. Unbalanced end tags are
//! ignored. No DOM is built; [`nested_texts`] walks the tag stream with an
//! open-element stack.

use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Matches an element by tag name and attribute
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    /// Lowercase tag name, `*` for any
    pub tag: &'a str,
    pub attribute: &'a str,
    /// Required attribute value; `None` only requires presence
    pub value: Option<&'a str>,
}

impl<'a> Selector<'a> {
    /// `tag[attribute="value"]`
    #[must_use]
    pub const fn with_value(tag: &'a str, attribute: &'a str, value: &'a str) -> Self {
        Self {
            tag,
            attribute,
            value: Some(value),
        }
    }

    /// `tag[attribute]`
    #[must_use]
    pub const fn with_attribute(tag: &'a str, attribute: &'a str) -> Self {
        Self {
            tag,
            attribute,
            value: None,
        }
    }

    fn matches(&self, element: &Element) -> bool {
        if self.tag != "*" && self.tag != element.name {
            return false;
        }
        element
            .attributes
            .iter()
            .any(|(name, value)| name == self.attribute && self.value.is_none_or(|v| v == value))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, PartialEq)]
enum Node<'d> {
    Open { element: Element, self_closing: bool },
    Close(String),
    Text(&'d str),
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "textarea"];

/// Furthest `;` can sit from `&` in an HTML5 entity reference
const MAX_ENTITY_LEN: usize = 33;

struct Frame {
    name: String,
    is_target: bool,
    is_ancestor: bool,
    /// Some strict ancestor matches the ancestor selector
    within: bool,
}

/// Direct, non-blank text of every element matching `target` that has an
/// element matching `ancestor` above it, in document order. Text is trimmed
/// and entity-decoded.
#[must_use]
pub fn nested_texts(document: &str, ancestor: &Selector, target: &Selector) -> Vec<String> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut texts = Vec::new();

    for_each_node(document, |node| match node {
        Node::Open {
            element,
            self_closing,
        } => {
            if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                return;
            }
            let within = stack
                .last()
                .is_some_and(|parent| parent.within || parent.is_ancestor);
            stack.push(Frame {
                is_target: target.matches(&element),
                is_ancestor: ancestor.matches(&element),
                within,
                name: element.name,
            });
        }
        Node::Close(name) => {
            if let Some(position) = stack.iter().rposition(|frame| frame.name == name) {
                stack.truncate(position);
            }
        }
        Node::Text(raw) => {
            if let Some(frame) = stack.last() {
                if frame.is_target && frame.within {
                    let text = decode_entities(raw);
                    let text = text.trim();
                    if !text.is_empty() {
                        texts.push(text.to_string());
                    }
                }
            }
        }
    });

    texts
}

fn for_each_node<'d>(document: &'d str, mut visit: impl FnMut(Node<'d>)) {
    let mut rest = document;

    while !rest.is_empty() {
        let Some(start) = rest.find('<') else {
            visit(Node::Text(rest));
            return;
        };
        if start > 0 {
            visit(Node::Text(&rest[..start]));
        }
        rest = &rest[start..];

        if rest.starts_with("<!--") {
            rest = skip_past(rest, "-->");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = skip_past(rest, ">");
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let Some(end) = after.find('>') else {
                return;
            };
            let name = after[..end].trim().to_ascii_lowercase();
            visit(Node::Close(name));
            rest = &after[end + 1..];
            continue;
        }
        if !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            // a literal '<' in text
            visit(Node::Text(&rest[..1]));
            rest = &rest[1..];
            continue;
        }

        let Some(end) = find_tag_end(rest) else {
            visit(Node::Text(rest));
            return;
        };
        let inner = &rest[1..end];
        let self_closing = inner.trim_end().ends_with('/');
        let element = parse_element(inner.trim_end().trim_end_matches('/'));
        rest = &rest[end + 1..];

        let raw_text = !self_closing && RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
        let closing = format!("</{}", element.name);
        visit(Node::Open {
            element,
            self_closing,
        });

        if raw_text {
            let position = find_ignore_ascii_case(rest, &closing).unwrap_or(rest.len());
            rest = &rest[position..];
        }
    }
}

/// Everything after the first `marker`, or nothing if it never appears
fn skip_past<'d>(rest: &'d str, marker: &str) -> &'d str {
    match rest.find(marker) {
        Some(position) => &rest[position + marker.len()..],
        None => "",
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Byte index of the `>` closing the tag that starts `rest`, skipping quoted
/// attribute values
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, c) in rest.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(index),
            None => {}
        }
    }
    None
}

fn parse_element(inner: &str) -> Element {
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut rest = &inner[name_end..];

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let key_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let key = rest[..key_end].to_ascii_lowercase();
        rest = rest[key_end..].trim_start();

        let mut value = String::new();
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (raw, remaining) = match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(q) {
                        Some(close) => (&body[..close], &body[close + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            value = decode_entities(raw);
            rest = remaining;
        }

        if !key.is_empty() {
            attributes.push((key, value));
        }
    }

    Element { name, attributes }
}

/// Decode HTML5 named entities and numeric references. A `&` that does not
/// start a known entity is kept as written.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let replacement = entity_end(rest).and_then(|end| {
            unescape_with(&rest[..=end], resolve_html5_entity)
                .ok()
                .map(|value| (value.into_owned(), end))
        });

        match replacement {
            Some((value, end)) => {
                decoded.push_str(&value);
                rest = &rest[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Byte index of the `;` closing the entity reference at the start of `rest`
fn entity_end(rest: &str) -> Option<usize> {
    let semi = rest.find(';').filter(|&semi| semi > 1 && semi <= MAX_ENTITY_LEN)?;
    rest[1..semi]
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '#')
        .then_some(semi)
}
