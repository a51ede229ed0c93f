//! Markup parser seam.
//!
//! The tree builder consumes parser output through [`MarkupParser`]. The
//! bundled [`TagSoupParser`] is a lenient regex tokenizer good enough for the
//! snapshots a remote agent returns; callers with a full HTML parser plug it in
//! by implementing the trait.

use regex::Regex;
use std::sync::OnceLock;

use crate::result::{DomscopeError, DomscopeResult};

/// HTML elements that never have content
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Byte range of a node in the markup it was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Offset of the first byte
    pub start: usize,
    /// Offset one past the last byte
    pub end: usize,
}

impl SourceSpan {
    /// Create a span
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Kind of parsed node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParsedNodeType {
    /// Element with tag name and attributes
    Element,
    /// Character data
    Text,
    /// `<!-- ... -->`
    Comment,
    /// Markup the tokenizer could not place (e.g. an unmatched close tag)
    Invalid,
}

/// One node of parser output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNode {
    /// Node kind
    pub node_type: ParsedNodeType,
    /// Lowercase tag name for elements, empty otherwise
    pub name: String,
    /// Raw attribute pairs in source order
    pub attributes: Vec<(String, String)>,
    /// Character data for text and comment nodes
    pub text: String,
    /// Source span, `None` for synthetic nodes
    pub span: Option<SourceSpan>,
    /// Child nodes in document order
    pub children: Vec<ParsedNode>,
}

impl ParsedNode {
    /// Create an element node
    #[must_use]
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            node_type: ParsedNodeType::Element,
            name: name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            span: None,
            children: Vec::new(),
        }
    }

    /// Create a text node
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node_type: ParsedNodeType::Text,
            name: String::new(),
            attributes: Vec::new(),
            text: text.into(),
            span: None,
            children: Vec::new(),
        }
    }

    /// Create a comment node
    #[must_use]
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            node_type: ParsedNodeType::Comment,
            ..Self::text(text)
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Set the source span
    #[must_use]
    pub const fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// Whether this is an element
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.node_type == ParsedNodeType::Element
    }
}

/// Turns markup into a forest of [`ParsedNode`]s
pub trait MarkupParser: Send + Sync + std::fmt::Debug {
    /// Parse markup into top-level nodes
    fn parse(&self, markup: &str) -> DomscopeResult<Vec<ParsedNode>>;
}

/// Lenient regex-based tag tokenizer
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSoupParser {
    strict: bool,
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(
            r#"(?s)<!--(?P<comment>.*?)-->|<[!?][^>]*>|</\s*(?P<close>[A-Za-z][\w:.-]*)\s*>|<(?P<open>[A-Za-z][\w:.-]*)(?P<attrs>(?:\s+[^\s/>"'=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>"']+))?)*)\s*(?P<selfclose>/?)>"#,
        )
        .expect("token pattern is valid")
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([^\s/>"'=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#)
            .expect("attribute pattern is valid")
    })
}

/// Decode the basic character entities
#[must_use]
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    attribute_regex()
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Element under construction
struct OpenElement {
    node: ParsedNode,
    start: usize,
}

#[derive(Default)]
struct ForestBuilder {
    roots: Vec<ParsedNode>,
    open: Vec<OpenElement>,
}

impl ForestBuilder {
    fn append(&mut self, node: ParsedNode) {
        match self.open.last_mut() {
            Some(parent) => parent.node.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn open(&mut self, node: ParsedNode, start: usize) {
        self.open.push(OpenElement { node, start });
    }

    /// Close the innermost open element, ending its span at `end`
    fn close_top(&mut self, end: usize) {
        if let Some(OpenElement { node, start }) = self.open.pop() {
            self.append(node.with_span(SourceSpan::new(start, end)));
        }
    }

    fn is_open(&self, name: &str) -> bool {
        self.open.iter().any(|e| e.node.name == name)
    }

    fn finish(mut self, end: usize) -> Vec<ParsedNode> {
        while !self.open.is_empty() {
            self.close_top(end);
        }
        self.roots
    }
}

impl TagSoupParser {
    /// Create a lenient parser
    #[must_use]
    pub const fn new() -> Self {
        Self { strict: false }
    }

    /// Create a parser that rejects more than one root element
    #[must_use]
    pub const fn strict() -> Self {
        Self { strict: true }
    }

    fn push_text(forest: &mut ForestBuilder, markup: &str, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let raw = &markup[start..end];
        if raw.trim().is_empty() && forest.open.is_empty() {
            return;
        }
        forest.append(
            ParsedNode::text(decode_entities(raw)).with_span(SourceSpan::new(start, end)),
        );
    }
}

impl MarkupParser for TagSoupParser {
    fn parse(&self, markup: &str) -> DomscopeResult<Vec<ParsedNode>> {
        let mut forest = ForestBuilder::default();
        let mut cursor = 0;

        while cursor < markup.len() {
            let Some(caps) = token_regex().captures_at(markup, cursor) else {
                break;
            };
            let Some(token) = caps.get(0) else {
                break;
            };
            Self::push_text(&mut forest, markup, cursor, token.start());
            cursor = token.end();

            if let Some(comment) = caps.name("comment") {
                forest.append(
                    ParsedNode::comment(comment.as_str())
                        .with_span(SourceSpan::new(token.start(), token.end())),
                );
            } else if let Some(close) = caps.name("close") {
                let name = close.as_str().to_ascii_lowercase();
                if forest.is_open(&name) {
                    while let Some(top) = forest.open.last() {
                        let matched = top.node.name == name;
                        forest.close_top(token.end());
                        if matched {
                            break;
                        }
                    }
                } else {
                    forest.append(ParsedNode {
                        node_type: ParsedNodeType::Invalid,
                        text: token.as_str().to_string(),
                        span: Some(SourceSpan::new(token.start(), token.end())),
                        ..ParsedNode::element(name)
                    });
                }
            } else if let Some(open) = caps.name("open") {
                let name = open.as_str().to_ascii_lowercase();
                let mut node = ParsedNode::element(name.as_str());
                node.attributes = caps
                    .name("attrs")
                    .map(|m| parse_attributes(m.as_str()))
                    .unwrap_or_default();
                let self_closing = caps.name("selfclose").is_some_and(|m| !m.as_str().is_empty());

                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    forest.append(node.with_span(SourceSpan::new(token.start(), token.end())));
                } else if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    let closing = format!("</{name}");
                    let body_end = markup[cursor..]
                        .to_ascii_lowercase()
                        .find(&closing)
                        .map_or(markup.len(), |pos| cursor + pos);
                    if body_end > cursor {
                        node.children.push(
                            ParsedNode::text(&markup[cursor..body_end])
                                .with_span(SourceSpan::new(cursor, body_end)),
                        );
                    }
                    let end = markup[body_end..]
                        .find('>')
                        .map_or(markup.len(), |pos| body_end + pos + 1);
                    forest.append(node.with_span(SourceSpan::new(token.start(), end)));
                    cursor = end;
                } else {
                    forest.open(node, token.start());
                }
            }
            // Doctype and processing instructions are skipped.
        }
        Self::push_text(&mut forest, markup, cursor, markup.len());

        let roots = forest.finish(markup.len());
        if self.strict {
            let elements = roots.iter().filter(|n| n.is_element()).count();
            if elements > 1 {
                return Err(DomscopeError::malformed(format!(
                    "markup has {elements} root elements, expected exactly one"
                )));
            }
        }
        Ok(roots)
    }
}
