//! Find predicates and the cached-tree matcher.
//!
//! [`FindParams`] is an immutable conjunction of optional criteria. Empty
//! criteria are wildcards. `index` skips that many matches across the whole
//! scope in document order, so `index = 2` selects the third match.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::{ElementNode, ElementTree, NodeId};
use crate::result::{DomscopeError, DomscopeResult};

/// How a string criterion is compared (always case-insensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    /// Whole-string equality
    #[default]
    Literal,
    /// Candidate ends with the value
    EndsWith,
    /// Candidate contains the value
    Contains,
    /// Value is a regular expression searched in the candidate
    Regex,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Literal => "literal",
            Self::EndsWith => "ends-with",
            Self::Contains => "contains",
            Self::Regex => "regex",
        };
        f.write_str(name)
    }
}

/// A compiled string criterion
#[derive(Debug, Clone)]
pub struct TextMatch {
    value: String,
    method: MatchMethod,
    lowered: String,
    regex: Option<Regex>,
}

impl TextMatch {
    /// Compile a criterion; invalid regular expressions are rejected here
    pub fn new(value: impl Into<String>, method: MatchMethod) -> DomscopeResult<Self> {
        let value = value.into();
        let regex = match method {
            MatchMethod::Regex => Some(RegexBuilder::new(&value).case_insensitive(true).build()?),
            _ => None,
        };
        Ok(Self {
            lowered: value.to_lowercase(),
            value,
            method,
            regex,
        })
    }

    /// Literal criterion
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            lowered: value.to_lowercase(),
            value,
            method: MatchMethod::Literal,
            regex: None,
        }
    }

    /// Raw value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Comparison method
    #[must_use]
    pub const fn method(&self) -> MatchMethod {
        self.method
    }

    /// Test a candidate string
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        match (&self.regex, self.method) {
            (Some(regex), _) => regex.is_match(candidate),
            (None, MatchMethod::Literal) => candidate.to_lowercase() == self.lowered,
            (None, MatchMethod::EndsWith) => candidate.to_lowercase().ends_with(&self.lowered),
            (None, MatchMethod::Contains) => candidate.to_lowercase().contains(&self.lowered),
            (None, MatchMethod::Regex) => false,
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            MatchMethod::Literal => write!(f, "'{}'", self.value),
            method => write!(f, "{method}('{}')", self.value),
        }
    }
}

/// Extra attribute criterion; fails when the attribute is absent
#[derive(Debug, Clone)]
pub struct AttributePredicate {
    name: String,
    matcher: TextMatch,
}

impl AttributePredicate {
    /// Attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value criterion
    #[must_use]
    pub const fn matcher(&self) -> &TextMatch {
        &self.matcher
    }

    fn matches(&self, node: &ElementNode) -> bool {
        node.attributes()
            .raw(&self.name)
            .is_some_and(|value| self.matcher.is_match(value))
    }
}

/// Query predicate
#[derive(Debug, Clone, Default)]
pub struct FindParams {
    id_or_name: Option<TextMatch>,
    tag_name: Option<String>,
    inner_text: Option<String>,
    index: usize,
    attributes: Vec<AttributePredicate>,
}

impl FindParams {
    /// Start building a query
    #[must_use]
    pub fn builder() -> FindParamsBuilder {
        FindParamsBuilder::default()
    }

    /// Match on id or name, literally
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            id_or_name: (!id.is_empty()).then(|| TextMatch::literal(id)),
            ..Self::default()
        }
    }

    /// Match on tag name
    #[must_use]
    pub fn by_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            tag_name: (!tag.trim().is_empty()).then(|| tag.trim().to_ascii_lowercase()),
            ..Self::default()
        }
    }

    /// Match on tag name, selecting the `index`-th match
    #[must_use]
    pub fn by_tag_index(tag: impl Into<String>, index: usize) -> Self {
        Self {
            index,
            ..Self::by_tag(tag)
        }
    }

    /// Id-or-name criterion
    #[must_use]
    pub const fn id_or_name(&self) -> Option<&TextMatch> {
        self.id_or_name.as_ref()
    }

    /// Tag criterion
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    /// Inner text criterion
    #[must_use]
    pub fn inner_text(&self) -> Option<&str> {
        self.inner_text.as_deref()
    }

    /// Number of matches to skip
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Attribute criteria
    #[must_use]
    pub fn attributes(&self) -> &[AttributePredicate] {
        &self.attributes
    }

    /// Whether the query filters on attribute values
    #[must_use]
    pub fn has_attribute_predicates(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Names of the attributes the query reads
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// Test one node against every criterion (ignores `index`)
    #[must_use]
    pub fn matches(&self, node: &ElementNode) -> bool {
        if let Some(matcher) = &self.id_or_name {
            let id_hit = node.id().is_some_and(|id| matcher.is_match(id));
            let name_hit = node.name().is_some_and(|name| matcher.is_match(name));
            if !id_hit && !name_hit {
                return false;
            }
        }
        if let Some(tag) = &self.tag_name {
            if !node.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.attributes.iter().all(|a| a.matches(node)) {
            return false;
        }
        if let Some(text) = &self.inner_text {
            if node.inner_text().trim().to_lowercase() != text.to_lowercase() {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for FindParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(tag) = &self.tag_name {
            parts.push(format!("tag='{tag}'"));
        }
        if let Some(id) = &self.id_or_name {
            parts.push(format!("id-or-name={id}"));
        }
        if let Some(text) = &self.inner_text {
            parts.push(format!("inner-text='{text}'"));
        }
        for attr in &self.attributes {
            parts.push(format!("[{}={}]", attr.name, attr.matcher));
        }
        if self.index > 0 {
            parts.push(format!("index={}", self.index));
        }
        if parts.is_empty() {
            f.write_str("{any element}")
        } else {
            write!(f, "{{{}}}", parts.join(" "))
        }
    }
}

/// Builder for [`FindParams`]; criteria are validated in [`build`](Self::build)
#[derive(Debug, Clone, Default)]
pub struct FindParamsBuilder {
    id_or_name: Option<(String, MatchMethod)>,
    tag_name: Option<String>,
    inner_text: Option<String>,
    index: usize,
    attributes: Vec<(String, String, MatchMethod)>,
}

impl FindParamsBuilder {
    /// Literal id-or-name
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.id_matching(id, MatchMethod::Literal)
    }

    /// Id-or-name with an explicit method
    #[must_use]
    pub fn id_matching(mut self, value: impl Into<String>, method: MatchMethod) -> Self {
        self.id_or_name = Some((value.into(), method));
        self
    }

    /// Tag name
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    /// Exact (trimmed, case-insensitive) inner text
    #[must_use]
    pub fn inner_text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = Some(text.into());
        self
    }

    /// Skip this many matches
    #[must_use]
    pub const fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Literal attribute value
    #[must_use]
    pub fn attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_matching(name, value, MatchMethod::Literal)
    }

    /// Attribute value with an explicit method
    #[must_use]
    pub fn attribute_matching(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        method: MatchMethod,
    ) -> Self {
        self.attributes.push((name.into(), value.into(), method));
        self
    }

    /// Validate and compile
    pub fn build(self) -> DomscopeResult<FindParams> {
        let id_or_name = match self.id_or_name {
            Some((value, method)) if !value.is_empty() => Some(TextMatch::new(value, method)?),
            _ => None,
        };
        let attributes = self
            .attributes
            .into_iter()
            .map(|(name, value, method)| {
                let name = name.trim().to_ascii_lowercase();
                if name.is_empty() {
                    return Err(DomscopeError::malformed(
                        "attribute predicate requires a non-empty attribute name",
                    ));
                }
                Ok(AttributePredicate {
                    name,
                    matcher: TextMatch::new(value, method)?,
                })
            })
            .collect::<DomscopeResult<Vec<_>>>()?;

        Ok(FindParams {
            id_or_name,
            tag_name: self
                .tag_name
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty()),
            inner_text: self
                .inner_text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            index: self.index,
            attributes,
        })
    }
}

/// Whether a walk stops at the first selected match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Stop once the `index`-th match is found
    First,
    /// Collect every match after the first `index`
    All,
}

/// Walk `members` and their descendants in pre-order, applying `params`.
///
/// The skip counter for `index` is shared across the whole walk.
#[must_use]
pub fn search(
    tree: &ElementTree,
    members: &[NodeId],
    params: &FindParams,
    mode: SearchMode,
) -> Vec<NodeId> {
    let mut remaining_skips = params.index();
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = members.iter().rev().copied().collect();

    while let Some(id) = stack.pop() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        if params.matches(node) {
            if remaining_skips > 0 {
                remaining_skips -= 1;
            } else {
                found.push(id);
                if mode == SearchMode::First {
                    break;
                }
            }
        }
        stack.extend(node.children().iter().rev().copied());
    }
    found
}
