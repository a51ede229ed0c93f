//! Command targets: durable references a remote agent can resolve.
//!
//! A target is built from the cached tree in priority order:
//!
//! 1. non-empty `id` gives `Id { id }`
//! 2. non-empty `name` gives `Id { id: name }`
//! 3. the document root gives `TagIndex { tag_name, index }`
//! 4. anything else is addressed relative to its nearest localizable ancestor,
//!    counting same-tag descendants of that ancestor in pre-order
//! 5. no localizable ancestor is a [`DomscopeError::LocatorUnbuildable`]
//!
//! [`resolve`] performs the reverse lookup against a tree, the same way the
//! remote agent does against the live document.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::{ElementNode, ElementTree, NodeId};
use crate::result::{DomscopeError, DomscopeResult};

/// Serializable reference to one element of the remote document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CommandTarget {
    /// Lookup by id, falling back to name
    Id {
        /// Id or name value
        id: String,
    },
    /// Nth occurrence of a tag in the document
    TagIndex {
        /// Lowercase tag name
        tag_name: String,
        /// Zero-based occurrence
        index: usize,
    },
    /// Nth same-tag descendant of an ancestor target
    Descendant {
        /// Target of the localizable ancestor
        ancestor: Box<CommandTarget>,
        /// Lowercase tag name of the element
        child_tag_name: String,
        /// Zero-based occurrence among the ancestor's descendants
        child_tag_index: usize,
    },
}

impl CommandTarget {
    /// Id target
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id { id: id.into() }
    }

    /// Tag and index target
    #[must_use]
    pub fn tag_index(tag_name: impl Into<String>, index: usize) -> Self {
        Self::TagIndex {
            tag_name: tag_name.into(),
            index,
        }
    }

    /// Descendant target
    #[must_use]
    pub fn descendant(
        ancestor: Self,
        child_tag_name: impl Into<String>,
        child_tag_index: usize,
    ) -> Self {
        Self::Descendant {
            ancestor: Box::new(ancestor),
            child_tag_name: child_tag_name.into(),
            child_tag_index,
        }
    }

    /// Number of ancestor hops needed to resolve this target
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Id { .. } | Self::TagIndex { .. } => 0,
            Self::Descendant { ancestor, .. } => 1 + ancestor.depth(),
        }
    }
}

impl fmt::Display for CommandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id { id } => write!(f, "#{id}"),
            Self::TagIndex { tag_name, index } => write!(f, "{tag_name}[{index}]"),
            Self::Descendant {
                ancestor,
                child_tag_name,
                child_tag_index,
            } => write!(f, "{ancestor} >> {child_tag_name}[{child_tag_index}]"),
        }
    }
}

/// Rules 1 to 3: a target that does not depend on any ancestor
fn direct_target(node: &ElementNode) -> Option<CommandTarget> {
    if let Some(id) = node.id() {
        return Some(CommandTarget::id(id));
    }
    if let Some(name) = node.name() {
        return Some(CommandTarget::id(name));
    }
    node.can_use_index_locator()
        .then(|| CommandTarget::tag_index(node.tag_name(), node.tag_occurrence_index()))
}

/// Whether a node can be addressed without an ancestor
#[must_use]
pub fn is_localizable(node: &ElementNode) -> bool {
    direct_target(node).is_some()
}

/// Build the command target for `id`
pub fn build_locator(tree: &ElementTree, id: NodeId) -> DomscopeResult<CommandTarget> {
    let node = tree.get(id)?;
    if let Some(target) = direct_target(node) {
        return Ok(target);
    }

    let Some((anchor, anchor_target)) = tree
        .ancestors(id)
        .into_iter()
        .find_map(|a| tree.node(a).and_then(direct_target).map(|t| (a, t)))
    else {
        return Err(DomscopeError::LocatorUnbuildable {
            element: node.describe(),
            reason: "no ancestor has an id, a name or document-root index eligibility"
                .to_string(),
        });
    };

    let tag = node.tag_name();
    let mut count: usize = 0;
    for descendant in tree.descendants(anchor) {
        if tree.node(descendant).is_some_and(|n| n.tag_name() == tag) {
            count += 1;
        }
        if descendant == id {
            break;
        }
    }

    Ok(CommandTarget::descendant(
        anchor_target,
        tag,
        count.saturating_sub(1),
    ))
}

/// Resolve a target against `tree` in document order
#[must_use]
pub fn resolve(tree: &ElementTree, target: &CommandTarget) -> Option<NodeId> {
    match target {
        CommandTarget::Id { id } => {
            let order = tree.document_order();
            order
                .iter()
                .copied()
                .find(|n| tree.node(*n).and_then(ElementNode::id) == Some(id.as_str()))
                .or_else(|| {
                    order
                        .iter()
                        .copied()
                        .find(|n| tree.node(*n).and_then(ElementNode::name) == Some(id.as_str()))
                })
        }
        CommandTarget::TagIndex { tag_name, index } => {
            nth_with_tag(tree, tree.document_order(), tag_name, *index)
        }
        CommandTarget::Descendant {
            ancestor,
            child_tag_name,
            child_tag_index,
        } => {
            let anchor = resolve(tree, ancestor)?;
            nth_with_tag(
                tree,
                tree.descendants(anchor),
                child_tag_name,
                *child_tag_index,
            )
        }
    }
}

fn nth_with_tag(
    tree: &ElementTree,
    candidates: Vec<NodeId>,
    tag: &str,
    index: usize,
) -> Option<NodeId> {
    candidates
        .into_iter()
        .filter(|n| {
            tree.node(*n)
                .is_some_and(|node| node.tag_name().eq_ignore_ascii_case(tag))
        })
        .nth(index)
}
