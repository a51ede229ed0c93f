//! Assembles [`ElementTree`]s from parser output.
//!
//! One build pass walks the parsed forest depth-first with an explicit stack of
//! open parents. Every element gets its tag occurrence index from a per-pass
//! counter map, so same-tag nodes are numbered 0, 1, 2... in document order
//! regardless of nesting depth.

use std::collections::HashMap;
use tracing::trace;

use crate::attributes::AttributeStore;
use crate::kind::TagRegistry;
use crate::markup::{ParsedNode, ParsedNodeType};
use crate::node::{ElementNode, ElementTree, NodeId};
use crate::result::{DomscopeError, DomscopeResult};

/// Builds and rebuilds cached trees
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    registry: TagRegistry,
}

/// Pick the one root element out of a parsed forest
fn single_root(nodes: &[ParsedNode]) -> DomscopeResult<&ParsedNode> {
    let mut elements = nodes.iter().filter(|n| n.is_element());
    match (elements.next(), elements.next()) {
        (Some(root), None) => Ok(root),
        (None, _) => Err(DomscopeError::malformed("markup contains no root element")),
        (Some(_), Some(_)) => Err(DomscopeError::malformed(format!(
            "markup contains {} root elements, expected exactly one",
            nodes.iter().filter(|n| n.is_element()).count()
        ))),
    }
}

/// Append trimmed text to an inner text buffer, single-space separated
fn append_text(buffer: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(text);
}

/// Verbatim text of every descendant of an opaque element
fn verbatim_text(node: &ParsedNode) -> String {
    let mut out = String::new();
    let mut stack: Vec<&ParsedNode> = node.children.iter().rev().collect();
    while let Some(current) = stack.pop() {
        match current.node_type {
            ParsedNodeType::Element => stack.extend(current.children.iter().rev()),
            _ => out.push_str(&current.text),
        }
    }
    out
}

/// State of one build pass
struct BuildPass<'r> {
    registry: &'r TagRegistry,
    counters: HashMap<String, usize>,
}

impl<'r> BuildPass<'r> {
    fn new(registry: &'r TagRegistry) -> Self {
        Self {
            registry,
            counters: HashMap::new(),
        }
    }

    fn next_occurrence(&mut self, tag: &str) -> usize {
        let counter = self.counters.entry(tag.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }

    fn make_element(&mut self, parsed: &ParsedNode) -> ElementNode {
        let tag = parsed.name.to_ascii_lowercase();
        let kind = self.registry.kind_for(&tag);
        let mut node = ElementNode::new(
            &tag,
            kind,
            AttributeStore::from_pairs(parsed.attributes.iter().map(|(k, v)| (k, v.clone()))),
        );
        node.span = parsed.span;
        node.tag_occurrence_index = self.next_occurrence(&tag);
        if node.kind.is_opaque() {
            node.inner_text = verbatim_text(parsed);
        }
        node
    }

    /// Build `children` under `parent`, depth-first in document order
    fn build_children(
        &mut self,
        tree: &mut ElementTree,
        parent: NodeId,
        children: &[ParsedNode],
    ) -> DomscopeResult<()> {
        let mut stack: Vec<(NodeId, &ParsedNode)> =
            children.iter().rev().map(|c| (parent, c)).collect();

        while let Some((owner, parsed)) = stack.pop() {
            match parsed.node_type {
                ParsedNodeType::Element => {
                    let node = self.make_element(parsed);
                    let opaque = node.kind.is_opaque();
                    let id = tree.append(Some(owner), node);
                    if !opaque {
                        stack.extend(parsed.children.iter().rev().map(|c| (id, c)));
                    }
                }
                ParsedNodeType::Text | ParsedNodeType::Comment => {
                    append_text(&mut tree.get_mut(owner)?.inner_text, &parsed.text);
                }
                ParsedNodeType::Invalid => {
                    trace!(markup = %parsed.text, "skipping invalid markup node");
                }
            }
        }
        Ok(())
    }
}

impl TreeBuilder {
    /// Create a builder with a custom tag registry
    #[must_use]
    pub const fn new(registry: TagRegistry) -> Self {
        Self { registry }
    }

    /// Tag registry in use
    #[must_use]
    pub const fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Build a fresh document tree from parsed markup
    pub fn build(&self, nodes: &[ParsedNode]) -> DomscopeResult<ElementTree> {
        let mut tree = ElementTree::new();
        let _ = self.replace_document(&mut tree, nodes)?;
        Ok(tree)
    }

    /// Replace every cached node with a tree built from `nodes`.
    ///
    /// The new root is built directly under the document, which makes it
    /// eligible for tag-and-index addressing.
    pub fn replace_document(
        &self,
        tree: &mut ElementTree,
        nodes: &[ParsedNode],
    ) -> DomscopeResult<NodeId> {
        let parsed_root = single_root(nodes)?;
        let mut pass = BuildPass::new(&self.registry);
        let mut root = pass.make_element(parsed_root);
        root.can_use_index_locator = true;

        tree.clear();
        let root_id = tree.append(None, root);
        if !tree.get(root_id)?.kind.is_opaque() {
            pass.build_children(tree, root_id, &parsed_root.children)?;
        }
        trace!(root = %root_id, nodes = tree.len(), "built document tree");
        Ok(root_id)
    }

    /// Refresh `scope` in place from a snapshot whose single root is the scope
    /// element itself: attributes and inner text are replaced wholesale and the
    /// children are rebuilt. The scope keeps its id and occurrence index.
    pub fn replace_subtree(
        &self,
        tree: &mut ElementTree,
        scope: NodeId,
        nodes: &[ParsedNode],
    ) -> DomscopeResult<()> {
        let parsed_root = single_root(nodes)?;
        let mut pass = BuildPass::new(&self.registry);
        let fresh = pass.make_element(parsed_root);

        tree.clear_children(scope)?;
        let node = tree.get_mut(scope)?;
        node.attributes = fresh.attributes;
        node.inner_text = fresh.inner_text;
        node.span = fresh.span;
        let opaque = node.kind.is_opaque();
        if !opaque {
            pass.build_children(tree, scope, &parsed_root.children)?;
        }
        trace!(scope = %scope, "rebuilt subtree");
        Ok(())
    }
}
