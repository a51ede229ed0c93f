//! Cached element tree.
//!
//! Nodes live in an arena owned by [`ElementTree`] and refer to each other by
//! [`NodeId`]. A parent lists its children; parent and sibling links are plain
//! ids, so there are no ownership cycles. A refresh frees the slots of the nodes
//! it replaces for reuse. Each slot carries a generation that is bumped when it
//! is freed, so an id still pointing at an old occupant reports
//! [`DomscopeError::StaleElement`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attributes::AttributeStore;
use crate::kind::{AnchorView, InputView, NodeKind, OptionView, SelectView};
use crate::markup::{SourceSpan, VOID_ELEMENTS};
use crate::result::{DomscopeError, DomscopeResult};

/// Handle to a node in an [`ElementTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Arena slot index
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    /// Occupancy count of the slot when this handle was issued
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<ElementNode>,
}

/// One element of the cached document
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub(crate) tag_name: String,
    pub(crate) kind: NodeKind,
    pub(crate) attributes: AttributeStore,
    pub(crate) inner_text: String,
    pub(crate) span: Option<SourceSpan>,
    pub(crate) tag_occurrence_index: usize,
    pub(crate) can_use_index_locator: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) previous_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl ElementNode {
    pub(crate) fn new(tag_name: &str, kind: NodeKind, attributes: AttributeStore) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            kind,
            attributes,
            inner_text: String::new(),
            span: None,
            tag_occurrence_index: 0,
            can_use_index_locator: false,
            parent: None,
            previous_sibling: None,
            next_sibling: None,
            children: Vec::new(),
        }
    }

    /// Lowercase tag name
    #[must_use]
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Kind selected by the tag registry
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Cached attributes
    #[must_use]
    pub const fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Cached direct inner text
    #[must_use]
    pub fn inner_text(&self) -> &str {
        &self.inner_text
    }

    /// Non-empty `id`
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attributes.id()
    }

    /// Non-empty `name`
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes.name()
    }

    /// Source span, `None` for synthetic nodes
    #[must_use]
    pub const fn span(&self) -> Option<SourceSpan> {
        self.span
    }

    /// Rank among same-tag nodes seen during the build pass that created it
    #[must_use]
    pub const fn tag_occurrence_index(&self) -> usize {
        self.tag_occurrence_index
    }

    /// Whether the node may be addressed by tag and index under the document root
    #[must_use]
    pub const fn can_use_index_locator(&self) -> bool {
        self.can_use_index_locator
    }

    /// Parent node
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Previous sibling
    #[must_use]
    pub const fn previous_sibling(&self) -> Option<NodeId> {
        self.previous_sibling
    }

    /// Next sibling
    #[must_use]
    pub const fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// Child elements in document order
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node has no parent
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Input view, if this is an `<input>`
    #[must_use]
    pub fn as_input(&self) -> Option<InputView<'_>> {
        (self.kind == NodeKind::Input).then(|| InputView::new(&self.attributes))
    }

    /// Anchor view, if this is an `<a>`
    #[must_use]
    pub fn as_anchor(&self) -> Option<AnchorView<'_>> {
        (self.kind == NodeKind::Anchor).then(|| AnchorView::new(&self.attributes))
    }

    /// Select view, if this is a `<select>`
    #[must_use]
    pub fn as_select(&self) -> Option<SelectView<'_>> {
        (self.kind == NodeKind::Select).then(|| SelectView::new(&self.attributes))
    }

    /// Option view, if this is an `<option>`
    #[must_use]
    pub fn as_option(&self) -> Option<OptionView<'_>> {
        (self.kind == NodeKind::OptionItem).then(|| OptionView::new(&self.attributes))
    }

    /// Short human description, e.g. `input#email` or `a[3]`
    #[must_use]
    pub fn describe(&self) -> String {
        match (self.id(), self.name()) {
            (Some(id), _) => format!("{}#{id}", self.tag_name),
            (None, Some(name)) => format!("{}[name={name}]", self.tag_name),
            (None, None) => format!("{}[{}]", self.tag_name, self.tag_occurrence_index),
        }
    }
}

/// Arena of cached elements
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
    roots: Vec<NodeId>,
}

impl ElementTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root elements in document order
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The single document root, if one is cached
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    /// Look a node up
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ElementNode> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Look a node up, reporting stale handles
    pub fn get(&self, id: NodeId) -> DomscopeResult<&ElementNode> {
        self.node(id).ok_or(DomscopeError::StaleElement { node: id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> DomscopeResult<&mut ElementNode> {
        self.node_mut(id).ok_or(DomscopeError::StaleElement { node: id })
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether the handle still refers to a live node
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of arena slots, occupied or free
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether no nodes are cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Insert a node as the last child of `parent` (or as a new root)
    pub(crate) fn append(&mut self, parent: Option<NodeId>, mut node: ElementNode) -> NodeId {
        let previous = match parent {
            Some(p) => self.node(p).and_then(|n| n.children.last().copied()),
            None => self.roots.last().copied(),
        };
        node.parent = parent;
        node.previous_sibling = previous;
        node.next_sibling = None;

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        if let Some(prev) = previous.and_then(|p| self.node_mut(p)) {
            prev.next_sibling = Some(id);
        }
        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent_node) => parent_node.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Take the node out of its slot and retire the slot's generation
    fn release(&mut self, id: NodeId) -> Option<ElementNode> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(node)
    }

    /// Free the slots of every descendant of `id` and detach them
    pub(crate) fn clear_children(&mut self, id: NodeId) -> DomscopeResult<()> {
        let mut stack = std::mem::take(&mut self.get_mut(id)?.children);
        while let Some(child) = stack.pop() {
            if let Some(node) = self.release(child) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Drop every node; all slots become free, lowest index first
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len()).rev().collect();
        self.roots.clear();
    }

    /// Descendants of `id` in pre-order, excluding `id` itself
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|n| self.pre_order(&n.children))
            .unwrap_or_default()
    }

    /// Pre-order walk over the given members and their descendants
    #[must_use]
    pub fn pre_order(&self, members: &[NodeId]) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = members.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every live node in document order
    #[must_use]
    pub fn document_order(&self) -> Vec<NodeId> {
        self.pre_order(&self.roots)
    }

    /// Ancestors of `id`, nearest first
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(id).and_then(ElementNode::parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.node(parent).and_then(ElementNode::parent);
        }
        out
    }

    /// Inner text of a node and all its descendants, space separated
    pub fn text_content(&self, id: NodeId) -> DomscopeResult<String> {
        let _ = self.get(id)?;
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        let parts: Vec<&str> = ids
            .into_iter()
            .filter_map(|n| self.node(n))
            .map(ElementNode::inner_text)
            .filter(|t| !t.is_empty())
            .collect();
        Ok(parts.join(" "))
    }

    /// Render a cached node back to markup
    pub fn outer_markup(&self, id: NodeId) -> DomscopeResult<String> {
        let mut out = String::new();
        self.write_markup(id, &mut out)?;
        Ok(out)
    }

    fn write_markup(&self, id: NodeId, out: &mut String) -> DomscopeResult<()> {
        let node = self.get(id)?;
        out.push('<');
        out.push_str(&node.tag_name);
        for (key, value) in node.attributes.iter() {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&node.tag_name.as_str()) && node.children.is_empty() {
            return Ok(());
        }
        if node.kind.is_opaque() {
            out.push_str(&node.inner_text);
        } else {
            out.push_str(
                &node
                    .inner_text
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;"),
            );
        }
        for child in &node.children {
            self.write_markup(*child, out)?;
        }
        out.push_str("</");
        out.push_str(&node.tag_name);
        out.push('>');
        Ok(())
    }
}
