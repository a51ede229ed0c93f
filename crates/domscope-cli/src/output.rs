//! Output formatting for inspected trees and find results

use serde::Serialize;

use domscope::{build_locator, CommandTarget, ElementTree, NodeId};

/// One element of an inspected tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    /// Arena handle
    pub node: NodeId,
    /// Nesting depth, 0 for the root
    pub depth: usize,
    /// Lowercase tag name
    pub tag: String,
    /// Rank among same-tag nodes in document order
    pub occurrence_index: usize,
    /// `id` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `name` attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Cached direct inner text
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Command target, when one can be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<CommandTarget>,
    /// Why no target could be built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator_error: Option<String>,
}

/// Describe `nodes` in the given order
#[must_use]
pub fn collect_rows(tree: &ElementTree, nodes: &[NodeId]) -> Vec<NodeRow> {
    nodes
        .iter()
        .filter_map(|&id| {
            let node = tree.node(id)?;
            let (target, locator_error) = match build_locator(tree, id) {
                Ok(target) => (Some(target), None),
                Err(err) => (None, Some(err.to_string())),
            };
            Some(NodeRow {
                node: id,
                depth: tree.ancestors(id).len(),
                tag: node.tag_name().to_string(),
                occurrence_index: node.tag_occurrence_index(),
                id: node.id().map(str::to_string),
                name: node.name().map(str::to_string),
                text: node.inner_text().to_string(),
                target,
                locator_error,
            })
        })
        .collect()
}

/// Longest inner text shown in text output
const TEXT_PREVIEW_CHARS: usize = 40;

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TEXT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Render rows as an indented outline
#[must_use]
pub fn render_text(rows: &[NodeRow], indent: bool) -> String {
    let mut out = String::new();
    for row in rows {
        if indent {
            out.push_str(&"  ".repeat(row.depth));
        }
        out.push_str(&row.tag);
        if let Some(id) = &row.id {
            out.push_str(&format!("#{id}"));
        } else if let Some(name) = &row.name {
            out.push_str(&format!("[name={name}]"));
        }
        out.push_str(&format!(" ({})", row.occurrence_index));
        match (&row.target, &row.locator_error) {
            (Some(target), _) => out.push_str(&format!(" -> {target}")),
            (None, Some(_)) => out.push_str(" -> (no locator)"),
            (None, None) => {}
        }
        if !row.text.is_empty() {
            out.push_str(&format!(" {:?}", preview(&row.text)));
        }
        out.push('\n');
    }
    out
}
