//! Four-pass deterministic tree reduction (spec §4.2).

use std::collections::{BTreeMap, HashSet};

use dom_observer::{DomTree, NodeKind, RawNode};

use crate::interactive::{has_interactive_role, is_interactive, is_visible};
use crate::model::{SelectorEntry, SelectorMap};

const DROPPED_TAGS: &[&str] = &["script", "style", "head", "meta", "link", "title"];

fn is_scrollable(node: &RawNode) -> bool {
    node.scrollable
}

fn is_meaningful_text(node: &RawNode) -> bool {
    node.kind == NodeKind::Text
        && node
            .text
            .as_deref()
            .map(|t| t.trim().chars().count() >= 2)
            .unwrap_or(false)
}

fn is_propagating_element(node: &RawNode) -> bool {
    let tag = node.tag.as_deref().unwrap_or("");
    let role = node.ax_role.as_deref().unwrap_or("");
    match tag {
        "a" | "button" => true,
        "div" | "span" => matches!(role, "button" | "combobox"),
        "input" => role == "combobox",
        _ => false,
    }
}

fn is_form_control(node: &RawNode) -> bool {
    matches!(
        node.tag.as_deref(),
        Some("input") | Some("select") | Some("textarea") | Some("label")
    )
}

pub struct ReduceOutput {
    /// Survives Simplify + Optimize (passes 1-2): part of the structural tree.
    pub kept: Vec<bool>,
    /// Set during Containment prune (pass 3).
    pub excluded_by_parent: Vec<bool>,
    /// Document-order interactive index assigned in pass 4, 0 if none.
    pub index_of: BTreeMap<usize, u32>,
    pub selector_map: SelectorMap,
}

/// Passes 1+2: keep nodes that are interactive-and-visible, scrollable, or
/// meaningful text, plus any ancestor with a kept descendant; drop
/// passthrough parents with nothing kept beneath them.
fn simplify_and_optimize(tree: &DomTree) -> Vec<bool> {
    let n = tree.nodes.len();
    let mut kept = vec![false; n];

    fn visit(tree: &DomTree, idx: usize, kept: &mut Vec<bool>) -> bool {
        let node = &tree.nodes[idx];
        if let Some(tag) = node.tag.as_deref() {
            if DROPPED_TAGS.contains(&tag) {
                kept[idx] = false;
                return false;
            }
        }

        let mut has_kept_child = false;
        for &child in &node.children {
            if visit(tree, child, kept) {
                has_kept_child = true;
            }
        }

        let own = (is_interactive(node) && is_visible(node))
            || is_scrollable(node)
            || is_meaningful_text(node);

        kept[idx] = own || has_kept_child;
        kept[idx]
    }

    if n > 0 {
        visit(tree, 0, &mut kept);
    }
    kept
}

/// Pass 3: containment pruning beneath propagating ancestors.
fn containment_prune(tree: &DomTree, kept: &[bool]) -> Vec<bool> {
    let n = tree.nodes.len();
    let mut excluded = vec![false; n];

    for (idx, node) in tree.nodes.iter().enumerate() {
        if !kept[idx] || !is_propagating_element(node) {
            continue;
        }
        let Some(ancestor_bounds) = node.bounds else { continue };

        let mut stack: Vec<usize> = node.children.clone();
        while let Some(d_idx) = stack.pop() {
            let descendant = &tree.nodes[d_idx];
            stack.extend(descendant.children.iter().copied());

            if descendant.kind == NodeKind::Text {
                continue;
            }
            if !kept[d_idx] {
                continue;
            }
            let Some(d_bounds) = descendant.bounds else { continue };
            if d_bounds.containment_ratio(&ancestor_bounds) < 0.99 {
                continue;
            }
            if is_form_control(descendant)
                || is_propagating_element(descendant)
                || descendant.attributes.contains_key("onclick")
                || descendant.attributes.contains_key("aria-label")
                || has_interactive_role(descendant)
            {
                continue;
            }
            excluded[d_idx] = true;
        }
    }

    excluded
}

/// Pass 4: document-order index assignment + selector map construction.
fn assign_indices(
    tree: &DomTree,
    kept: &[bool],
    excluded: &[bool],
    previous_backend_ids: Option<&HashSet<u64>>,
) -> (BTreeMap<usize, u32>, SelectorMap) {
    let mut index_of = BTreeMap::new();
    let mut selector_map = SelectorMap::default();
    let mut next_index: u32 = 1;

    for idx in tree.document_order() {
        let node = &tree.nodes[idx];
        if !kept[idx] || excluded[idx] {
            continue;
        }
        if !(is_interactive(node) && is_visible(node)) {
            continue;
        }

        let is_new = match (previous_backend_ids, node.backend_node_id) {
            (Some(prev), Some(id)) => !prev.contains(&id),
            (Some(_), None) => true,
            (None, _) => false,
        };

        index_of.insert(idx, next_index);
        selector_map.entries.insert(
            next_index,
            SelectorEntry {
                backend_node_id: node.backend_node_id,
                xpath: node.xpath.clone(),
                tag: node.tag.clone(),
                attributes: node.attributes.clone(),
                ax_name: node.ax_name.clone(),
                is_new,
                bounds: node.bounds,
            },
        );
        next_index += 1;
    }

    (index_of, selector_map)
}

pub fn reduce(tree: &DomTree, previous_backend_ids: Option<&HashSet<u64>>) -> ReduceOutput {
    let kept = simplify_and_optimize(tree);
    let excluded_by_parent = containment_prune(tree, &kept);
    let (index_of, selector_map) = assign_indices(tree, &kept, &excluded_by_parent, previous_backend_ids);

    ReduceOutput {
        kept,
        excluded_by_parent,
        index_of,
        selector_map,
    }
}
