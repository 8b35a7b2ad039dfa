//! Rendering: turns the reduced tree into the compact string sent to the
//! model (spec §4.2 "Rendering").

use std::collections::HashSet;

use dom_observer::{DomTree, NodeKind, RawNode};

use crate::model::SerializeOptions;
use crate::reduce::ReduceOutput;

const ATTRIBUTE_ALLOW_LIST: &[&str] = &[
    "title",
    "type",
    "checked",
    "name",
    "role",
    "value",
    "placeholder",
    "data-date-format",
    "alt",
    "aria-label",
    "aria-expanded",
    "data-state",
    "aria-checked",
];

const MAX_ATTR_VALUE_CHARS: usize = 100;

fn cap_value(value: &str) -> String {
    if value.chars().count() <= MAX_ATTR_VALUE_CHARS {
        value.to_string()
    } else {
        value.chars().take(MAX_ATTR_VALUE_CHARS).collect()
    }
}

/// Filters to `ATTRIBUTE_ALLOW_LIST`, preserving its declaration order and
/// dropping later attributes whose (capped) value duplicates an earlier
/// one (spec §4.2: "duplicates across attributes de-duplicated in
/// allow-list order").
fn filtered_attributes(node: &RawNode) -> Vec<(String, String)> {
    let mut result = Vec::new();
    let mut seen_values: HashSet<String> = HashSet::new();
    for key in ATTRIBUTE_ALLOW_LIST {
        if let Some(value) = node.attributes.get(*key) {
            if node.text.as_deref() == Some(value.as_str()) {
                continue;
            }
            let capped = cap_value(value);
            if !seen_values.insert(capped.clone()) {
                continue;
            }
            result.push((key.to_string(), capped));
        }
    }
    result
}

fn depth_of(tree: &DomTree, kept: &[bool], idx: usize) -> usize {
    let mut depth = 0;
    let mut cur = tree.nodes[idx].parent;
    while let Some(p) = cur {
        if kept[p] {
            depth += 1;
        }
        cur = tree.nodes[p].parent;
    }
    depth
}

fn marker(node: &RawNode, index: Option<u32>, is_new: bool) -> String {
    let star = if is_new { "*" } else { "" };
    match index {
        Some(idx) if node.scrollable => format!("{star}[{idx}|SCROLL+{idx}]"),
        Some(idx) if node.tag.as_deref() == Some("iframe") => format!("{star}[{idx}|IFRAME|]"),
        Some(idx) => format!("{star}[{idx}]"),
        None if node.tag.as_deref() == Some("iframe") => "[|IFRAME|]".to_string(),
        None => String::new(),
    }
}

pub fn render(tree: &DomTree, reduced: &ReduceOutput, opts: &SerializeOptions) -> String {
    let mut lines = Vec::new();

    for idx in tree.document_order() {
        if !reduced.kept[idx] || reduced.excluded_by_parent[idx] {
            continue;
        }
        let node = &tree.nodes[idx];
        let depth = depth_of(tree, &reduced.kept, idx);
        let indent = "\t".repeat(depth);

        if node.kind == NodeKind::Text {
            if let Some(text) = node.text.as_deref() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(format!("{indent}{trimmed}"));
                }
            }
            continue;
        }

        let index = reduced.index_of.get(&idx).copied();
        let is_new = index
            .and_then(|i| reduced.selector_map.get(i))
            .map(|e| e.is_new)
            .unwrap_or(false);
        let marker = marker(node, index, is_new);

        let tag = node.tag.as_deref().unwrap_or("div");
        let attrs = filtered_attributes(node);
        let attr_str = attrs
            .iter()
            .map(|(k, v)| format!(" {k}=\"{v}\""))
            .collect::<String>();

        lines.push(format!("{indent}{marker}<{tag}{attr_str} />"));
    }

    let full = lines.join("\n");
    truncate_at_last_line(&full, opts.max_chars)
}

/// Marker appended when output is cut off (spec §4.2/§8: "truncated at the
/// last newline and suffixed with a truncation marker").
const TRUNCATION_MARKER: &str = "\n... [truncated]";

pub(crate) fn truncate_at_last_line(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    let cut = match truncated.rfind('\n') {
        Some(pos) => truncated[..pos].to_string(),
        None => truncated,
    };
    cut + TRUNCATION_MARKER
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node_with_attrs(attrs: &[(&str, &str)]) -> RawNode {
        let mut attributes = BTreeMap::new();
        for (k, v) in attrs {
            attributes.insert(k.to_string(), v.to_string());
        }
        RawNode {
            kind: NodeKind::Element,
            tag: Some("div".to_string()),
            text: None,
            attributes,
            children: Vec::new(),
            parent: None,
            xpath: String::new(),
            backend_node_id: None,
            ax_role: None,
            ax_name: None,
            ax_properties: BTreeMap::new(),
            bounds: None,
            visible: true,
            scrollable: false,
            highlight_index: None,
            is_new: false,
        }
    }

    #[test]
    fn attributes_render_in_allow_list_order_not_alphabetical() {
        let node = node_with_attrs(&[("alt", "Submit"), ("title", "Submit the form")]);
        let attrs = filtered_attributes(&node);
        assert_eq!(attrs[0].0, "title");
        assert_eq!(attrs[1].0, "alt");
    }

    #[test]
    fn duplicate_values_across_attributes_keep_only_first_in_allow_list_order() {
        let node = node_with_attrs(&[("alt", "Go"), ("aria-label", "Go")]);
        let attrs = filtered_attributes(&node);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].0, "alt");
    }
}
