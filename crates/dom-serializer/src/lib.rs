//! Compresses a raw DOM capture into an index-addressable string and
//! selector map (spec §4.2).

pub mod interactive;
pub mod model;
pub mod reduce;
pub mod render;

use std::collections::HashSet;

use dom_observer::DomTree;

pub use model::{SelectorEntry, SelectorMap, SerializeOptions, SerializedState};

/// Runs the four-pass reduction and renders the result. `previous_backend_ids`
/// carries forward the prior capture's selector-map backend node ids so newly
/// appeared elements can be flagged `is_new` (spec §4.2 pass 4).
pub fn serialize(
    tree: &DomTree,
    previous_backend_ids: Option<&HashSet<u64>>,
    opts: &SerializeOptions,
) -> SerializedState {
    let reduced = reduce::reduce(tree, previous_backend_ids);
    let rendered = render::render(tree, &reduced, opts);
    SerializedState {
        rendered,
        selector_map: reduced.selector_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_observer::{Bounds, NodeKind, RawNode};
    use std::collections::BTreeMap;

    fn leaf(kind: NodeKind, tag: Option<&str>, parent: Option<usize>) -> RawNode {
        RawNode {
            kind,
            tag: tag.map(String::from),
            text: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent,
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

    /// body > button[id=go], body > div (non-interactive, dropped)
    fn sample_tree() -> DomTree {
        let mut body = leaf(NodeKind::Element, Some("body"), None);
        let mut button = leaf(NodeKind::Element, Some("button"), Some(0));
        button.backend_node_id = Some(10);
        button.bounds = Some(Bounds { x: 0.0, y: 0.0, width: 80.0, height: 30.0 });
        button.attributes.insert("aria-label".to_string(), "Go".to_string());
        let filler = leaf(NodeKind::Element, Some("div"), Some(0));

        body.children = vec![1, 2];
        DomTree {
            nodes: vec![body, button, filler],
        }
    }

    #[test]
    fn assigns_index_to_interactive_visible_node_only() {
        let tree = sample_tree();
        let state = serialize(&tree, None, &SerializeOptions::default());
        assert_eq!(state.selector_map.len(), 1);
        assert!(state.selector_map.get(1).is_some());
    }

    #[test]
    fn rendered_line_carries_index_marker() {
        let tree = sample_tree();
        let state = serialize(&tree, None, &SerializeOptions::default());
        assert!(state.rendered.contains("[1]"));
        assert!(state.rendered.contains("<button"));
    }

    #[test]
    fn new_backend_id_not_in_previous_set_is_flagged_new() {
        let tree = sample_tree();
        let previous: HashSet<u64> = HashSet::new();
        let state = serialize(&tree, Some(&previous), &SerializeOptions::default());
        assert!(state.selector_map.get(1).unwrap().is_new);

        let mut seen_before = HashSet::new();
        seen_before.insert(10u64);
        let state2 = serialize(&tree, Some(&seen_before), &SerializeOptions::default());
        assert!(!state2.selector_map.get(1).unwrap().is_new);
    }

    #[test]
    fn containment_prune_excludes_fully_contained_plain_span() {
        let mut anchor = leaf(NodeKind::Element, Some("a"), Some(0));
        anchor.bounds = Some(Bounds { x: 0.0, y: 0.0, width: 100.0, height: 20.0 });
        let mut inner_span = leaf(NodeKind::Element, Some("span"), Some(1));
        inner_span.bounds = Some(Bounds { x: 10.0, y: 5.0, width: 40.0, height: 10.0 });
        inner_span.ax_properties.insert("focusable".to_string(), serde_json::Value::Bool(true));

        let mut body = leaf(NodeKind::Element, Some("body"), None);
        body.children = vec![1];
        anchor.children = vec![2];

        let tree = DomTree {
            nodes: vec![body, anchor, inner_span],
        };

        let reduced = reduce::reduce(&tree, None);
        assert!(reduced.excluded_by_parent[2]);
    }

    #[test]
    fn truncation_stops_at_last_complete_line_and_appends_marker() {
        let text = "line-one\nline-two\nline-three";
        let truncated = render::truncate_at_last_line(text, 15);
        assert!(truncated.starts_with("line-one"));
        assert!(!truncated.contains("line-two"));
        assert!(truncated.ends_with("[truncated]"));
    }
}
