//! Raw DOM, accessibility and viewport capture.
//!
//! Wraps the CDP driver (`cdp-adapter`) to produce an arena-backed
//! [`model::DomTree`] plus viewport metrics and tab list, degrading to a
//! minimal tree rather than failing when capture stalls or the injected
//! script errors.

pub mod errors;
pub mod metrics;
pub mod model;
pub mod observer;
pub mod parse;

pub use errors::ObserverError;
pub use model::{Bounds, CaptureOptions, DomTree, NodeKind, ObserverOutput, RawNode, TabInfo, ViewportMetrics};
pub use observer::{CdpDomObserver, DomObserver};

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::{AxSnapshotResult, DomSnapshotResult};
    use serde_json::json;

    fn sample_snapshot() -> DomSnapshotResult {
        // strings: 0="html" 1="body" 2="div" 3="class" 4="wrap" 5="button" 6="id" 7="go"
        let strings = vec![
            "html".to_string(),
            "body".to_string(),
            "div".to_string(),
            "class".to_string(),
            "wrap".to_string(),
            "button".to_string(),
            "id".to_string(),
            "go".to_string(),
        ];
        let nodes = json!({
            "parentIndex": [-1, 0, 1, 2],
            "nodeType": [9, 1, 1, 1],
            "nodeName": [0, 1, 2, 5],
            "nodeValue": [-1, -1, -1, -1],
            "backendNodeId": [1, 2, 3, 4],
            "attributes": [[], [], [3, 4], [6, 7]],
        });
        let document = json!({
            "nodes": nodes,
            "layout": { "nodeIndex": [3], "bounds": [[10.0, 20.0, 100.0, 30.0]] },
        });
        DomSnapshotResult {
            documents: vec![document.clone()],
            strings,
            raw: document,
        }
    }

    #[test]
    fn parses_flat_node_arrays_into_arena_tree() {
        let snapshot = sample_snapshot();
        let tree = parse::parse_dom_snapshot(&snapshot).expect("parse should succeed");
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.nodes[0].kind, NodeKind::Document);
        assert_eq!(tree.nodes[1].tag.as_deref(), Some("body"));
        assert_eq!(tree.nodes[2].attributes.get("class"), Some(&"wrap".to_string()));
        assert_eq!(tree.nodes[3].tag.as_deref(), Some("button"));
        assert_eq!(tree.nodes[3].attributes.get("id"), Some(&"go".to_string()));
        assert_eq!(tree.nodes[3].bounds.unwrap().width, 100.0);
        assert_eq!(tree.nodes[3].parent, Some(2));
        assert!(tree.nodes[2].children.contains(&3));
    }

    #[test]
    fn xpath_reflects_ancestor_chain() {
        let snapshot = sample_snapshot();
        let tree = parse::parse_dom_snapshot(&snapshot).unwrap();
        assert_eq!(tree.nodes[3].xpath, "/html/body/div/button");
    }

    #[test]
    fn merges_ax_role_and_name_by_backend_id() {
        let snapshot = sample_snapshot();
        let mut tree = parse::parse_dom_snapshot(&snapshot).unwrap();
        let ax = AxSnapshotResult {
            nodes: vec![json!({
                "backendDOMNodeId": 4,
                "role": { "value": "button" },
                "name": { "value": "Go" },
                "properties": [{ "name": "focusable", "value": { "value": true } }],
            })],
            tree_id: None,
            raw: json!({}),
        };
        parse::merge_ax_snapshot(&mut tree, &ax);
        assert_eq!(tree.nodes[3].ax_role.as_deref(), Some("button"));
        assert_eq!(tree.nodes[3].ax_name.as_deref(), Some("Go"));
        assert_eq!(
            tree.nodes[3].ax_properties.get("focusable"),
            Some(&json!(true))
        );
    }

    #[test]
    fn detects_pdf_viewer_by_url_suffix() {
        let tree = DomTree::minimal();
        assert!(parse::detect_pdf_viewer(&tree, "https://example.com/file.pdf"));
        assert!(parse::detect_pdf_viewer(&tree, "https://example.com/file.pdf?x=1"));
        assert!(!parse::detect_pdf_viewer(&tree, "https://example.com/file.html"));
    }

    #[test]
    fn minimal_tree_is_body_only() {
        let tree = DomTree::minimal();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].tag.as_deref(), Some("body"));
    }

    #[test]
    fn document_order_is_preorder() {
        let snapshot = sample_snapshot();
        let tree = parse::parse_dom_snapshot(&snapshot).unwrap();
        assert_eq!(tree.document_order(), vec![0, 1, 2, 3]);
    }
}
