//! Translates a raw `DOMSnapshot.captureSnapshot` + `Accessibility.getFullAXTree`
//! pair into a [`DomTree`].
//!
//! CDP's snapshot format stores node names/values/attributes as indices into
//! a shared `strings[]` table rather than inline strings, and parent
//! relationships as a flat `parentIndex` array parallel to `nodeName`. This
//! module decodes that shape into the arena `DomTree` the rest of the crate
//! works with.

use std::collections::BTreeMap;

use cdp_adapter::{AxSnapshotResult, DomSnapshotResult};
use serde_json::Value;

use crate::errors::ObserverError;
use crate::model::{Bounds, DomTree, NodeKind, RawNode};

fn decode_indexed_string(strings: &[String], idx: i64) -> Option<String> {
    if idx < 0 {
        return None;
    }
    strings.get(idx as usize).cloned()
}

fn i64_array(value: &Value, field: &str) -> Vec<i64> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default()
}

fn node_name_for_type(node_type: i64) -> NodeKind {
    match node_type {
        9 => NodeKind::Document,
        11 => NodeKind::Fragment,
        3 | 4 => NodeKind::Text,
        _ => NodeKind::Element,
    }
}

/// Decodes a node's flattened `attributes` index array (name, value, name,
/// value, ...) into a map, looking each entry up in `strings`.
fn decode_attributes(strings: &[String], flat: &[i64]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut it = flat.chunks_exact(2);
    for pair in &mut it {
        if let (Some(name), Some(value)) = (
            decode_indexed_string(strings, pair[0]),
            decode_indexed_string(strings, pair[1]),
        ) {
            out.insert(name, value);
        }
    }
    out
}

fn bounds_for_index(layout: &Value, target_index: i64) -> Option<Bounds> {
    let node_index = layout.get("nodeIndex")?.as_array()?;
    let rects = layout.get("bounds")?.as_array()?;
    let pos = node_index
        .iter()
        .position(|v| v.as_i64() == Some(target_index))?;
    let rect = rects.get(pos)?.as_array()?;
    if rect.len() < 4 {
        return None;
    }
    Some(Bounds {
        x: rect[0].as_f64().unwrap_or(0.0),
        y: rect[1].as_f64().unwrap_or(0.0),
        width: rect[2].as_f64().unwrap_or(0.0),
        height: rect[3].as_f64().unwrap_or(0.0),
    })
}

/// Builds an xpath-ish path for a node by walking parent links after the
/// arena is assembled; called once per node during `parse_dom_snapshot`.
fn compute_xpath(nodes: &[RawNode], idx: usize) -> String {
    let mut segments = Vec::new();
    let mut cur = Some(idx);
    while let Some(i) = cur {
        let node = &nodes[i];
        match &node.tag {
            Some(tag) => segments.push(tag.clone()),
            None => segments.push("text()".to_string()),
        }
        cur = node.parent;
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

pub fn parse_dom_snapshot(snapshot: &DomSnapshotResult) -> Result<DomTree, ObserverError> {
    let document = snapshot
        .documents
        .first()
        .ok_or_else(|| ObserverError::MalformedSnapshot("no documents in snapshot".to_string()))?;
    let nodes_obj = document
        .get("nodes")
        .ok_or_else(|| ObserverError::MalformedSnapshot("document missing nodes".to_string()))?;

    let node_name = i64_array(nodes_obj, "nodeName");
    let node_type = i64_array(nodes_obj, "nodeType");
    let node_value = i64_array(nodes_obj, "nodeValue");
    let parent_index = i64_array(nodes_obj, "parentIndex");
    let backend_node_id = i64_array(nodes_obj, "backendNodeId");
    let attributes: Vec<Vec<i64>> = nodes_obj
        .get("attributes")
        .and_then(Value::as_array)
        .map(|outer| {
            outer
                .iter()
                .map(|inner| {
                    inner
                        .as_array()
                        .map(|a| a.iter().filter_map(Value::as_i64).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    let count = node_name.len();
    if count == 0 {
        return Ok(DomTree::minimal());
    }

    let layout = document.get("layout").cloned().unwrap_or(Value::Null);

    let mut raw_nodes: Vec<RawNode> = Vec::with_capacity(count);
    for i in 0..count {
        let kind = node_name_for_type(*node_type.get(i).unwrap_or(&1));
        let tag = decode_indexed_string(&snapshot.strings, *node_name.get(i).unwrap_or(&-1))
            .map(|s| s.to_lowercase());
        let text = if kind == NodeKind::Text {
            decode_indexed_string(&snapshot.strings, *node_value.get(i).unwrap_or(&-1))
        } else {
            None
        };
        let parent = parent_index
            .get(i)
            .copied()
            .filter(|&p| p >= 0)
            .map(|p| p as usize);
        let attrs = attributes
            .get(i)
            .map(|flat| decode_attributes(&snapshot.strings, flat))
            .unwrap_or_default();
        let bounds = bounds_for_index(&layout, i as i64);
        let backend_id = backend_node_id.get(i).map(|v| *v as u64);

        raw_nodes.push(RawNode {
            kind,
            tag,
            text,
            attributes: attrs,
            children: Vec::new(),
            parent,
            xpath: String::new(),
            backend_node_id: backend_id,
            ax_role: None,
            ax_name: None,
            ax_properties: BTreeMap::new(),
            bounds,
            visible: true,
            scrollable: false,
            highlight_index: None,
            is_new: false,
        });
    }

    for i in 0..count {
        if let Some(parent) = raw_nodes[i].parent {
            if parent < raw_nodes.len() {
                raw_nodes[parent].children.push(i);
            }
        }
    }

    for i in 0..count {
        let xpath = compute_xpath(&raw_nodes, i);
        raw_nodes[i].xpath = xpath;
    }

    Ok(DomTree { nodes: raw_nodes })
}

/// Merges an AX tree's role/name/properties onto the matching raw nodes by
/// `backendDOMNodeId`.
pub fn merge_ax_snapshot(tree: &mut DomTree, ax: &AxSnapshotResult) {
    let by_backend: BTreeMap<u64, usize> = tree
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(i, n)| n.backend_node_id.map(|b| (b, i)))
        .collect();

    for ax_node in &ax.nodes {
        let backend_id = ax_node
            .get("backendDOMNodeId")
            .and_then(Value::as_u64)
            .or_else(|| ax_node.get("backendDOMNodeId").and_then(Value::as_i64).map(|v| v as u64));
        let Some(backend_id) = backend_id else { continue };
        let Some(&idx) = by_backend.get(&backend_id) else { continue };

        let node = &mut tree.nodes[idx];
        if let Some(role) = ax_node
            .get("role")
            .and_then(|r| r.get("value"))
            .and_then(Value::as_str)
        {
            node.ax_role = Some(role.to_string());
        }
        if let Some(name) = ax_node
            .get("name")
            .and_then(|n| n.get("value"))
            .and_then(Value::as_str)
        {
            node.ax_name = Some(name.to_string());
        }
        if let Some(props) = ax_node.get("properties").and_then(Value::as_array) {
            for prop in props {
                if let (Some(name), Some(value)) = (
                    prop.get("name").and_then(Value::as_str),
                    prop.get("value").and_then(|v| v.get("value")),
                ) {
                    node.ax_properties.insert(name.to_string(), value.clone());
                }
            }
        }
    }
}

/// PDF detection per the body-level URL check and embed/object element scan.
pub fn detect_pdf_viewer(tree: &DomTree, url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".pdf") || lower.contains(".pdf?") || lower.contains(".pdf#") {
        return true;
    }
    tree.nodes.iter().any(|n| {
        matches!(n.tag.as_deref(), Some("embed") | Some("object"))
            && n.attributes
                .get("type")
                .map(|t| t.eq_ignore_ascii_case("application/pdf"))
                .unwrap_or(false)
    })
}
