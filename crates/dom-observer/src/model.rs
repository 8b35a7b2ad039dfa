//! Raw capture data model.
//!
//! Mirrors spec §3's "DOM node (raw)": an arena of nodes linked by index,
//! never rebuilt in place except for `highlight_index`/`is_new`, which the
//! serializer stage sets on the same arena.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Fragment,
    Element,
    Text,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Fraction of `self`'s area contained within `other`, used by the
    /// serializer's containment-pruning pass.
    pub fn containment_ratio(&self, other: &Bounds) -> f64 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = (self.x + self.width).min(other.x + other.width);
        let iy1 = (self.y + self.height).min(other.y + other.height);
        let iw = (ix1 - ix0).max(0.0);
        let ih = (iy1 - iy0).max(0.0);
        let intersection = iw * ih;
        let area = self.area();
        if area <= 0.0 {
            0.0
        } else {
            intersection / area
        }
    }
}

/// A node in the raw capture arena. Children/parent link by index into the
/// owning `DomTree::nodes` vector rather than by pointer, so the tree can be
/// built from CDP's already-flat node arrays without an ownership cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: NodeKind,
    pub tag: Option<String>,
    pub text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    pub xpath: String,
    pub backend_node_id: Option<u64>,

    pub ax_role: Option<String>,
    pub ax_name: Option<String>,
    /// Flat accessibility property list: focusable, hidden, disabled,
    /// expanded, checked, selected, pressed, required, keyshortcuts, ...
    pub ax_properties: BTreeMap<String, Value>,

    pub bounds: Option<Bounds>,
    pub visible: bool,
    pub scrollable: bool,

    /// Set by the serializer during index assignment (spec §4.2 pass 4).
    pub highlight_index: Option<u32>,
    /// Transient marker set when the node's `(xpath|tag|attrs)` hash is
    /// absent from the previous capture's hash cache (spec §3/§4.3).
    pub is_new: bool,
}

impl RawNode {
    pub fn is_hidden(&self) -> bool {
        matches!(self.ax_properties.get("hidden"), Some(Value::Bool(true)))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.ax_properties.get("disabled"), Some(Value::Bool(true)))
    }
}

/// Arena-backed raw DOM tree. Index 0 is always the document root.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DomTree {
    pub nodes: Vec<RawNode>,
}

impl DomTree {
    pub fn root(&self) -> Option<&RawNode> {
        self.nodes.first()
    }

    /// Pre-order traversal starting at `root`, yielding arena indices in
    /// document order.
    pub fn document_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            if let Some(node) = self.nodes.get(idx) {
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// A minimal `body`-only tree used when capture times out (spec §4.1
    /// failure semantics: "return a minimal tree (body only)").
    pub fn minimal() -> Self {
        Self {
            nodes: vec![RawNode {
                kind: NodeKind::Element,
                tag: Some("body".to_string()),
                text: None,
                attributes: BTreeMap::new(),
                children: Vec::new(),
                parent: None,
                xpath: "/html/body".to_string(),
                backend_node_id: None,
                ax_role: None,
                ax_name: None,
                ax_properties: BTreeMap::new(),
                bounds: None,
                visible: true,
                scrollable: false,
                highlight_index: None,
                is_new: false,
            }],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ViewportMetrics {
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub page_width: i32,
    pub page_height: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabInfo {
    pub page_id: String,
    pub url: String,
    pub title: String,
    pub parent_page_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub highlight_elements: bool,
    pub viewport_expansion: i32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            highlight_elements: true,
            viewport_expansion: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObserverOutput {
    pub tree: DomTree,
    pub viewport: ViewportMetrics,
    pub tabs: Vec<TabInfo>,
    pub is_pdf_viewer: bool,
    /// Set when the capture degraded to a minimal tree; never causes
    /// `capture` itself to fail (spec §4.1: "never throws to caller").
    pub browser_error: Option<String>,
    /// Echoes `CaptureOptions::highlight_elements` so `browser-session` can
    /// decide whether to draw highlight overlays before screenshotting,
    /// without threading the original options struct back through.
    pub highlight_requested: bool,
}
