//! Command parameter types exposed by the CDP adapter interface.

use serde::{Deserialize, Serialize};

/// Specification for a DOM query operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuerySpec {
    pub selector: String,
    pub scope: QueryScope,
}

/// Query scope determines which portion of the document the adapter should inspect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum QueryScope {
    Document,
    Frame(String),
}

/// Target for click or typing operations (L2 resolves concrete data; L0 only injects).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Anchor {
    pub backend_node_id: Option<u64>,
    pub x: f64,
    pub y: f64,
}

/// Wait gate definitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WaitGate {
    DomReady,
    NetworkQuiet { window_ms: u64, max_inflight: u32 },
    FrameStable { min_stable_ms: u64 },
}

/// Options for capturing screenshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreenshotOptions {
    pub clip: Option<ScreenshotClip>,
    pub format: ScreenshotFormat,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScreenshotClip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ScreenshotFormat {
    Png,
    Jpeg { quality: Option<u8> },
}

/// Placeholder for accessor types that will wrap DOM/AX snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub include_dom: bool,
    pub include_ax: bool,
}

/// Selection target for `select_option`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectSpec {
    pub selector: String,
    pub value: String,
    /// When true, `value` is matched against the option's visible label
    /// instead of its `value` attribute.
    pub match_label: bool,
}

/// Parameters for `DOMSnapshot.captureSnapshot`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomSnapshotConfig {
    pub computed_style_whitelist: Vec<String>,
    pub include_paint_order: bool,
}

impl Default for DomSnapshotConfig {
    fn default() -> Self {
        Self {
            computed_style_whitelist: vec![
                "display".to_string(),
                "visibility".to_string(),
                "opacity".to_string(),
            ],
            include_paint_order: true,
        }
    }
}

/// Result of a `DOMSnapshot.captureSnapshot` call: the raw `documents` array,
/// the indexed `strings` table nodes reference into, and the full response
/// for callers that need fields this shape doesn't surface explicitly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DomSnapshotResult {
    pub documents: Vec<serde_json::Value>,
    pub strings: Vec<String>,
    pub raw: serde_json::Value,
}

/// Parameters for `Accessibility.getFullAXTree`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AxSnapshotConfig {
    pub frame_id: Option<String>,
    pub max_depth: Option<u32>,
    pub fetch_relatives: bool,
}

/// Result of `Accessibility.getFullAXTree`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxSnapshotResult {
    pub nodes: Vec<serde_json::Value>,
    pub tree_id: Option<String>,
    pub raw: serde_json::Value,
}
