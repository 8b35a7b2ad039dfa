use std::collections::BTreeMap;

use dom_observer::Bounds;
use serde::{Deserialize, Serialize};

/// An entry in the selector map: enough of the raw node's identity to
/// re-resolve it against a later capture (spec §4.7 replay re-resolution
/// order: backendNodeId, xpath, stable hash, ax_name).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub backend_node_id: Option<u64>,
    pub xpath: String,
    pub tag: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub ax_name: Option<String>,
    pub is_new: bool,
    /// Carried through so callers can draw highlight overlays over the
    /// element's on-page position without re-walking the raw tree.
    pub bounds: Option<Bounds>,
}

/// Maps small positive integers (document-order interactive indices) to the
/// element they refer to. Rebuilt fresh on every capture (spec §3: "stable
/// only within one capture").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SelectorMap {
    pub entries: BTreeMap<u32, SelectorEntry>,
}

impl SelectorMap {
    pub fn get(&self, index: u32) -> Option<&SelectorEntry> {
        self.entries.get(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Default 40000, capped at the last complete rendered line (spec §4.2).
    pub max_chars: usize,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { max_chars: 40_000 }
    }
}

#[derive(Clone, Debug)]
pub struct SerializedState {
    pub rendered: String,
    pub selector_map: SelectorMap,
}
