//! Per-URL hash cache used to flag newly-appeared elements between captures
//! (spec §4.3 "Hash cache").

use std::collections::{BTreeMap, HashSet};

use dom_observer::RawNode;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

fn stable_hash(node: &RawNode) -> String {
    let attrs_json = serde_json::to_string(&node.attributes).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(node.xpath.as_bytes());
    hasher.update(b"|");
    hasher.update(node.tag.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(attrs_json.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Default)]
pub struct HashCache {
    by_url: Mutex<BTreeMap<String, HashSet<String>>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the hash set recorded for `url` on the previous capture, if
    /// any, then replaces it with `nodes`'s freshly computed hashes.
    pub fn swap(&self, url: &str, nodes: &[RawNode]) -> HashSet<String> {
        let fresh: HashSet<String> = nodes.iter().map(stable_hash).collect();
        let mut guard = self.by_url.lock();
        let previous = guard.remove(url).unwrap_or_default();
        guard.insert(url.to_string(), fresh);
        previous
    }

    pub fn is_new(&self, previous: &HashSet<String>, node: &RawNode) -> bool {
        !previous.contains(&stable_hash(node))
    }
}
