//! Dialog (`alert`/`confirm`/`beforeunload`/`prompt`) capture into the
//! closed-popup ring buffer (spec §4.3 "Dialog handling").
//!
//! Attachment is tracked per page id rather than via an actual weak
//! reference (Rust has no GC-observable page handle the way the source
//! runtime does); removing the id on `close_tab` gives the same
//! idempotent-attach/no-leak behavior in practice.

use dashmap::DashSet;

#[derive(Default)]
pub struct DialogTracker {
    attached: DashSet<u64>,
}

impl DialogTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a page is seen, so the caller installs
    /// its dialog handler exactly once.
    pub fn attach_if_absent(&self, page_id: u64) -> bool {
        self.attached.insert(page_id)
    }

    pub fn detach(&self, page_id: u64) {
        self.attached.remove(&page_id);
    }
}

pub fn format_closed_popup_message(dialog_kind: &str, text: &str) -> String {
    format!("[{dialog_kind}] {text}")
}

pub fn auto_accepts(dialog_kind: &str) -> bool {
    matches!(dialog_kind, "alert" | "confirm" | "beforeunload")
}
