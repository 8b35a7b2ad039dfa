use std::collections::VecDeque;

use dom_serializer::SelectorMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LifecycleState {
    Uninitialized,
    Started,
    Stopping,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ClaimMode {
    Exclusive,
    Shared,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tab {
    pub page_id: u64,
    pub url: String,
    pub title: String,
    pub parent_page_id: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageInfo {
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub page_width: i32,
    pub page_height: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingNetworkRequest {
    pub url: String,
    pub method: String,
    pub loading_duration_ms: u64,
    pub resource_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecentEvent {
    pub event_type: String,
    pub timestamp_ms: u64,
    pub url: Option<String>,
    pub error_message: Option<String>,
    pub page_id: Option<u64>,
}

/// Bounded FIFO ring buffer (spec §3 "RecentEvent"/"ClosedPopupMessage").
#[derive(Clone, Debug, Default)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    cap: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.cap {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrowserStateSummary {
    pub url: String,
    pub title: String,
    pub tabs: Vec<Tab>,
    #[serde(skip)]
    pub selector_map: SelectorMap,
    pub dom_string: Option<String>,
    pub screenshot: Option<String>,
    pub page_info: PageInfo,
    pub pixels_above: i32,
    pub pixels_below: i32,
    pub pixels_left: i32,
    pub pixels_right: i32,
    pub is_pdf_viewer: bool,
    pub loading_status: Option<String>,
    pub browser_errors: Vec<String>,
    pub pending_network_requests: Vec<PendingNetworkRequest>,
    pub closed_popup_messages: Vec<String>,
    pub recent_events: Option<Vec<RecentEvent>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub error: Option<String>,
    pub extracted_content: Option<String>,
    pub include_extracted_content_only_once: bool,
    pub long_term_memory: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CaptureRequestOptions {
    pub cache_hashes: bool,
    pub include_screenshot: bool,
    pub highlight_elements: bool,
    /// Pixels beyond the viewport still considered visible; negative
    /// disables the filter entirely. 0 (the default) is viewport-exact.
    pub viewport_expansion: i32,
}
