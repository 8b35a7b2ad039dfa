//! Event-bus payloads published alongside the recent-event ring buffer, so
//! other modules (history, agent loop) can subscribe instead of polling
//! `BrowserStateSummary::recent_events`.

use soulbrowser_event_bus::InMemoryBus;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum SessionEvent {
    NavigationStarted { url: String },
    NavigationCompleted { url: String },
    NavigationBlocked { url: String },
    NavigationFailed { url: String, error: String },
    DialogClosed { page_id: u64, message: String },
    BrowserError { page_id: u64, message: String },
}

pub type SessionEventBus = InMemoryBus<SessionEvent>;

pub fn new_bus(capacity: usize) -> Arc<SessionEventBus> {
    InMemoryBus::new(capacity)
}
