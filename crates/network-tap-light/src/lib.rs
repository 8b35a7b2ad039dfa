//! SoulBrowser L0 network tap (light).
//!
//! Tracks per-page in-flight request/response counters and publishes
//! window-level quiet/activity summaries so callers (the CDP adapter, and
//! through it `browser-session`'s stable-network wait) can tell when a page
//! has gone idle without re-deriving the bookkeeping themselves.

pub mod config;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use config::TapConfig;

/// Identifier representing a page for which the tap is collecting data.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PageId(pub Uuid);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Window-level summary payload published on the event bus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub page: PageId,
    pub window_ms: u64,
    pub req: u64,
    pub res2xx: u64,
    pub res4xx: u64,
    pub res5xx: u64,
    pub inflight: u64,
    pub quiet: bool,
    pub since_last_activity_ms: u64,
}

/// Snapshot representing cumulative counters exposed via pull-based API.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub req: u64,
    pub res2xx: u64,
    pub res4xx: u64,
    pub res5xx: u64,
    pub inflight: u64,
    pub quiet: bool,
    pub window_ms: u64,
    pub since_last_activity_ms: u64,
}

/// Raw CDP network lifecycle events the adapter forwards into the tap.
#[derive(Clone, Debug)]
pub enum TapEvent {
    RequestWillBeSent,
    ResponseReceived { status: u16 },
    LoadingFinished,
    LoadingFailed,
}

/// Errors emitted by the tap surface.
#[derive(Clone, Debug, Error)]
pub enum TapError {
    #[error("page not enabled")]
    PageNotEnabled,
    #[error("channel closed")]
    ChannelClosed,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Broadcast channel for network summaries.
pub type SummaryBus = broadcast::Sender<NetworkSummary>;

#[derive(Default)]
struct Counters {
    req: AtomicU64,
    res2xx: AtomicU64,
    res4xx: AtomicU64,
    res5xx: AtomicU64,
    inflight: AtomicU64,
}

struct PageState {
    counters: Counters,
    last_activity: RwLock<Instant>,
    manual_snapshot: RwLock<Option<NetworkSnapshot>>,
}

impl PageState {
    fn new() -> Self {
        Self {
            counters: Counters::default(),
            last_activity: RwLock::new(Instant::now()),
            manual_snapshot: RwLock::new(None),
        }
    }
}

/// A running maintenance task publishing periodic [`NetworkSummary`]s.
pub struct MaintenanceHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MaintenanceHandle {
    pub async fn shutdown(self) -> Result<(), TapError> {
        self.cancel.cancel();
        self.handle
            .await
            .map_err(|err| TapError::Internal(err.to_string()))
    }
}

pub struct NetworkTapLight {
    pub bus: SummaryBus,
    config: TapConfig,
    states: Arc<DashMap<PageId, Arc<PageState>>>,
}

impl NetworkTapLight {
    pub fn new(buffer: usize) -> (Self, broadcast::Receiver<NetworkSummary>) {
        Self::with_config(TapConfig::default(), buffer)
    }

    pub fn with_config(config: TapConfig, buffer: usize) -> (Self, broadcast::Receiver<NetworkSummary>) {
        let (tx, rx) = broadcast::channel(buffer);
        (
            Self {
                bus: tx,
                config,
                states: Arc::new(DashMap::new()),
            },
            rx,
        )
    }

    pub async fn enable(&self, page: PageId) -> Result<(), TapError> {
        self.states
            .entry(page)
            .or_insert_with(|| Arc::new(PageState::new()));
        Ok(())
    }

    pub async fn disable(&self, page: PageId) -> Result<(), TapError> {
        self.states
            .remove(&page)
            .map(|_| ())
            .ok_or(TapError::PageNotEnabled)
    }

    /// Records a raw CDP network lifecycle event against `page`'s counters.
    pub async fn ingest(&self, page: PageId, event: TapEvent) -> Result<(), TapError> {
        let state = self
            .states
            .get(&page)
            .ok_or(TapError::PageNotEnabled)?
            .clone();

        match event {
            TapEvent::RequestWillBeSent => {
                state.counters.req.fetch_add(1, Ordering::Relaxed);
                state.counters.inflight.fetch_add(1, Ordering::Relaxed);
            }
            TapEvent::ResponseReceived { status } => {
                if (200..300).contains(&status) {
                    state.counters.res2xx.fetch_add(1, Ordering::Relaxed);
                } else if (400..500).contains(&status) {
                    state.counters.res4xx.fetch_add(1, Ordering::Relaxed);
                } else if (500..600).contains(&status) {
                    state.counters.res5xx.fetch_add(1, Ordering::Relaxed);
                }
            }
            TapEvent::LoadingFinished | TapEvent::LoadingFailed => {
                let current = state.counters.inflight.load(Ordering::Relaxed);
                if current > 0 {
                    state.counters.inflight.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
        *state.last_activity.write().await = Instant::now();
        Ok(())
    }

    /// Explicit override used by callers that compute their own snapshot
    /// (kept for compatibility with pull-based integrations).
    pub async fn update_snapshot(&self, page: PageId, snapshot: NetworkSnapshot) -> Result<(), TapError> {
        let state = self
            .states
            .get(&page)
            .ok_or(TapError::PageNotEnabled)?
            .clone();
        *state.manual_snapshot.write().await = Some(snapshot);
        Ok(())
    }

    pub fn publish_summary(&self, summary: NetworkSummary) {
        let _ = self.bus.send(summary);
    }

    pub async fn current_snapshot(&self, page: PageId) -> Option<NetworkSnapshot> {
        let state = self.states.get(&page)?.clone();
        if let Some(manual) = state.manual_snapshot.read().await.clone() {
            return Some(manual);
        }

        let last_activity = *state.last_activity.read().await;
        let since_last_activity_ms = Instant::now().saturating_duration_since(last_activity).as_millis() as u64;
        let inflight = state.counters.inflight.load(Ordering::Relaxed);
        let quiet = inflight == 0 && since_last_activity_ms >= self.config.quiet_window_ms;

        Some(NetworkSnapshot {
            req: state.counters.req.load(Ordering::Relaxed),
            res2xx: state.counters.res2xx.load(Ordering::Relaxed),
            res4xx: state.counters.res4xx.load(Ordering::Relaxed),
            res5xx: state.counters.res5xx.load(Ordering::Relaxed),
            inflight,
            quiet,
            window_ms: self.config.window_ms,
            since_last_activity_ms,
        })
    }

    /// Spawns a background task that periodically re-publishes each enabled
    /// page's snapshot as a `NetworkSummary`. Returned handle must be
    /// `shutdown()` to stop it cleanly.
    pub fn spawn_maintenance(self: &Arc<Self>) -> MaintenanceHandle {
        let cancel = CancellationToken::new();
        let tap = Arc::clone(self);
        let child_token = cancel.clone();
        let interval = Duration::from_millis(self.config.min_publish_interval_ms.max(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = child_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let pages: Vec<PageId> = tap.states.iter().map(|e| *e.key()).collect();
                        for page in pages {
                            if let Some(snapshot) = tap.current_snapshot(page).await {
                                tap.publish_summary(NetworkSummary {
                                    page,
                                    window_ms: snapshot.window_ms,
                                    req: snapshot.req,
                                    res2xx: snapshot.res2xx,
                                    res4xx: snapshot.res4xx,
                                    res5xx: snapshot.res5xx,
                                    inflight: snapshot.inflight,
                                    quiet: snapshot.quiet,
                                    since_last_activity_ms: snapshot.since_last_activity_ms,
                                });
                            }
                        }
                    }
                }
            }
        });

        MaintenanceHandle { cancel, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn ingest_tracks_inflight_and_status_buckets() {
        let (tap, _rx) = NetworkTapLight::new(8);
        let page = PageId::new();
        tap.enable(page).await.unwrap();

        tap.ingest(page, TapEvent::RequestWillBeSent).await.unwrap();
        tap.ingest(page, TapEvent::ResponseReceived { status: 200 }).await.unwrap();
        tap.ingest(page, TapEvent::LoadingFinished).await.unwrap();

        let snapshot = tap.current_snapshot(page).await.unwrap();
        assert_eq!(snapshot.req, 1);
        assert_eq!(snapshot.res2xx, 1);
        assert_eq!(snapshot.inflight, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disable_without_enable_is_page_not_enabled() {
        let (tap, _rx) = NetworkTapLight::new(8);
        let page = PageId::new();
        assert!(matches!(tap.disable(page).await, Err(TapError::PageNotEnabled)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn quiet_becomes_true_after_idle_window_elapses() {
        let config = TapConfig {
            window_ms: 50,
            quiet_window_ms: 20,
            min_publish_interval_ms: 500,
        };
        let (tap, _rx) = NetworkTapLight::with_config(config, 8);
        let page = PageId::new();
        tap.enable(page).await.unwrap();
        tap.ingest(page, TapEvent::RequestWillBeSent).await.unwrap();
        tap.ingest(page, TapEvent::LoadingFinished).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        let snapshot = tap.current_snapshot(page).await.unwrap();
        assert!(snapshot.quiet);
    }
}
