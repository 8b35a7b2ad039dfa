use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cdp_adapter::{Cdp, CdpAdapter, PageId as CdpPageId, RawEvent, WaitGate};
use dashmap::DashMap;
use dom_observer::{CaptureOptions as ObserveOptions, DomObserver, TabInfo};
use dom_serializer::{SelectorEntry, SelectorMap, SerializeOptions};
use domain_policy::DomainPolicy;
use parking_lot::Mutex as SyncMutex;
use soulbrowser_event_bus::EventBus;
use tokio::sync::{broadcast, Notify};
use tracing::{info, warn};

use crate::claims::ClaimRegistry;
use crate::config::BrowserSessionConfig;
use crate::dialogs::{auto_accepts, format_closed_popup_message, DialogTracker};
use crate::downloads::DownloadTracker;
use crate::errors::SessionError;
use crate::events::{SessionEvent, SessionEventBus};
use crate::hashcache::HashCache;
use crate::metrics::SessionMetrics;
use crate::model::{
    BrowserStateSummary, CaptureRequestOptions, ClaimMode, LifecycleState, PageInfo,
    PendingNetworkRequest, RecentEvent, RingBuffer, Tab,
};

const CLOSED_POPUP_RING_CAP: usize = 20;
const RECENT_EVENT_RING_CAP: usize = 100;
const PLACEHOLDER_SCREENSHOT_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNk+A8AAQUBAScY42YAAAAASUVORK5CYII=";

struct TabState {
    page: CdpPageId,
    url: String,
    title: String,
    parent_page_id: Option<u64>,
}

/// The sole mutator of browser/context/page lifecycle (spec §4.3).
pub struct BrowserSession {
    cdp: Arc<CdpAdapter>,
    observer: Arc<dyn DomObserver>,
    policy: DomainPolicy,
    config: BrowserSessionConfig,
    metrics: SessionMetrics,
    claims: ClaimRegistry,
    hash_cache: HashCache,
    dialogs: DialogTracker,
    downloads: DownloadTracker,
    state: SyncMutex<LifecycleState>,
    shutdown_notify: Notify,
    keep_alive: AtomicBool,
    owns_browser: bool,
    tabs: DashMap<u64, TabState>,
    active_tab: SyncMutex<Option<u64>>,
    next_tab_id: AtomicU64,
    recent_events: SyncMutex<RingBuffer<RecentEvent>>,
    closed_popups: SyncMutex<RingBuffer<String>>,
    previous_backend_ids: DashMap<String, HashSet<u64>>,
    in_recovery: AtomicBool,
    events: Option<Arc<SessionEventBus>>,
    /// Run during `do_stop`'s first sub-step, in registration order (spec
    /// §4.3 shutdown order).
    cleanup_handlers: SyncMutex<Vec<Box<dyn Fn() + Send + Sync>>>,
    /// Set when `stop()` is deferred because a shared claim is still held;
    /// consumed by `release_agent` once the last holder releases.
    stop_requested: AtomicBool,
}

impl BrowserSession {
    pub fn new(
        cdp: Arc<CdpAdapter>,
        observer: Arc<dyn DomObserver>,
        policy: DomainPolicy,
        config: BrowserSessionConfig,
        owns_browser: bool,
    ) -> Self {
        let keep_alive = config.keep_alive;
        Self {
            cdp,
            observer,
            policy,
            config,
            metrics: SessionMetrics::default(),
            claims: ClaimRegistry::new(),
            hash_cache: HashCache::new(),
            dialogs: DialogTracker::new(),
            downloads: DownloadTracker::new(),
            state: SyncMutex::new(LifecycleState::Uninitialized),
            shutdown_notify: Notify::new(),
            keep_alive: AtomicBool::new(keep_alive),
            owns_browser,
            tabs: DashMap::new(),
            active_tab: SyncMutex::new(None),
            next_tab_id: AtomicU64::new(0),
            recent_events: SyncMutex::new(RingBuffer::new(RECENT_EVENT_RING_CAP)),
            closed_popups: SyncMutex::new(RingBuffer::new(CLOSED_POPUP_RING_CAP)),
            previous_backend_ids: DashMap::new(),
            in_recovery: AtomicBool::new(false),
            events: None,
            cleanup_handlers: SyncMutex::new(Vec::new()),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Registers a handler run (best-effort, in order) as the first step of
    /// shutdown, before tabs/context/browser are torn down.
    pub fn register_cleanup_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.cleanup_handlers.lock().push(Box::new(handler));
    }

    /// Attaches an event bus so navigation/dialog/error activity is also
    /// published for subscribers, in addition to the recent-event ring
    /// buffer every `capture()` already returns inline.
    pub fn with_event_bus(mut self, bus: Arc<SessionEventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    fn publish(&self, event: SessionEvent) {
        if let Some(bus) = self.events.clone() {
            tokio::spawn(async move {
                let _ = bus.publish(event).await;
            });
        }
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }

    pub fn hash_cache(&self) -> &HashCache {
        &self.hash_cache
    }

    fn record_event(&self, event_type: &str, url: Option<String>, error_message: Option<String>, page_id: Option<u64>) {
        self.recent_events.lock().push(RecentEvent {
            event_type: event_type.to_string(),
            timestamp_ms: 0,
            url,
            error_message,
            page_id,
        });
    }

    // ---- lifecycle -----------------------------------------------------

    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut guard = self.state.lock();
            if !matches!(*guard, LifecycleState::Uninitialized) {
                return Ok(());
            }
            *guard = LifecycleState::Started;
        }

        let page = self.cdp.create_page("about:blank").await?;
        let tab_id = self.next_tab_id.fetch_add(1, Ordering::Relaxed);
        self.tabs.insert(
            tab_id,
            TabState {
                page,
                url: "about:blank".to_string(),
                title: String::new(),
                parent_page_id: None,
            },
        );
        *self.active_tab.lock() = Some(tab_id);
        self.attach_dialog_handler(tab_id);

        if let Some(dir) = &self.config.downloads_path {
            if let Some(dir_str) = dir.to_str() {
                if let Err(err) = self.cdp.set_download_behavior(dir_str).await {
                    warn!(target: "browser_session.lifecycle", %err, "could not configure download behavior");
                }
            }
        }

        info!(target: "browser_session.lifecycle", tab_id, "session started");
        Ok(())
    }

    /// Deferred when a shared claim is held: shutdown happens once the last
    /// shared holder calls `release_agent` (spec §4.3 "stop() invoked by a
    /// shared agent is deferred until its claim is released; an exclusive
    /// owner triggers full shutdown").
    pub async fn stop(&self) -> Result<(), SessionError> {
        if self.keep_alive.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.claims.is_shared() {
            self.stop_requested.store(true, Ordering::SeqCst);
            info!(target: "browser_session.lifecycle", "stop deferred: shared claim still held");
            return Ok(());
        }
        self.do_stop().await
    }

    /// Bypasses claim deferral and `keep_alive`: always shuts down now.
    pub async fn kill(&self) -> Result<(), SessionError> {
        let was_keep_alive = self.keep_alive.swap(false, Ordering::SeqCst);
        let result = self.do_stop().await;
        self.keep_alive.store(was_keep_alive, Ordering::SeqCst);
        result
    }

    /// Shutdown order (spec §4.3): cleanup handlers, close context, close
    /// browser. Each sub-step gets its own ~3s timeout so a stuck handler or
    /// unresponsive CDP connection can't hang shutdown indefinitely. This
    /// driver launches at most one child process (the browser itself, owned
    /// by `cdp-adapter`'s transport); killing it and terminating the browser
    /// process are therefore one and the same step, folded into
    /// `cdp.shutdown()` below rather than tracked separately.
    async fn do_stop(&self) -> Result<(), SessionError> {
        const SUBSTEP_TIMEOUT: Duration = Duration::from_secs(3);

        loop {
            let mut guard = self.state.lock();
            match *guard {
                LifecycleState::Uninitialized => return Ok(()),
                LifecycleState::Stopping => {
                    drop(guard);
                    self.shutdown_notify.notified().await;
                    continue;
                }
                LifecycleState::Started => {
                    *guard = LifecycleState::Stopping;
                    break;
                }
            }
        }

        let handlers = std::mem::take(&mut *self.cleanup_handlers.lock());
        if tokio::time::timeout(SUBSTEP_TIMEOUT, async {
            for handler in handlers {
                handler();
            }
        })
        .await
        .is_err()
        {
            warn!(target: "browser_session.lifecycle", "cleanup handlers did not finish within timeout");
        }

        let close_context = async {
            let tab_ids: Vec<u64> = self.tabs.iter().map(|e| *e.key()).collect();
            for id in tab_ids {
                self.tabs.remove(&id);
                self.dialogs.detach(id);
            }
        };
        if tokio::time::timeout(SUBSTEP_TIMEOUT, close_context).await.is_err() {
            warn!(target: "browser_session.lifecycle", "closing context did not finish within timeout");
        }
        *self.active_tab.lock() = None;

        if self.owns_browser
            && tokio::time::timeout(SUBSTEP_TIMEOUT, self.cdp.shutdown())
                .await
                .is_err()
        {
            warn!(target: "browser_session.lifecycle", "browser shutdown did not finish within timeout");
        }

        *self.state.lock() = LifecycleState::Uninitialized;
        self.shutdown_notify.notify_waiters();
        info!(target: "browser_session.lifecycle", "session stopped");
        Ok(())
    }

    // ---- claims ---------------------------------------------------------

    pub fn claim(&self, agent_id: &str, mode: ClaimMode) -> bool {
        self.claims.claim(agent_id, mode)
    }

    /// Completes a shutdown deferred by `stop()` once the last claim holder
    /// releases.
    pub async fn release_agent(&self, agent_id: &str) -> Result<(), SessionError> {
        self.claims.release(agent_id);
        if self.claims.is_claimed() {
            return Ok(());
        }
        if self.stop_requested.swap(false, Ordering::SeqCst) {
            return self.do_stop().await;
        }
        Ok(())
    }

    /// Cheap local read of the active tab's last-known URL, without a full
    /// capture — used by `action-controller`'s multi-action URL-change guard.
    pub fn active_url(&self) -> Result<String, SessionError> {
        self.active_page().map(|(_, _, url)| url)
    }

    // ---- tabs -------------------------------------------------------------

    fn active_page(&self) -> Result<(u64, CdpPageId, String), SessionError> {
        let active = (*self.active_tab.lock()).ok_or(SessionError::UnknownTab(0))?;
        let tab = self.tabs.get(&active).ok_or(SessionError::UnknownTab(active))?;
        Ok((active, tab.page, tab.url.clone()))
    }

    pub async fn create_new_tab(&self, url: &str) -> Result<u64, SessionError> {
        self.policy.evaluate(url).map_err(SessionError::UrlNotAllowed)?;
        let page = self.cdp.create_page(url).await?;
        let tab_id = self.next_tab_id.fetch_add(1, Ordering::Relaxed);
        self.tabs.insert(
            tab_id,
            TabState {
                page,
                url: url.to_string(),
                title: String::new(),
                parent_page_id: *self.active_tab.lock(),
            },
        );
        *self.active_tab.lock() = Some(tab_id);
        self.attach_dialog_handler(tab_id);
        Ok(tab_id)
    }

    pub fn switch_to_tab(&self, identifier: i64) -> Result<(), SessionError> {
        if identifier == -1 {
            let last = self.tabs.iter().map(|e| *e.key()).max();
            let Some(last) = last else { return Err(SessionError::UnknownTab(0)) };
            *self.active_tab.lock() = Some(last);
            return Ok(());
        }
        let id = identifier as u64;
        if !self.tabs.contains_key(&id) {
            return Err(SessionError::UnknownTab(id));
        }
        *self.active_tab.lock() = Some(id);
        Ok(())
    }

    pub async fn close_tab(&self, identifier: u64) -> Result<(), SessionError> {
        let tab = self
            .tabs
            .remove(&identifier)
            .ok_or(SessionError::UnknownTab(identifier))?
            .1;
        self.dialogs.detach(identifier);
        let _ = self.cdp.evaluate_script(tab.page, "window.close()").await;

        let mut active = self.active_tab.lock();
        if *active == Some(identifier) {
            *active = self.tabs.iter().map(|e| *e.key()).max();
        }
        Ok(())
    }

    fn attach_dialog_handler(&self, tab_id: u64) {
        if self.dialogs.attach_if_absent(tab_id) {
            info!(target: "browser_session.dialog", tab_id, "dialog handler attached");
        }
    }

    /// Called by the transport-level dialog event plumbing (not wired to a
    /// concrete CDP event in this driver snapshot) to record a dialog and
    /// decide whether it auto-accepts.
    pub fn on_dialog(&self, tab_id: u64, dialog_kind: &str, text: &str) -> bool {
        let message = format_closed_popup_message(dialog_kind, text);
        self.closed_popups.lock().push(message.clone());
        self.record_event("javascript_dialog_closed", None, None, Some(tab_id));
        self.publish(SessionEvent::DialogClosed { page_id: tab_id, message });
        auto_accepts(dialog_kind)
    }

    // ---- navigation ---------------------------------------------------

    pub async fn navigate_to(&self, url: &str) -> Result<(), SessionError> {
        self.policy.evaluate(url).map_err(|reason| {
            self.metrics.navigations_blocked();
            self.record_event("navigation_blocked", Some(url.to_string()), None, None);
            self.publish(SessionEvent::NavigationBlocked { url: url.to_string() });
            SessionError::UrlNotAllowed(reason)
        })?;

        let (tab_id, page, _) = self.active_page()?;
        self.metrics.navigations_started();
        self.record_event("navigation_started", Some(url.to_string()), None, Some(tab_id));
        self.publish(SessionEvent::NavigationStarted { url: url.to_string() });

        let deadline = Duration::from_millis(self.config.max_wait_page_load_ms);
        if let Err(err) = self.cdp.navigate(page, url, deadline).await {
            self.metrics.navigations_failed();
            self.record_event("navigation_failed", Some(url.to_string()), Some(err.to_string()), Some(tab_id));
            self.publish(SessionEvent::NavigationFailed { url: url.to_string(), error: err.to_string() });
            return Err(SessionError::Driver(err));
        }

        let _ = self.cdp.wait_basic(page, "domready".to_string(), deadline).await;
        self.wait_for_stable_network(page).await;

        if let Ok(final_url) = self.current_url(page).await {
            if let Err(reason) = self.policy.evaluate(&final_url) {
                self.metrics.navigations_blocked();
                self.record_event("navigation_blocked", Some(final_url.clone()), None, Some(tab_id));
                self.publish(SessionEvent::NavigationBlocked { url: final_url });
                return Err(SessionError::UrlNotAllowed(reason));
            }
            if let Some(mut tab) = self.tabs.get_mut(&tab_id) {
                tab.url = final_url;
            }
        }

        self.metrics.navigations_completed();
        self.record_event("navigation_completed", Some(url.to_string()), None, Some(tab_id));
        self.publish(SessionEvent::NavigationCompleted { url: url.to_string() });
        Ok(())
    }

    async fn current_url(&self, page: CdpPageId) -> Result<String, SessionError> {
        let value = self.cdp.evaluate_script(page, "location.href").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn wait_for_stable_network(&self, page: CdpPageId) {
        let gate = WaitGate::NetworkQuiet {
            window_ms: self.config.wait_for_network_idle_ms,
            max_inflight: 0,
        };
        let gate_json = serde_json::to_string(&gate).unwrap_or_default();
        let timeout = Duration::from_millis(self.config.max_wait_page_load_ms);
        if let Err(err) = self.cdp.wait_basic(page, gate_json, timeout).await {
            warn!(target: "browser_session.stable_network", error = %err, "network did not settle within budget");
        }
    }

    pub async fn go_back(&self) -> Result<(), SessionError> {
        self.navigate_history("history.back()").await
    }

    pub async fn go_forward(&self) -> Result<(), SessionError> {
        self.navigate_history("history.forward()").await
    }

    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.navigate_history("location.reload()").await
    }

    async fn navigate_history(&self, script: &str) -> Result<(), SessionError> {
        let (_, page, _) = self.active_page()?;
        if let Err(err) = self.cdp.evaluate_script(page, script).await {
            warn!(target: "browser_session.history_nav", error = %err, "transient history navigation error swallowed");
        }
        self.wait_for_stable_network(page).await;
        Ok(())
    }

    // ---- action primitives --------------------------------------------

    /// Clicks, then races a 5s window for a `Browser.downloadWillBegin` +
    /// matching `Browser.downloadProgress{state:"completed"}` pair so a click
    /// that triggers a download gets tracked under `downloads_path` instead
    /// of silently vanishing into the browser's default download dir (spec
    /// §4.3 "Downloads").
    pub async fn click(&self, element: &SelectorEntry) -> Result<(), SessionError> {
        let (_, page, _) = self.active_page()?;
        let download_rx = self
            .config
            .downloads_path
            .as_ref()
            .map(|_| self.cdp.subscribe(cdp_adapter::EventFilter));

        let script = xpath_interact_script(&element.xpath, "el.click();");
        let matched = self.cdp.evaluate_script(page, &script).await?;
        if !matched.as_bool().unwrap_or(false) {
            return Err(SessionError::ElementNotFound);
        }

        if let (Some(rx), Some(dir)) = (download_rx, self.config.downloads_path.clone()) {
            self.track_download(rx, dir).await;
        }

        self.wait_for_stable_network(page).await;
        Ok(())
    }

    /// Waits up to 5s for a download started by the action just performed,
    /// renaming the browser's temp file to a collision-free name under `dir`.
    async fn track_download(&self, mut rx: broadcast::Receiver<RawEvent>, dir: PathBuf) {
        let deadline = tokio::time::sleep(Duration::from_secs(5));
        tokio::pin!(deadline);
        let mut pending: Option<(String, String)> = None;
        loop {
            tokio::select! {
                _ = &mut deadline => return,
                event = rx.recv() => {
                    match event {
                        Ok(RawEvent::DownloadStarted { guid, suggested_filename, .. }) => {
                            pending = Some((guid, suggested_filename));
                        }
                        Ok(RawEvent::DownloadCompleted { guid, .. }) => {
                            if let Some((pending_guid, filename)) = &pending {
                                if *pending_guid == guid {
                                    self.finish_download(&dir, &guid, filename).await;
                                    return;
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => return,
                    }
                }
            }
        }
    }

    async fn finish_download(&self, dir: &std::path::Path, guid: &str, suggested_filename: &str) {
        let src = dir.join(guid);
        let dest = self.downloads.unique_path(dir, suggested_filename);
        if tokio::fs::rename(&src, &dest).await.is_ok() {
            self.downloads.record(dest);
            self.metrics.downloads_total();
            info!(target: "browser_session.downloads", guid, "download tracked");
        } else {
            warn!(target: "browser_session.downloads", guid, "could not rename completed download");
        }
    }

    pub async fn type_text(&self, element: &SelectorEntry, text: &str) -> Result<(), SessionError> {
        self.click(element).await?;
        let (_, page, _) = self.active_page()?;
        let text_json = serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string());
        let script = xpath_interact_script(
            &element.xpath,
            &format!(
                "el.value = {text_json}; el.dispatchEvent(new Event('input', {{bubbles:true}}));"
            ),
        );
        let matched = self.cdp.evaluate_script(page, &script).await?;
        if !matched.as_bool().unwrap_or(false) {
            return Err(SessionError::ElementNotFound);
        }
        Ok(())
    }

    /// Synthesizes a CDP scroll gesture first; if that fails (not every
    /// target supports it), falls back to a JS smart-scroll that scrolls the
    /// nearest scrollable ancestor of the focused element instead of always
    /// scrolling `window` (spec §4.3).
    pub async fn scroll(&self, pixels: i64) -> Result<(), SessionError> {
        let (_, page, _) = self.active_page()?;
        if self
            .cdp
            .synthesize_scroll_gesture(page, -(pixels as f64))
            .await
            .is_ok()
        {
            return Ok(());
        }
        let _ = self
            .cdp
            .evaluate_script(page, &smart_scroll_script(pixels))
            .await?;
        Ok(())
    }

    pub async fn screenshot(&self, full: bool) -> Result<String, SessionError> {
        let (_, page, url) = self.active_page()?;
        if url == "about:blank" || url == "about:newtab" {
            return Ok(PLACEHOLDER_SCREENSHOT_PNG_BASE64.to_string());
        }
        let bytes = self.cdp.screenshot(page, full, Duration::from_secs(10)).await?;
        Ok(base64_encode(&bytes))
    }

    const HIGHLIGHT_OVERLAY_ID: &'static str = "__browser_session_highlight_overlay__";

    /// Draws a labeled box over each selector-map entry's on-page bounds, so
    /// a screenshot taken right after shows the same indices the rendered
    /// DOM string uses (spec §4.1 "highlight_elements").
    async fn draw_highlight_overlay(&self, page: CdpPageId, selector_map: &SelectorMap) -> Result<(), SessionError> {
        let boxes: Vec<_> = selector_map
            .entries
            .iter()
            .filter_map(|(index, entry)| entry.bounds.map(|b| (*index, b)))
            .map(|(index, b)| {
                format!(
                    "{{index:{index},x:{},y:{},width:{},height:{}}}",
                    b.x, b.y, b.width, b.height
                )
            })
            .collect();
        if boxes.is_empty() {
            return Ok(());
        }
        let boxes_json = format!("[{}]", boxes.join(","));
        let script = format!(
            "(() => {{ \
                const prev = document.getElementById('{id}'); \
                if (prev) prev.remove(); \
                const root = document.createElement('div'); \
                root.id = '{id}'; \
                root.style.cssText = 'position:absolute;top:0;left:0;pointer-events:none;z-index:2147483647;'; \
                for (const b of {boxes_json}) {{ \
                    const box = document.createElement('div'); \
                    box.style.cssText = `position:absolute;left:${{b.x}}px;top:${{b.y}}px;width:${{b.width}}px;height:${{b.height}}px;border:2px solid #f00;box-sizing:border-box;`; \
                    const label = document.createElement('span'); \
                    label.textContent = b.index; \
                    label.style.cssText = 'position:absolute;top:-1px;left:-1px;background:#f00;color:#fff;font:10px monospace;padding:0 2px;'; \
                    box.appendChild(label); \
                    root.appendChild(box); \
                }} \
                document.body.appendChild(root); \
                return true; \
            }})()",
            id = Self::HIGHLIGHT_OVERLAY_ID,
            boxes_json = boxes_json,
        );
        self.cdp.evaluate_script(page, &script).await?;
        Ok(())
    }

    async fn clear_highlight_overlay(&self, page: CdpPageId) -> Result<(), SessionError> {
        let script = format!(
            "(() => {{ const el = document.getElementById('{id}'); if (el) el.remove(); return true; }})()",
            id = Self::HIGHLIGHT_OVERLAY_ID,
        );
        self.cdp.evaluate_script(page, &script).await?;
        Ok(())
    }

    /// Saves the page's own PDF bytes via an in-page `fetch` (the PDF viewer
    /// never fires a real browser download), keyed on basename so repeat
    /// captures of the same PDF don't re-save it (spec §4.3 "PDF
    /// auto-download").
    async fn auto_download_pdf(&self, page: CdpPageId, url: &str, dir: &std::path::Path) {
        let basename = pdf_basename_from_url(url);
        if self.downloads.already_downloaded_basename(&basename) {
            return;
        }
        let script = format!(
            "(async () => {{ \
                const resp = await fetch({url_json}, {{ cache: 'force-cache' }}); \
                const buf = await resp.arrayBuffer(); \
                let binary = ''; \
                const bytes = new Uint8Array(buf); \
                for (let i = 0; i < bytes.length; i++) binary += String.fromCharCode(bytes[i]); \
                return btoa(binary); \
            }})()",
            url_json = serde_json::to_string(url).unwrap_or_else(|_| "\"\"".to_string()),
        );
        let Ok(value) = self.cdp.evaluate_script(page, &script).await else {
            return;
        };
        let Some(encoded) = value.as_str() else { return };
        let Ok(bytes) = base64_decode(encoded) else { return };

        let dest = self.downloads.unique_path(dir, &basename);
        if tokio::fs::create_dir_all(dir).await.is_ok() && tokio::fs::write(&dest, &bytes).await.is_ok() {
            self.downloads.record(dest);
            self.metrics.downloads_total();
        } else {
            warn!(target: "browser_session.downloads", url, "could not save auto-downloaded pdf");
        }
    }

    // ---- capture --------------------------------------------------------

    pub async fn capture(&self, opts: CaptureRequestOptions) -> Result<BrowserStateSummary, SessionError> {
        self.metrics.captures_total();
        let (_, page, url) = self.active_page()?;

        let known_tabs: Vec<TabInfo> = self
            .tabs
            .iter()
            .map(|e| TabInfo {
                page_id: e.key().to_string(),
                url: e.value().url.clone(),
                title: e.value().title.clone(),
                parent_page_id: e.value().parent_page_id.map(|p| p.to_string()),
            })
            .collect();

        let observer_opts = ObserveOptions {
            highlight_elements: opts.highlight_elements || self.config.highlight_elements,
            viewport_expansion: opts.viewport_expansion,
        };
        let output = self
            .observer
            .capture(page, &url, observer_opts, &known_tabs)
            .await
            .map_err(|err| SessionError::BrowserError(err.to_string()))?;

        let previous_ids = if opts.cache_hashes {
            self.previous_backend_ids.get(&url).map(|v| v.clone())
        } else {
            None
        };
        let serialized = dom_serializer::serialize(&output.tree, previous_ids.as_ref(), &SerializeOptions::default());

        let fresh_ids: HashSet<u64> = output
            .tree
            .nodes
            .iter()
            .filter_map(|n| n.backend_node_id)
            .collect();
        self.previous_backend_ids.insert(url.clone(), fresh_ids);
        self.hash_cache.swap(&url, &output.tree.nodes);

        let screenshot = if opts.include_screenshot {
            if output.highlight_requested {
                let _ = self.draw_highlight_overlay(page, &serialized.selector_map).await;
                let shot = self.screenshot(false).await.ok();
                let _ = self.clear_highlight_overlay(page).await;
                shot
            } else {
                self.screenshot(false).await.ok()
            }
        } else {
            None
        };

        if output.is_pdf_viewer && self.config.auto_download_pdfs {
            if let Some(dir) = self.config.downloads_path.clone() {
                self.auto_download_pdf(page, &url, &dir).await;
            }
        }

        let pending_network_requests = self.collect_pending_network_requests(page).await;

        let tabs: Vec<Tab> = self
            .tabs
            .iter()
            .map(|e| Tab {
                page_id: *e.key(),
                url: e.value().url.clone(),
                title: e.value().title.clone(),
                parent_page_id: e.value().parent_page_id,
            })
            .collect();

        let page_info = PageInfo {
            viewport_width: output.viewport.viewport_width,
            viewport_height: output.viewport.viewport_height,
            page_width: output.viewport.page_width,
            page_height: output.viewport.page_height,
            scroll_x: output.viewport.scroll_x,
            scroll_y: output.viewport.scroll_y,
        };
        let pixels_above = page_info.scroll_y.max(0);
        let pixels_below = (page_info.page_height - page_info.viewport_height - page_info.scroll_y).max(0);
        let pixels_left = page_info.scroll_x.max(0);
        let pixels_right = (page_info.page_width - page_info.viewport_width - page_info.scroll_x).max(0);

        Ok(BrowserStateSummary {
            url,
            title: String::new(),
            tabs,
            selector_map: serialized.selector_map,
            dom_string: Some(serialized.rendered),
            screenshot,
            page_info,
            pixels_above,
            pixels_below,
            pixels_left,
            pixels_right,
            is_pdf_viewer: output.is_pdf_viewer,
            loading_status: output.browser_error.clone(),
            browser_errors: output.browser_error.into_iter().collect(),
            pending_network_requests,
            closed_popup_messages: self.closed_popups.lock().to_vec(),
            recent_events: Some(self.recent_events.lock().to_vec()),
        })
    }

    async fn collect_pending_network_requests(&self, page: CdpPageId) -> Vec<PendingNetworkRequest> {
        let script = PENDING_REQUESTS_SCRIPT;
        let Ok(value) = self.cdp.evaluate_script(page, script).await else {
            return Vec::new();
        };
        let Some(text) = value.as_str() else { return Vec::new() };
        let Ok(parsed) = serde_json::from_str::<Vec<RawPendingRequest>>(text) else {
            return Vec::new();
        };
        parsed
            .into_iter()
            .take(20)
            .map(|r| PendingNetworkRequest {
                url: r.url,
                method: r.method,
                loading_duration_ms: r.loading_duration_ms,
                resource_type: r.resource_type,
            })
            .collect()
    }

    // ---- page-health recovery -------------------------------------------

    /// Reentrant-guarded 3-step recovery (spec §4.3 "Page-health recovery").
    pub async fn recover_if_unresponsive(&self) -> Result<(), SessionError> {
        if self.in_recovery.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.run_recovery().await;
        self.in_recovery.store(false, Ordering::SeqCst);
        result
    }

    /// Opens a throwaway page (to guarantee a live, independent CDP
    /// session), then issues `Target.closeTarget` against the stuck page's
    /// target rather than trying to script the stuck page itself.
    async fn force_close_unresponsive_target(&self, stuck_page: CdpPageId) {
        let temp_page = match self.cdp.create_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                warn!(target: "browser_session.recovery", error = %err, "could not open temp page to force-close stuck target");
                return;
            }
        };
        if let Err(err) = self.cdp.close_target_by_page(stuck_page).await {
            warn!(target: "browser_session.recovery", error = %err, "Target.closeTarget failed for stuck page");
        }
        let _ = self.cdp.close_target_by_page(temp_page).await;
    }

    async fn run_recovery(&self) -> Result<(), SessionError> {
        let (tab_id, page, url) = self.active_page()?;
        let probe_timeout = Duration::from_millis(self.config.page_probe_timeout_ms);

        let responsive = tokio::time::timeout(probe_timeout, self.cdp.evaluate_script(page, "1"))
            .await
            .is_ok();
        if responsive {
            return Ok(());
        }

        self.metrics.recoveries_attempted();
        warn!(target: "browser_session.recovery", tab_id, "page unresponsive, starting recovery");

        // Step 1: force-close the stuck target via a CDP session opened from
        // a fresh temporary page, since the stuck page's own session is what
        // just failed to respond.
        let close_timeout = Duration::from_secs(3);
        let _ = tokio::time::timeout(close_timeout, self.force_close_unresponsive_target(page)).await;

        // Step 2: open a fresh page and try the original URL.
        match self.cdp.create_page(&url).await {
            Ok(new_page) => {
                if let Some(mut tab) = self.tabs.get_mut(&tab_id) {
                    tab.page = new_page;
                }
                let reload_ok = tokio::time::timeout(probe_timeout, self.cdp.evaluate_script(new_page, "1"))
                    .await
                    .is_ok();
                if reload_ok {
                    self.metrics.recoveries_succeeded();
                    return Ok(());
                }
            }
            Err(err) => {
                warn!(target: "browser_session.recovery", error = %err, "failed to open replacement page");
            }
        }

        // Step 3: fall back to a blank page.
        match self.cdp.create_page("about:blank").await {
            Ok(blank_page) => {
                if let Some(mut tab) = self.tabs.get_mut(&tab_id) {
                    tab.page = blank_page;
                    tab.url = "about:blank".to_string();
                }
                self.record_event("browser_error", Some(url), Some("recovered to blank page".to_string()), Some(tab_id));
                self.publish(SessionEvent::BrowserError {
                    page_id: tab_id,
                    message: "recovered to blank page".to_string(),
                });
                Ok(())
            }
            Err(_) => Err(SessionError::BrowserError(
                "page-health recovery exhausted all fallbacks".to_string(),
            )),
        }
    }
}

#[derive(serde::Deserialize)]
struct RawPendingRequest {
    url: String,
    method: String,
    loading_duration_ms: u64,
    resource_type: String,
}

const PENDING_REQUESTS_SCRIPT: &str = r#"(() => {
  const now = performance.now();
  const ignored = ['video', 'audio', 'streaming'];
  const blocked = ['google-analytics', 'doubleclick', 'segment.io', 'mixpanel'];
  const entries = performance.getEntriesByType('resource')
    .filter(e => e.responseEnd === 0)
    .filter(e => !blocked.some(b => e.name.includes(b)))
    .filter(e => (now - e.startTime) < 10000)
    .filter(e => !(['img', 'css'].includes(e.initiatorType) && (now - e.startTime) > 3000))
    .filter(e => !ignored.includes(e.initiatorType))
    .slice(0, 20)
    .map(e => ({
      url: e.name,
      method: 'GET',
      loading_duration_ms: Math.round(now - e.startTime),
      resource_type: e.initiatorType || 'other',
    }));
  return JSON.stringify(entries);
})()"#;

fn xpath_interact_script(xpath: &str, action: &str) -> String {
    let xpath_json = serde_json::to_string(xpath).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "(() => {{ const r = document.evaluate({xpath_json}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null); const el = r.singleNodeValue; if (!el) return false; {action} return true; }})()"
    )
}

fn smart_scroll_script(pixels: i64) -> String {
    format!(
        "(() => {{ \
            function isScrollable(el) {{ \
                if (!el || el === document.body || el === document.documentElement) return false; \
                const style = window.getComputedStyle(el); \
                return (style.overflowY === 'auto' || style.overflowY === 'scroll') && el.scrollHeight > el.clientHeight; \
            }} \
            let el = document.activeElement; \
            while (el && !isScrollable(el)) {{ el = el.parentElement; }} \
            if (el) {{ el.scrollBy(0, {pixels}); }} else {{ window.scrollBy(0, {pixels}); }} \
            return true; \
        }})()"
    )
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.encode(bytes)
}

fn base64_decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.decode(encoded)
}

/// Basename for an auto-downloaded PDF: the URL's last path segment, or
/// `document.pdf` if the URL has none, always with a `.pdf` extension.
fn pdf_basename_from_url(url: &str) -> String {
    let last_segment = url
        .split('/')
        .next_back()
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    let name = last_segment.split(['?', '#']).next().unwrap_or(last_segment);
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}
