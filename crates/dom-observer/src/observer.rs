use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{AxSnapshotConfig, Cdp, DomSnapshotConfig, PageId};
use tracing::warn;

use crate::errors::ObserverError;
use crate::metrics::ObserverMetrics;
use crate::model::{CaptureOptions, DomTree, ObserverOutput, TabInfo, ViewportMetrics};
use crate::parse::{detect_pdf_viewer, merge_ax_snapshot, parse_dom_snapshot};

/// Script injected via `evaluate_script` to read viewport/page/scroll
/// metrics in one round trip (spec §4.1 step 1: "inject a page-side script").
const VIEWPORT_SCRIPT: &str = r#"(() => {
  const de = document.documentElement;
  return JSON.stringify({
    viewport_width: window.innerWidth,
    viewport_height: window.innerHeight,
    page_width: de ? de.scrollWidth : window.innerWidth,
    page_height: de ? de.scrollHeight : window.innerHeight,
    scroll_x: window.scrollX || 0,
    scroll_y: window.scrollY || 0,
  });
})()"#;

/// Time budget for a single capture before degrading to a minimal tree
/// (spec §4.1: "45s capture budget").
const CAPTURE_BUDGET: Duration = Duration::from_secs(45);

#[async_trait]
pub trait DomObserver: Send + Sync {
    async fn capture(
        &self,
        page: PageId,
        url: &str,
        opts: CaptureOptions,
        known_tabs: &[TabInfo],
    ) -> Result<ObserverOutput, ObserverError>;
}

pub struct CdpDomObserver {
    cdp: Arc<dyn Cdp>,
    metrics: ObserverMetrics,
}

impl CdpDomObserver {
    pub fn new(cdp: Arc<dyn Cdp>) -> Self {
        Self {
            cdp,
            metrics: ObserverMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &ObserverMetrics {
        &self.metrics
    }

    async fn capture_inner(
        &self,
        page: PageId,
        url: &str,
        opts: &CaptureOptions,
    ) -> Result<(DomTree, ViewportMetrics, bool), ObserverError> {
        let snapshot = self
            .cdp
            .dom_snapshot(page, DomSnapshotConfig::default())
            .await?;
        let mut tree = parse_dom_snapshot(&snapshot)?;

        let ax = self
            .cdp
            .ax_snapshot(page, AxSnapshotConfig::default())
            .await?;
        merge_ax_snapshot(&mut tree, &ax);

        let viewport = match self.cdp.evaluate_script(page, VIEWPORT_SCRIPT).await {
            Ok(value) => value
                .as_str()
                .and_then(|s| serde_json::from_str::<ViewportMetrics>(s).ok())
                .unwrap_or_default(),
            Err(err) => {
                warn!(target: "dom_observer.capture", error = %err, "viewport script failed, defaulting metrics");
                ViewportMetrics::default()
            }
        };

        apply_viewport_expansion(&mut tree, &viewport, opts.viewport_expansion);

        let is_pdf = detect_pdf_viewer(&tree, url);
        Ok((tree, viewport, is_pdf))
    }
}

/// Marks nodes outside the viewport (expanded by `expansion_px` on every
/// side) as not visible, so `dom_serializer::interactive::is_visible`
/// excludes them downstream. A negative `expansion_px` disables this
/// filter entirely (spec §4.1 "profile toggles": `viewport_expansion`).
fn apply_viewport_expansion(tree: &mut DomTree, viewport: &ViewportMetrics, expansion_px: i32) {
    if expansion_px < 0 {
        return;
    }
    let expansion = expansion_px as f64;
    let min_x = viewport.scroll_x as f64 - expansion;
    let min_y = viewport.scroll_y as f64 - expansion;
    let max_x = (viewport.scroll_x + viewport.viewport_width) as f64 + expansion;
    let max_y = (viewport.scroll_y + viewport.viewport_height) as f64 + expansion;

    for node in &mut tree.nodes {
        let Some(bounds) = node.bounds else { continue };
        let out_of_range = bounds.x + bounds.width < min_x
            || bounds.x > max_x
            || bounds.y + bounds.height < min_y
            || bounds.y > max_y;
        if out_of_range {
            node.visible = false;
        }
    }
}

#[async_trait]
impl DomObserver for CdpDomObserver {
    async fn capture(
        &self,
        page: PageId,
        url: &str,
        opts: CaptureOptions,
        known_tabs: &[TabInfo],
    ) -> Result<ObserverOutput, ObserverError> {
        self.metrics.record_capture();
        let highlight_requested = opts.highlight_elements;

        match tokio::time::timeout(CAPTURE_BUDGET, self.capture_inner(page, url, &opts)).await {
            Ok(Ok((tree, viewport, is_pdf))) => {
                if is_pdf {
                    self.metrics.record_pdf();
                }
                Ok(ObserverOutput {
                    tree,
                    viewport,
                    tabs: known_tabs.to_vec(),
                    is_pdf_viewer: is_pdf,
                    browser_error: None,
                    highlight_requested,
                })
            }
            Ok(Err(err)) => {
                self.metrics.record_failure();
                warn!(target: "dom_observer.capture", error = %err, "capture failed, degrading to minimal tree");
                Ok(ObserverOutput {
                    tree: DomTree::minimal(),
                    viewport: ViewportMetrics::default(),
                    tabs: known_tabs.to_vec(),
                    is_pdf_viewer: false,
                    browser_error: Some(err.to_string()),
                    highlight_requested,
                })
            }
            Err(_) => {
                self.metrics.record_timeout();
                warn!(target: "dom_observer.capture", "capture timed out after budget, degrading to minimal tree");
                Ok(ObserverOutput {
                    tree: DomTree::minimal(),
                    viewport: ViewportMetrics::default(),
                    tabs: known_tabs.to_vec(),
                    is_pdf_viewer: false,
                    browser_error: Some("capture timed out".to_string()),
                    highlight_requested,
                })
            }
        }
    }
}
