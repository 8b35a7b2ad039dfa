//! Lightweight atomic-counter metrics, matching the ambient-stack logging
//! convention used across the kept crates (`network-tap-light`, `cdp-adapter`).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ObserverMetrics {
    captures_total: AtomicU64,
    captures_timed_out: AtomicU64,
    captures_failed: AtomicU64,
    pdf_detections: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ObserverMetricsSnapshot {
    pub captures_total: u64,
    pub captures_timed_out: u64,
    pub captures_failed: u64,
    pub pdf_detections: u64,
}

impl ObserverMetrics {
    pub fn record_capture(&self) {
        self.captures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.captures_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.captures_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pdf(&self) {
        self.pdf_detections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ObserverMetricsSnapshot {
        ObserverMetricsSnapshot {
            captures_total: self.captures_total.load(Ordering::Relaxed),
            captures_timed_out: self.captures_timed_out.load(Ordering::Relaxed),
            captures_failed: self.captures_failed.load(Ordering::Relaxed),
            pdf_detections: self.pdf_detections.load(Ordering::Relaxed),
        }
    }
}
