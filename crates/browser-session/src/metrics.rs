use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct SessionMetrics {
    navigations_started: AtomicU64,
    navigations_completed: AtomicU64,
    navigations_blocked: AtomicU64,
    navigations_failed: AtomicU64,
    recoveries_attempted: AtomicU64,
    recoveries_succeeded: AtomicU64,
    captures_total: AtomicU64,
    downloads_total: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SessionMetricsSnapshot {
    pub navigations_started: u64,
    pub navigations_completed: u64,
    pub navigations_blocked: u64,
    pub navigations_failed: u64,
    pub recoveries_attempted: u64,
    pub recoveries_succeeded: u64,
    pub captures_total: u64,
    pub downloads_total: u64,
}

macro_rules! counter_methods {
    ($($field:ident),+ $(,)?) => {
        $(
            pub fn $field(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )+
    };
}

impl SessionMetrics {
    counter_methods!(
        navigations_started,
        navigations_completed,
        navigations_blocked,
        navigations_failed,
        recoveries_attempted,
        recoveries_succeeded,
        captures_total,
        downloads_total,
    );

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            navigations_started: self.navigations_started.load(Ordering::Relaxed),
            navigations_completed: self.navigations_completed.load(Ordering::Relaxed),
            navigations_blocked: self.navigations_blocked.load(Ordering::Relaxed),
            navigations_failed: self.navigations_failed.load(Ordering::Relaxed),
            recoveries_attempted: self.recoveries_attempted.load(Ordering::Relaxed),
            recoveries_succeeded: self.recoveries_succeeded.load(Ordering::Relaxed),
            captures_total: self.captures_total.load(Ordering::Relaxed),
            downloads_total: self.downloads_total.load(Ordering::Relaxed),
        }
    }
}
