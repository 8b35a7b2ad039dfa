//! Download naming/dedup bookkeeping (spec §4.3 "Downloads").

use std::path::{Path, PathBuf};

use dashmap::DashSet;

#[derive(Default)]
pub struct DownloadTracker {
    saved_paths: DashSet<PathBuf>,
    saved_basenames: DashSet<String>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `(1)`, `(2)`, … to `name` until it no longer collides with an
    /// existing file in `dir` or an already-tracked download.
    pub fn unique_path(&self, dir: &Path, name: &str) -> PathBuf {
        let (stem, ext) = split_extension(name);
        let mut candidate = dir.join(name);
        let mut n = 1;
        while candidate.exists() || self.saved_paths.contains(&candidate) {
            let renamed = match &ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            };
            candidate = dir.join(renamed);
            n += 1;
        }
        candidate
    }

    pub fn record(&self, path: PathBuf) {
        self.saved_paths.insert(path);
    }

    /// PDF auto-download skip check: a file with this basename was already
    /// downloaded in this session.
    pub fn already_downloaded_basename(&self, basename: &str) -> bool {
        !self.saved_basenames.insert(basename.to_string())
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    #[test]
    fn unique_path_appends_counter_on_collision() {
        let tracker = DownloadTracker::new();
        let dir = temp_dir();
        let first = tracker.unique_path(&dir, "report.pdf");
        tracker.record(first.clone());
        let second = tracker.unique_path(&dir, "report.pdf");
        assert_ne!(first, second);
        assert!(second.to_string_lossy().contains("(1)"));
    }

    #[test]
    fn pdf_basename_dedup_is_first_come_first_served() {
        let tracker = DownloadTracker::new();
        assert!(!tracker.already_downloaded_basename("report.pdf"));
        assert!(tracker.already_downloaded_basename("report.pdf"));
    }
}
