use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

use super::trash::{CleanError, Trash};
use crate::common::format;
use crate::common::{CancelToken, Cancelled};
use crate::history::{HistoryEntry, Method};
use crate::scanner::Target;

/// Items and bytes actually freed in one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryTally {
    pub items: u64,
    pub bytes: u64,
}

/// A target that could not be removed
#[derive(Debug)]
pub struct ItemFailure {
    pub path: String,
    pub category: String,
    pub error: CleanError,
}

/// Report from a clean operation
#[derive(Debug)]
pub struct CleanReport {
    pub method: Method,
    pub removed: usize,
    pub bytes_freed: u64,
    /// Successful removals only
    pub by_category: BTreeMap<String, CategoryTally>,
    pub failures: Vec<ItemFailure>,
    /// Set when the run stopped before visiting every target
    pub cancelled: Option<Cancelled>,
}

impl CleanReport {
    fn new(method: Method) -> Self {
        Self {
            method,
            removed: 0,
            bytes_freed: 0,
            by_category: BTreeMap::new(),
            failures: Vec::new(),
            cancelled: None,
        }
    }

    /// One ledger entry per category that freed something, all stamped
    /// with the same `timestamp`
    pub fn history_entries(&self, timestamp: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.by_category
            .iter()
            .map(|(category, tally)| HistoryEntry {
                timestamp,
                category: category.clone(),
                items: tally.items,
                bytes_freed: tally.bytes,
                method: self.method,
            })
            .collect()
    }
}

/// Remove every target with `trash`, one call per target.
///
/// A failed item is recorded and the batch continues. Only cancellation
/// stops early; whatever was already removed stays in the report.
pub fn clean(
    targets: &[Target],
    method: Method,
    trash: &dyn Trash,
    cancel: &CancelToken,
    show_progress: bool,
) -> CleanReport {
    let mut report = CleanReport::new(method);

    let pb = if show_progress {
        let pb = ProgressBar::new(targets.len() as u64);
        let template = match method {
            Method::Trash => "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} Moving to Trash... {msg}",
            Method::Permanent => "{spinner:.red} [{bar:40.red/blue}] {pos}/{len} Deleting... {msg}",
        };
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            pb.set_style(style.progress_chars("━━░"));
        }
        Some(pb)
    } else {
        None
    };

    for target in targets {
        if let Some(reason) = cancel.reason() {
            report.cancelled = Some(reason);
            break;
        }

        if let Some(ref pb) = pb {
            pb.set_message(format::truncate(&target.path, 40));
        }

        let result = match method {
            Method::Trash => trash.move_to_trash(&target.path),
            Method::Permanent => trash.permanent_delete(&target.path),
        };

        match result {
            Ok(()) => {
                report.removed += 1;
                report.bytes_freed += target.size;
                let tally = report.by_category.entry(target.category.clone()).or_default();
                tally.items += 1;
                tally.bytes += target.size;
            }
            Err(e) => {
                tracing::warn!("failed to remove {}: {}", target.path, e);
                report.failures.push(ItemFailure {
                    path: target.path.clone(),
                    category: target.category.clone(),
                    error: e,
                });
            }
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::RiskLevel;
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records calls and fails any path containing "locked"
    #[derive(Default)]
    struct RecordingTrash {
        trashed: RefCell<Vec<String>>,
        deleted: RefCell<Vec<String>>,
    }

    impl Trash for RecordingTrash {
        fn move_to_trash(&self, path: &str) -> Result<(), CleanError> {
            if path.contains("locked") {
                return Err(CleanError::Missing(PathBuf::from(path)));
            }
            self.trashed.borrow_mut().push(path.to_string());
            Ok(())
        }

        fn permanent_delete(&self, path: &str) -> Result<(), CleanError> {
            self.deleted.borrow_mut().push(path.to_string());
            Ok(())
        }
    }

    fn target(path: &str, category: &str, size: u64) -> Target {
        Target {
            path: path.into(),
            size,
            category: category.into(),
            description: String::new(),
            risk: RiskLevel::Safe,
            mod_time: None,
            is_dir: true,
        }
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let trash = RecordingTrash::default();
        let targets = vec![
            target("/c/one", "System Junk", 100),
            target("/c/locked", "System Junk", 50),
            target("/d/two", "Docker", 30),
        ];

        let report = clean(&targets, Method::Trash, &trash, &CancelToken::new(), false);

        assert_eq!(report.removed, 2);
        assert_eq!(report.bytes_freed, 130);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "/c/locked");
        assert_eq!(report.by_category["System Junk"], CategoryTally { items: 1, bytes: 100 });
        assert_eq!(*trash.trashed.borrow(), vec!["/c/one", "/d/two"]);
        assert!(trash.deleted.borrow().is_empty());
    }

    #[test]
    fn test_permanent_uses_permanent_delete() {
        let trash = RecordingTrash::default();
        let report = clean(
            &[target("/c/locked", "Xcode", 10)],
            Method::Permanent,
            &trash,
            &CancelToken::new(),
            false,
        );
        assert_eq!(report.removed, 1);
        assert_eq!(*trash.deleted.borrow(), vec!["/c/locked"]);
    }

    #[test]
    fn test_history_entries_share_timestamp() {
        let trash = RecordingTrash::default();
        let targets = vec![
            target("/a", "Xcode", 10),
            target("/b", "Docker", 20),
            target("/c", "Xcode", 5),
            target("/locked", "Homebrew", 99),
        ];
        let report = clean(&targets, Method::Trash, &trash, &CancelToken::new(), false);

        let now = Utc::now();
        let entries = report.history_entries(now);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.timestamp == now && e.method == Method::Trash));
        let xcode = entries.iter().find(|e| e.category == "Xcode").unwrap();
        assert_eq!((xcode.items, xcode.bytes_freed), (2, 15));
    }

    #[test]
    fn test_cancel_stops_before_next_item() {
        let trash = RecordingTrash::default();
        let token = CancelToken::new();
        token.cancel();
        let report = clean(&[target("/a", "Xcode", 10)], Method::Trash, &trash, &token, false);
        assert_eq!(report.removed, 0);
        assert_eq!(report.cancelled, Some(Cancelled::Requested));
        assert!(trash.trashed.borrow().is_empty());
    }

    #[test]
    fn test_expired_deadline_stops_clean() {
        let trash = RecordingTrash::default();
        let token = CancelToken::with_timeout(std::time::Duration::ZERO);
        let report = clean(&[target("/a", "Xcode", 10)], Method::Trash, &trash, &token, false);
        assert_eq!(report.removed, 0);
        assert_eq!(report.cancelled, Some(Cancelled::DeadlineExceeded));
        assert!(trash.trashed.borrow().is_empty());
    }
}
