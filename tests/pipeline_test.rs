use chrono::{Duration, Utc};
use tempfile::TempDir;

use macbroom::cleaner::{self, SystemTrash};
use macbroom::common::CancelToken;
use macbroom::history::{History, HistoryEntry, Method};
use macbroom::scanner::system::SystemScanner;
use macbroom::scanner::xcode::XcodeScanner;
use macbroom::scanner::{Engine, Scanner};
use macbroom::snapshot::{self, Snapshot, SnapshotError};

fn write(path: std::path::PathBuf, bytes: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, vec![0u8; bytes]).unwrap();
}

fn engine(home: &std::path::Path) -> Engine {
    let scanners: Vec<Box<dyn Scanner>> = vec![
        Box::new(SystemScanner::new(home)),
        Box::new(XcodeScanner::new(home)),
    ];
    Engine::new(scanners)
}

// ─── Scan → Snapshot → Diff ──────────────────────────────────────────────────

#[test]
fn test_second_scan_reports_growth() {
    let home = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let snap_path = data.path().join("last_scan.json");
    let lib = home.path().join("Library");
    write(lib.join("Caches/com.example.app/blob"), 1000);

    let first = engine(home.path()).scan(&CancelToken::new()).unwrap();
    assert!(matches!(snapshot::load(&snap_path), Err(SnapshotError::NotFound(_))));
    snapshot::save(&snap_path, &Snapshot::from_targets(&first.targets)).unwrap();

    write(lib.join("Caches/com.example.app/blob2"), 500);
    write(lib.join("Developer/Xcode/DerivedData/App-x/obj.o"), 2000);

    let second = engine(home.path()).scan(&CancelToken::new()).unwrap();
    let previous = snapshot::load(&snap_path).unwrap();
    let current = Snapshot::from_targets(&second.targets);
    let diff = snapshot::diff(&previous, &current);

    assert_eq!(diff.categories["System Junk"].size_delta, 500);
    assert_eq!(diff.categories["System Junk"].items_delta, 0);
    assert_eq!(diff.categories["Xcode"].size_delta, 2000);
    assert_eq!(diff.categories["Xcode"].items_delta, 1);
    assert_eq!(diff.total_size_delta, 2500);
}

#[test]
fn test_corrupt_snapshot_is_an_error_not_empty() {
    let data = TempDir::new().unwrap();
    let path = data.path().join("last_scan.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(snapshot::load(&path), Err(SnapshotError::Corrupt { .. })));
}

// ─── Clean → History ─────────────────────────────────────────────────────────

#[test]
fn test_clean_moves_to_trash_and_records_history() {
    let home = TempDir::new().unwrap();
    let trash_dir = TempDir::new().unwrap();
    let data = TempDir::new().unwrap();
    let lib = home.path().join("Library");
    write(lib.join("Caches/com.example.one/blob"), 100);
    write(lib.join("Caches/com.example.two/blob"), 50);

    let targets = engine(home.path())
        .scan(&CancelToken::new())
        .unwrap()
        .into_targets()
        .unwrap();
    assert_eq!(targets.len(), 2);

    // One target disappears between scan and clean
    std::fs::remove_dir_all(lib.join("Caches/com.example.two")).unwrap();

    let trash = SystemTrash::new(trash_dir.path());
    let report = cleaner::clean(&targets, Method::Trash, &trash, &CancelToken::new(), false);
    assert_eq!(report.removed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.bytes_freed, 100);
    assert!(trash_dir.path().join("com.example.one/blob").exists());
    assert!(!lib.join("Caches/com.example.one").exists());

    let history = History::new(data.path().join("nested/history.jsonl"));
    history.record_all(&report.history_entries(Utc::now())).unwrap();

    let stats = history.stats().unwrap();
    assert_eq!(stats.total_freed, 100);
    assert_eq!(stats.total_cleanups, 1);
    assert_eq!(stats.by_category["System Junk"].cleanups, 1);
}

#[test]
fn test_stats_over_six_cleanups() {
    let data = TempDir::new().unwrap();
    let history = History::new(data.path().join("history.jsonl"));
    let start = Utc::now();
    for i in 0..6u64 {
        history
            .record(&HistoryEntry {
                timestamp: start + Duration::minutes(i as i64),
                category: if i % 2 == 0 { "Docker" } else { "Xcode" }.to_string(),
                items: 1,
                bytes_freed: (i + 1) * 100,
                method: Method::Trash,
            })
            .unwrap();
    }

    let stats = history.stats().unwrap();
    assert_eq!(stats.total_freed, 2100);
    assert_eq!(stats.total_cleanups, 6);
    assert_eq!(stats.by_category["Docker"].cleanups, 3);
    assert_eq!(stats.recent.len(), 5);
    assert_eq!(stats.recent[0].bytes_freed, 600);
    assert_eq!(stats.recent[4].bytes_freed, 200);
}
