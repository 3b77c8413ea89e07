//! Append-only ledger of completed cleanups.
//!
//! Stored as JSON Lines: one [`HistoryEntry`] per line, appended and never
//! rewritten. A line that does not parse fails the whole load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::config::Config;

/// How many entries [`Stats::recent`] holds
pub const RECENT_LIMIT: usize = 5;

/// One ledger line, newline included
fn encode_line(entry: &HistoryEntry) -> Result<String, HistoryError> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');
    Ok(line)
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history '{}' is corrupt at line {line}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("history I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode history entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// How the bytes were freed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Trash,
    Permanent,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Trash => write!(f, "trash"),
            Method::Permanent => write!(f, "permanent"),
        }
    }
}

/// One category cleaned in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub items: u64,
    pub bytes_freed: u64,
    pub method: Method,
}

/// Totals for one category across the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryStats {
    pub cleanups: u64,
    pub bytes_freed: u64,
}

/// Aggregates derived from the whole ledger
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Stats {
    pub total_freed: u64,
    pub total_cleanups: u64,
    pub by_category: BTreeMap<String, CategoryStats>,
    /// Last [`RECENT_LIMIT`] entries, most recent first
    pub recent: Vec<HistoryEntry>,
}

impl Stats {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        let mut stats = Stats::default();
        for e in entries {
            stats.total_freed += e.bytes_freed;
            stats.total_cleanups += 1;
            let cat = stats.by_category.entry(e.category.clone()).or_default();
            cat.cleanups += 1;
            cat.bytes_freed += e.bytes_freed;
        }
        stats.recent = entries.iter().rev().take(RECENT_LIMIT).cloned().collect();
        stats
    }
}

/// Ledger stored at one path
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Config::history_path())
    }
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source: e,
        }
    }

    /// Append one entry, creating parent directories as needed
    pub fn record(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }

        let line = encode_line(entry)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        // One write per entry so a crash cannot interleave half lines
        file.write_all(line.as_bytes()).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// Append several entries in order
    pub fn record_all(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        for e in entries {
            self.record(e)?;
        }
        Ok(())
    }

    /// Every entry in append order. A missing ledger is empty.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        let mut entries = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(line).map_err(|e| HistoryError::Corrupt {
                path: self.path.clone(),
                line: i + 1,
                source: e,
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn stats(&self) -> Result<Stats, HistoryError> {
        Ok(Stats::from_entries(&self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(day: u32, category: &str, bytes: u64, method: Method) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 2, day, 10, 0, 0).unwrap(),
            category: category.into(),
            items: 1,
            bytes_freed: bytes,
            method,
        }
    }

    #[test]
    fn test_record_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let history = History::new(tmp.path().join("a/b/history.jsonl"));
        history.record(&entry(14, "System Junk", 100, Method::Trash)).unwrap();

        let loaded = history.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].category, "System Junk");
        assert_eq!(loaded[0].method, Method::Trash);
    }

    #[test]
    fn test_load_preserves_append_order() {
        let tmp = TempDir::new().unwrap();
        let history = History::new(tmp.path().join("history.jsonl"));
        for e in [
            entry(13, "Browser Cache", 1, Method::Trash),
            entry(14, "System Junk", 2, Method::Permanent),
            entry(12, "System Junk", 3, Method::Trash),
        ] {
            history.record(&e).unwrap();
        }

        let loaded = history.load().unwrap();
        let bytes: Vec<u64> = loaded.iter().map(|e| e.bytes_freed).collect();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let tmp = TempDir::new().unwrap();
        let history = History::new(tmp.path().join("history.jsonl"));
        assert!(history.load().unwrap().is_empty());
        assert_eq!(history.stats().unwrap(), Stats::default());
    }

    #[test]
    fn test_corrupt_line_fails_load() {
        let tmp = TempDir::new().unwrap();
        let history = History::new(tmp.path().join("history.jsonl"));
        history.record(&entry(14, "System Junk", 100, Method::Trash)).unwrap();
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(history.path())
            .unwrap();
        writeln!(f, "{{ garbage").unwrap();

        match history.load() {
            Err(HistoryError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_failure_is_not_reported_as_corruption() {
        let source = serde_json::from_str::<u8>("\"x\"").unwrap_err();
        let err = HistoryError::from(source);
        assert!(matches!(err, HistoryError::Encode(_)));
        let message = err.to_string();
        assert!(message.starts_with("cannot encode history entry"));
        assert!(!message.contains("corrupt"));

        let line = encode_line(&entry(14, "System Junk", 100, Method::Trash)).unwrap();
        assert!(line.ends_with("}\n"));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_stats_totals_and_recent() {
        let entries = vec![
            entry(10, "System Junk", 1 << 30, Method::Trash),
            entry(11, "Browser Cache", 500 << 20, Method::Trash),
            entry(12, "System Junk", 2 << 30, Method::Permanent),
            entry(13, "Browser Cache", 300 << 20, Method::Trash),
            entry(14, "Large & Old Files", 200 << 20, Method::Permanent),
            entry(15, "Docker", 100 << 20, Method::Trash),
        ];
        let stats = Stats::from_entries(&entries);

        let expected: u64 = entries.iter().map(|e| e.bytes_freed).sum();
        assert_eq!(stats.total_freed, expected);
        assert_eq!(stats.total_cleanups, 6);
        assert_eq!(stats.by_category["System Junk"].cleanups, 2);
        assert_eq!(stats.by_category["System Junk"].bytes_freed, 3 << 30);
        assert_eq!(stats.by_category["Docker"].cleanups, 1);

        assert_eq!(stats.recent.len(), RECENT_LIMIT);
        assert_eq!(stats.recent[0].category, "Docker");
        assert_eq!(stats.recent[4].category, "Browser Cache");
        assert_eq!(stats.recent[4].timestamp.format("%d").to_string(), "11");
    }

    #[test]
    fn test_method_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Method::Permanent).unwrap(), "\"permanent\"");
        assert_eq!(Method::Trash.to_string(), "trash");
    }
}
