//! Per-category scan totals and the trend between consecutive scans.
//!
//! Only the most recent snapshot is kept. Each successful scan overwrites
//! it after diffing against the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::scanner::targets::Target;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// No scan has been saved yet
    #[error("no previous snapshot at '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("snapshot '{}' is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Totals for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub name: String,
    pub size: u64,
    pub items: u64,
}

/// Aggregated view of one completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    /// Sorted by name
    pub categories: Vec<CategorySnapshot>,
    pub total_size: u64,
}

impl Snapshot {
    /// Group targets by category, stamped with the current time
    pub fn from_targets(targets: &[Target]) -> Self {
        Self::at(Utc::now(), targets)
    }

    pub fn at(timestamp: DateTime<Utc>, targets: &[Target]) -> Self {
        let mut grouped: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        for t in targets {
            let entry = grouped.entry(t.category.as_str()).or_default();
            entry.0 += t.size;
            entry.1 += 1;
        }

        let categories: Vec<CategorySnapshot> = grouped
            .into_iter()
            .map(|(name, (size, items))| CategorySnapshot {
                name: name.to_string(),
                size,
                items,
            })
            .collect();
        let total_size = categories.iter().map(|c| c.size).sum();

        Self {
            timestamp,
            categories,
            total_size,
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategorySnapshot> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn total_items(&self) -> u64 {
        self.categories.iter().map(|c| c.items).sum()
    }
}

/// Read the snapshot at `path`.
///
/// A missing file is [`SnapshotError::NotFound`], which callers treat as
/// "first run" rather than a failure.
pub fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SnapshotError::NotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_str(&contents).map_err(|e| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write `snapshot` to `path`, replacing any previous one.
///
/// The JSON goes to a sibling temp file that is then renamed over `path`,
/// so readers never see a half-written snapshot.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let io_err = |p: &Path, e: std::io::Error| SnapshotError::Io {
        path: p.to_path_buf(),
        source: e,
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let json = serde_json::to_string_pretty(snapshot).map_err(|e| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    tracing::debug!("saved snapshot to {}", path.display());
    Ok(())
}

/// Signed change of one category between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryDiff {
    pub size_delta: i64,
    pub items_delta: i64,
}

/// Change between the previous snapshot and the current one
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DiffResult {
    /// Every category present on either side
    pub categories: BTreeMap<String, CategoryDiff>,
    pub total_size_delta: i64,
}

impl DiffResult {
    /// True when nothing moved
    pub fn is_unchanged(&self) -> bool {
        self.total_size_delta == 0
            && self
                .categories
                .values()
                .all(|d| d.size_delta == 0 && d.items_delta == 0)
    }
}

fn signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Per-category delta `current - previous`; a missing side counts as zero
pub fn diff(previous: &Snapshot, current: &Snapshot) -> DiffResult {
    let mut categories: BTreeMap<String, CategoryDiff> = BTreeMap::new();

    for c in &current.categories {
        let d = categories.entry(c.name.clone()).or_default();
        d.size_delta += signed(c.size);
        d.items_delta += signed(c.items);
    }
    for p in &previous.categories {
        let d = categories.entry(p.name.clone()).or_default();
        d.size_delta -= signed(p.size);
        d.items_delta -= signed(p.items);
    }

    DiffResult {
        categories,
        total_size_delta: signed(current.total_size) - signed(previous.total_size),
    }
}
