use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::targets::{RiskLevel, Target};
use crate::common::{CancelToken, Cancelled};

/// How many walk entries are visited between cancellation checks
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Total apparent size of every file below `path` (symlinks not followed).
///
/// Unreadable entries are skipped. Returns `Err` as soon as the token fires.
pub fn dir_size(path: &Path, cancel: &CancelToken) -> Result<u64, Cancelled> {
    let mut total = 0u64;
    for (i, entry) in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .enumerate()
    {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            cancel.check()?;
        }
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Ok(total)
}

/// Size of a file, or the recursive size of a directory
pub fn entry_size(path: &Path, cancel: &CancelToken) -> Result<u64, Cancelled> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => dir_size(path, cancel),
        Ok(meta) => Ok(meta.len()),
        Err(_) => Ok(0),
    }
}

/// Modification time of a path, if readable
pub fn mod_time(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::symlink_metadata(path)
        .ok()?
        .modified()
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Immediate children of `dir`, sorted by name for a stable order.
/// A missing or unreadable directory has no children.
pub fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("cannot read {}: {}", dir.display(), e);
            }
            Vec::new()
        }
    };
    children.sort();
    children
}

/// How targets found under a directory are labelled
#[derive(Debug, Clone)]
pub struct TargetTemplate<'a> {
    pub category: &'a str,
    pub description: &'a str,
    pub risk: RiskLevel,
}

impl TargetTemplate<'_> {
    /// Build a target for `path`, or `None` if it holds zero bytes
    pub fn sized(&self, path: &Path, cancel: &CancelToken) -> Result<Option<Target>, Cancelled> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };
        let size = if meta.is_dir() {
            dir_size(path, cancel)?
        } else {
            meta.len()
        };
        if size == 0 {
            return Ok(None);
        }
        Ok(Some(Target {
            path: path.display().to_string(),
            size,
            category: self.category.to_string(),
            description: self.description.to_string(),
            risk: self.risk,
            mod_time: meta.modified().ok().map(DateTime::<Utc>::from),
            is_dir: meta.is_dir(),
        }))
    }

    /// One target per non-empty child of `dir`
    pub fn children_of(&self, dir: &Path, cancel: &CancelToken) -> Result<Vec<Target>, Cancelled> {
        let mut targets = Vec::new();
        for child in sorted_children(dir) {
            cancel.check()?;
            if let Some(t) = self.sized(&child, cancel)? {
                targets.push(t);
            }
        }
        Ok(targets)
    }
}

/// Compiled path-exclusion patterns.
///
/// Patterns may start with `~`. `dir/**` excludes `dir` itself and
/// everything under it; any other pattern is a glob over the full path.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<glob::Pattern>,
    prefixes: Vec<PathBuf>,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut set = ExcludeSet::default();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let expanded = expand_tilde(raw);
            let expanded = expanded.to_string_lossy();

            if let Some(dir) = expanded.strip_suffix("/**") {
                if !dir.contains(['*', '?', '[']) {
                    set.prefixes.push(PathBuf::from(dir));
                    continue;
                }
            }

            match glob::Pattern::new(&expanded) {
                Ok(p) => set.patterns.push(p),
                Err(e) => tracing::warn!("ignoring invalid exclude pattern '{}': {}", raw, e),
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.prefixes.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.prefixes.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        self.patterns.iter().any(|p| p.matches_path(path))
    }

    /// True when some path strictly below `path` is excluded
    pub fn covers_descendant(&self, path: &Path, cancel: &CancelToken) -> Result<bool, Cancelled> {
        if self.prefixes.iter().any(|p| p.starts_with(path) && p.as_path() != path) {
            return Ok(true);
        }
        if self.patterns.is_empty() {
            return Ok(false);
        }
        for (i, entry) in WalkDir::new(path)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .enumerate()
        {
            if i % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }
            if self.is_excluded(entry.path()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove excluded data from `targets`.
    ///
    /// An excluded target is dropped. A directory target holding excluded
    /// data is replaced by its remaining children, recursively, so no
    /// reported target contains an excluded path. Synthetic ids never
    /// match a filesystem pattern and pass through.
    pub fn apply(&self, targets: Vec<Target>, cancel: &CancelToken) -> Result<Vec<Target>, Cancelled> {
        if self.is_empty() {
            return Ok(targets);
        }
        let mut kept = Vec::with_capacity(targets.len());
        for target in targets {
            self.carve(target, cancel, &mut kept)?;
        }
        Ok(kept)
    }

    fn carve(&self, target: Target, cancel: &CancelToken, out: &mut Vec<Target>) -> Result<(), Cancelled> {
        if target.is_synthetic() {
            out.push(target);
            return Ok(());
        }
        let path = PathBuf::from(&target.path);
        if self.is_excluded(&path) {
            tracing::debug!("excluded {}", target.path);
            return Ok(());
        }
        if !target.is_dir || !self.covers_descendant(&path, cancel)? {
            out.push(target);
            return Ok(());
        }

        tracing::debug!("splitting {} around excluded paths", target.path);
        let template = TargetTemplate {
            category: &target.category,
            description: &target.description,
            risk: target.risk,
        };
        for child in sorted_children(&path) {
            cancel.check()?;
            if let Some(t) = template.sized(&child, cancel)? {
                self.carve(t, cancel, out)?;
            }
        }
        Ok(())
    }
}
