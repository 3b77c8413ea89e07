use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use super::targets::{category, RiskLevel, Target};
use super::walker::{expand_tilde, ExcludeSet};
use super::Scanner;
use crate::common::config::Config;
use crate::common::{CancelToken, ScanError};

/// Large files that have not been touched for a long time
pub struct LargeFileScanner {
    roots: Vec<PathBuf>,
    min_size: u64,
    min_age: Duration,
    exclude: ExcludeSet,
}

impl LargeFileScanner {
    pub fn new(roots: Vec<PathBuf>, min_size: u64, min_age: Duration) -> Self {
        Self {
            roots,
            min_size,
            min_age,
            exclude: ExcludeSet::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let roots = config.large_file_roots.iter().map(|r| expand_tilde(r)).collect();
        Self::new(
            roots,
            config.large_file_min_bytes(),
            Duration::from_secs(config.large_file_max_age_days as u64 * 86400),
        )
        .with_exclude(ExcludeSet::new(&config.exclude))
    }

    /// Prune excluded directories during the walk instead of afterwards
    pub fn with_exclude(mut self, exclude: ExcludeSet) -> Self {
        self.exclude = exclude;
        self
    }
}

impl Scanner for LargeFileScanner {
    fn name(&self) -> &str {
        category::LARGE
    }

    fn description(&self) -> &str {
        "Large files not modified recently"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        let now = SystemTime::now();
        let mut targets = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                continue;
            }

            for entry in WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    let name = e.file_name().to_string_lossy();
                    // Skip hidden dirs, node_modules, app bundles and Library
                    let skipped = e.depth() > 0
                        && (name.starts_with('.')
                            || name == "node_modules"
                            || name == "Library"
                            || name.ends_with(".app"));
                    !skipped && !self.exclude.is_excluded(e.path())
                })
                .filter_map(|e| e.ok())
            {
                cancel.check()?;

                if !entry.file_type().is_file() {
                    continue;
                }
                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                if metadata.len() < self.min_size {
                    continue;
                }
                let modified = match metadata.modified() {
                    Ok(m) => m,
                    Err(_) => continue,
                };
                let age = now.duration_since(modified).unwrap_or_default();
                if age < self.min_age {
                    continue;
                }

                targets.push(Target {
                    path: entry.path().display().to_string(),
                    size: metadata.len(),
                    category: category::LARGE.to_string(),
                    description: format!("Large file, untouched for {} days", age.as_secs() / 86400),
                    risk: RiskLevel::Dangerous,
                    mod_time: Some(DateTime::<Utc>::from(modified)),
                    is_dir: false,
                });
            }
        }

        // Biggest first; the walk order breaks ties
        targets.sort_by(|a, b| b.size.cmp(&a.size));
        Ok(targets)
    }
}
