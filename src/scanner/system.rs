use std::path::{Path, PathBuf};

use super::targets::{category, RiskLevel, Target};
use super::walker::TargetTemplate;
use super::{default_home, Scanner};
use crate::common::{CancelToken, ScanError};

/// Cache directories owned by a more specific scanner. Skipping them keeps
/// one path from being reported twice within a default scan.
const OWNED_ELSEWHERE: &[&str] = &[
    "com.apple.Safari",
    "Google",
    "Firefox",
    "Microsoft Edge",
    "BraveSoftware",
    "Arc",
    "Homebrew",
    "Yarn",
    "pip",
    "pypoetry",
    "uv",
    "go-build",
    "JetBrains",
    "CocoaPods",
    "com.apple.dt.Xcode",
];

/// User caches and logs under ~/Library
pub struct SystemScanner {
    home: PathBuf,
}

impl Default for SystemScanner {
    fn default() -> Self {
        Self::new(default_home())
    }
}

impl SystemScanner {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    fn library(&self) -> PathBuf {
        self.home.join("Library")
    }
}

impl Scanner for SystemScanner {
    fn name(&self) -> &str {
        category::SYSTEM
    }

    fn description(&self) -> &str {
        "User caches, logs and crash reports"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        let mut targets = Vec::new();

        let caches = TargetTemplate {
            category: category::SYSTEM,
            description: "Application cache",
            risk: RiskLevel::Safe,
        };
        let cache_dir = self.library().join("Caches");
        for child in super::walker::sorted_children(&cache_dir) {
            cancel.check()?;
            if is_owned_elsewhere(&child) {
                continue;
            }
            if let Some(t) = caches.sized(&child, cancel)? {
                targets.push(t);
            }
        }

        let logs = TargetTemplate {
            category: category::SYSTEM,
            description: "Application logs",
            risk: RiskLevel::Safe,
        };
        targets.extend(logs.children_of(&self.library().join("Logs"), cancel)?);

        Ok(targets)
    }
}

fn is_owned_elsewhere(path: &Path) -> bool {
    path.file_name()
        .map(|n| OWNED_ELSEWHERE.iter().any(|o| n == *o))
        .unwrap_or(false)
}
