use std::path::PathBuf;
use std::sync::Arc;

use super::targets::{category, RiskLevel, Target};
use super::walker::TargetTemplate;
use super::{default_home, Scanner};
use crate::common::{CancelToken, CommandRunner, ScanError, SystemRunner};

/// Downloaded bottles and source archives in the Homebrew cache
pub struct HomebrewScanner {
    home: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Default for HomebrewScanner {
    fn default() -> Self {
        Self::new(default_home())
    }
}

impl HomebrewScanner {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            runner: Arc::new(SystemRunner::default()),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Ask brew where its cache lives, falling back to the default location
    fn cache_dir(&self, cancel: &CancelToken) -> Result<PathBuf, ScanError> {
        let fallback = self.home.join("Library/Caches/Homebrew");
        match self.runner.run(cancel, "brew", &["--cache"]) {
            Ok(out) => {
                let reported = String::from_utf8_lossy(&out).trim().to_string();
                if reported.is_empty() {
                    Ok(fallback)
                } else {
                    Ok(PathBuf::from(reported))
                }
            }
            Err(e) if e.is_cancelled() => Err(e.into()),
            Err(e) => {
                tracing::debug!("brew --cache failed, using default: {}", e);
                Ok(fallback)
            }
        }
    }
}

impl Scanner for HomebrewScanner {
    fn name(&self) -> &str {
        category::HOMEBREW
    }

    fn description(&self) -> &str {
        "Homebrew download cache"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        if self.runner.look_path("brew").is_none() {
            return Ok(Vec::new());
        }

        let dir = self.cache_dir(cancel)?;
        let template = TargetTemplate {
            category: category::HOMEBREW,
            description: "Homebrew cached download",
            risk: RiskLevel::Safe,
        };
        Ok(template.children_of(&dir, cancel)?)
    }
}
