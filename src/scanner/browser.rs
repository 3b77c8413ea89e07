use std::path::PathBuf;

use super::targets::{category, RiskLevel, Target};
use super::walker::TargetTemplate;
use super::{default_home, Scanner};
use crate::common::{CancelToken, ScanError};

/// Browser cache locations, relative to ~/Library/Caches
const BROWSER_CACHES: &[(&str, &str)] = &[
    ("Safari", "com.apple.Safari"),
    ("Chrome", "Google/Chrome"),
    ("Firefox", "Firefox/Profiles"),
    ("Edge", "Microsoft Edge"),
    ("Brave", "BraveSoftware/Brave-Browser"),
    ("Arc", "Arc"),
];

/// Web browser caches
pub struct BrowserScanner {
    home: PathBuf,
}

impl Default for BrowserScanner {
    fn default() -> Self {
        Self::new(default_home())
    }
}

impl BrowserScanner {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl Scanner for BrowserScanner {
    fn name(&self) -> &str {
        category::BROWSER
    }

    fn description(&self) -> &str {
        "Safari, Chrome, Firefox, Edge, Brave and Arc caches"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Safe
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        let caches = self.home.join("Library/Caches");
        let mut targets = Vec::new();

        for (browser, rel) in BROWSER_CACHES {
            cancel.check()?;
            let description = format!("{} cache", browser);
            let template = TargetTemplate {
                category: category::BROWSER,
                description: &description,
                risk: RiskLevel::Safe,
            };
            if let Some(t) = template.sized(&caches.join(rel), cancel)? {
                targets.push(t);
            }
        }

        Ok(targets)
    }
}
