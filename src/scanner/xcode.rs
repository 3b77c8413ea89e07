use std::path::PathBuf;

use super::targets::{category, RiskLevel, Target};
use super::walker::TargetTemplate;
use super::{default_home, Scanner};
use crate::common::{CancelToken, ScanError};

/// Xcode build products, archives and device support files
pub struct XcodeScanner {
    home: PathBuf,
}

impl Default for XcodeScanner {
    fn default() -> Self {
        Self::new(default_home())
    }
}

impl XcodeScanner {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl Scanner for XcodeScanner {
    fn name(&self) -> &str {
        category::XCODE
    }

    fn description(&self) -> &str {
        "Xcode DerivedData, archives and device support"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Moderate
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        let developer = self.home.join("Library/Developer/Xcode");

        let sources = [
            (
                "DerivedData",
                "Build artifacts regenerated on next build",
                RiskLevel::Safe,
            ),
            (
                "Archives",
                "App archive, keep if you debug shipped builds",
                RiskLevel::Moderate,
            ),
            (
                "iOS DeviceSupport",
                "Device symbols, re-copied when the device reconnects",
                RiskLevel::Moderate,
            ),
        ];

        let mut targets = Vec::new();
        for (dir, description, risk) in sources {
            let template = TargetTemplate {
                category: category::XCODE,
                description,
                risk,
            };
            targets.extend(template.children_of(&developer.join(dir), cancel)?);
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_derived_data_is_safe_archives_moderate() {
        let tmp = TempDir::new().unwrap();
        let xcode = tmp.path().join("Library/Developer/Xcode");
        for rel in ["DerivedData/App-abc/Build", "Archives/2024-01-01"] {
            std::fs::create_dir_all(xcode.join(rel)).unwrap();
            std::fs::write(xcode.join(rel).join("blob"), vec![0u8; 128]).unwrap();
        }

        let targets = XcodeScanner::new(tmp.path()).scan(&CancelToken::new()).unwrap();

        assert_eq!(targets.len(), 2);
        assert!(targets[0].path.ends_with("App-abc"));
        assert_eq!(targets[0].risk, RiskLevel::Safe);
        assert!(targets[1].path.ends_with("2024-01-01"));
        assert_eq!(targets[1].risk, RiskLevel::Moderate);
    }
}
