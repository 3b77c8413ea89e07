use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::targets::{category, RiskLevel, Target, SIMULATOR_PREFIX};
use super::walker::TargetTemplate;
use super::{default_home, Scanner};
use crate::common::{CancelToken, CommandRunner, ExecError, ScanError, SystemRunner};

/// iOS Simulator device data, caches and unavailable devices
pub struct SimulatorScanner {
    home: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Default for SimulatorScanner {
    fn default() -> Self {
        Self::new(default_home())
    }
}

/// `xcrun simctl list devices unavailable -j`
#[derive(Debug, Deserialize)]
struct SimctlOutput {
    #[serde(default)]
    devices: BTreeMap<String, Vec<SimctlDevice>>,
}

#[derive(Debug, Deserialize)]
struct SimctlDevice {
    udid: String,
    name: String,
}

impl SimulatorScanner {
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

    fn core_simulator(&self) -> PathBuf {
        self.home.join("Library/Developer/CoreSimulator")
    }

    fn unavailable_devices(&self, cancel: &CancelToken) -> Result<Vec<Target>, ExecError> {
        let out = self.runner.run(
            cancel,
            "xcrun",
            &["simctl", "list", "devices", "unavailable", "-j"],
        )?;

        let parsed: SimctlOutput = match serde_json::from_slice(&out) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("cannot parse simctl output: {}", e);
                return Ok(Vec::new());
            }
        };

        // BTreeMap iteration keeps runtimes in a stable order
        let mut targets = Vec::new();
        for (runtime, devices) in &parsed.devices {
            for dev in devices {
                targets.push(Target {
                    path: format!("{}{}", SIMULATOR_PREFIX, dev.udid),
                    size: 0,
                    category: category::SIMULATOR.to_string(),
                    description: format!("Unavailable simulator: {} ({})", dev.name, runtime),
                    risk: RiskLevel::Moderate,
                    mod_time: None,
                    is_dir: false,
                });
            }
        }
        Ok(targets)
    }
}

impl Scanner for SimulatorScanner {
    fn name(&self) -> &str {
        category::SIMULATOR
    }

    fn description(&self) -> &str {
        "iOS Simulator devices and caches"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Moderate
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        if self.runner.look_path("xcrun").is_none() {
            return Ok(Vec::new());
        }

        let mut targets = Vec::new();

        cancel.check()?;
        let devices = TargetTemplate {
            category: category::SIMULATOR,
            description: "Simulator device data",
            risk: RiskLevel::Moderate,
        };
        targets.extend(devices.children_of(&self.core_simulator().join("Devices"), cancel)?);

        cancel.check()?;
        let caches = TargetTemplate {
            category: category::SIMULATOR,
            description: "Simulator cache",
            risk: RiskLevel::Safe,
        };
        targets.extend(caches.children_of(&self.core_simulator().join("Caches"), cancel)?);

        cancel.check()?;
        match self.unavailable_devices(cancel) {
            Ok(unavailable) => targets.extend(unavailable),
            Err(e) if e.is_cancelled() => return Err(e.into()),
            Err(e) => tracing::debug!("skipping unavailable simulators: {}", e),
        }

        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FnRunner;
    use tempfile::TempDir;

    const SIMCTL_JSON: &str = r#"{
        "devices": {
            "com.apple.CoreSimulator.SimRuntime.iOS-16-0": [
                {"udid": "AAAA-1111", "name": "iPhone 14", "state": "Shutdown", "isAvailable": false}
            ],
            "com.apple.CoreSimulator.SimRuntime.iOS-15-0": [
                {"udid": "BBBB-2222", "name": "iPhone 13", "state": "Shutdown", "isAvailable": false}
            ]
        }
    }"#;

    fn seed(home: &std::path::Path) {
        let base = home.join("Library/Developer/CoreSimulator");
        let device = base.join("Devices/DEVICE-1/data");
        std::fs::create_dir_all(&device).unwrap();
        std::fs::write(device.join("disk.img"), vec![0u8; 1024]).unwrap();
        std::fs::create_dir_all(base.join("Devices/EMPTY")).unwrap();
        let cache = base.join("Caches/dyld");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::write(cache.join("shared"), vec![0u8; 512]).unwrap();
    }

    #[test]
    fn test_not_installed_returns_empty() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let runner = FnRunner::not_installed(|_: &CancelToken, _: &str, _: &[&str]| {
            Ok(Vec::new())
        });
        let targets = SimulatorScanner::new(tmp.path())
            .with_runner(Arc::new(runner))
            .scan(&CancelToken::new())
            .unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_scans_devices_caches_and_unavailable() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let runner = FnRunner::new(|_: &CancelToken, _: &str, _: &[&str]| {
            Ok(SIMCTL_JSON.as_bytes().to_vec())
        });
        let targets = SimulatorScanner::new(tmp.path())
            .with_runner(Arc::new(runner))
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(targets.len(), 4);
        assert!(targets[0].path.ends_with("DEVICE-1"));
        assert_eq!(targets[0].description, "Simulator device data");
        assert_eq!(targets[0].risk, RiskLevel::Moderate);
        assert_eq!(targets[0].size, 1024);
        assert!(targets[1].path.ends_with("dyld"));
        assert_eq!(targets[1].risk, RiskLevel::Safe);
        assert_eq!(targets[2].path, "simulator BBBB-2222");
        assert_eq!(
            targets[2].description,
            "Unavailable simulator: iPhone 13 (com.apple.CoreSimulator.SimRuntime.iOS-15-0)"
        );
        assert_eq!(targets[3].path, "simulator AAAA-1111");
        assert_eq!(targets[3].size, 0);
    }

    #[test]
    fn test_simctl_failure_keeps_filesystem_results() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let runner = FnRunner::new(|_: &CancelToken, program: &str, _: &[&str]| {
            Err(ExecError::NotFound(program.to_string()))
        });
        let targets = SimulatorScanner::new(tmp.path())
            .with_runner(Arc::new(runner))
            .scan(&CancelToken::new())
            .unwrap();
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn test_cancellation_propagates() {
        let tmp = TempDir::new().unwrap();
        seed(tmp.path());
        let runner = FnRunner::new(|cancel: &CancelToken, _: &str, _: &[&str]| {
            cancel.check()?;
            Ok(SIMCTL_JSON.as_bytes().to_vec())
        });
        let token = CancelToken::new();
        token.cancel();
        let err = SimulatorScanner::new(tmp.path())
            .with_runner(Arc::new(runner))
            .scan(&token)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
