use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ─── Core types ───────────────────────────────────────────────────────────────

/// Risk level for removing a target.
///
/// Ordered by display emphasis: `Safe < Moderate < Dangerous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Caches and build products that regenerate on demand
    Safe,
    /// Data that is expensive to recreate or may still be in use
    Moderate,
    /// User files or application data; review before removing
    Dangerous,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Safe => write!(f, "Safe"),
            RiskLevel::Moderate => write!(f, "Moderate"),
            RiskLevel::Dangerous => write!(f, "Dangerous"),
        }
    }
}

/// Stable category names. These key snapshots and history, so they must
/// not change between releases.
pub mod category {
    pub const SYSTEM: &str = "System Junk";
    pub const BROWSER: &str = "Browser Cache";
    pub const XCODE: &str = "Xcode";
    pub const LARGE: &str = "Large & Old Files";
    pub const DOCKER: &str = "Docker";
    pub const NODE: &str = "Node.js";
    pub const HOMEBREW: &str = "Homebrew";
    pub const SIMULATOR: &str = "iOS Simulators";
    pub const PYTHON: &str = "Python";
    pub const RUST: &str = "Rust";
    pub const GO: &str = "Go";
    pub const RUBY: &str = "Ruby";
    pub const JETBRAINS: &str = "JetBrains";
    pub const MAVEN: &str = "Maven";
    pub const GRADLE: &str = "Gradle";
    pub const APPLICATIONS: &str = "Applications";
}

/// Prefixes for targets that are not filesystem paths
pub const DOCKER_IMAGE_PREFIX: &str = "docker image ";
pub const DOCKER_BUILD_CACHE: &str = "docker build cache";
pub const SIMULATOR_PREFIX: &str = "simulator ";

/// One reclaimable unit: a file, a directory, or a synthetic resource
/// such as a container image.
///
/// Deleting `path` frees exactly `size` bytes; targets are built fresh on
/// every scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Filesystem path, or a synthetic id like `docker image <id>`
    pub path: String,

    /// Reclaimable bytes; 0 when unknown
    pub size: u64,

    /// Grouping key used for filters, snapshots and history
    pub category: String,

    /// Provenance shown to the operator
    pub description: String,

    pub risk: RiskLevel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<DateTime<Utc>>,

    pub is_dir: bool,
}

/// What the delete step should act on for a given target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    File(&'a Path),
    DockerImage(&'a str),
    DockerBuildCache,
    Simulator(&'a str),
}

impl Target {
    /// Interpret `path` by convention
    pub fn resource(&self) -> Resource<'_> {
        Self::resource_of(&self.path)
    }

    pub fn resource_of(path: &str) -> Resource<'_> {
        if path == DOCKER_BUILD_CACHE {
            Resource::DockerBuildCache
        } else if let Some(id) = path.strip_prefix(DOCKER_IMAGE_PREFIX) {
            Resource::DockerImage(id)
        } else if let Some(udid) = path.strip_prefix(SIMULATOR_PREFIX) {
            Resource::Simulator(udid)
        } else {
            Resource::File(Path::new(path))
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self.resource(), Resource::File(_))
    }
}

/// Total bytes across targets
pub fn total_size(targets: &[Target]) -> u64 {
    targets.iter().map(|t| t.size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str) -> Target {
        Target {
            path: path.into(),
            size: 0,
            category: category::DOCKER.into(),
            description: String::new(),
            risk: RiskLevel::Moderate,
            mod_time: None,
            is_dir: false,
        }
    }

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::Dangerous > RiskLevel::Moderate);
        assert!(RiskLevel::Moderate > RiskLevel::Safe);
    }

    #[test]
    fn test_resource_parsing() {
        assert_eq!(
            target("docker image abc123").resource(),
            Resource::DockerImage("abc123")
        );
        assert_eq!(target("docker build cache").resource(), Resource::DockerBuildCache);
        assert_eq!(
            target("simulator AAA-111").resource(),
            Resource::Simulator("AAA-111")
        );
        assert_eq!(
            target("/tmp/x").resource(),
            Resource::File(Path::new("/tmp/x"))
        );
        assert!(!target("/tmp/x").is_synthetic());
    }

    #[test]
    fn test_risk_serializes_snake_case() {
        let json = serde_json::to_string(&RiskLevel::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}
