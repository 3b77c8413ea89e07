use std::path::PathBuf;

use super::targets::{category, RiskLevel, Target};
use super::walker::{ExcludeSet, TargetTemplate};
use super::{default_home, Scanner};
use crate::common::{CancelToken, ScanError};

/// How a cache location is turned into targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    /// The whole directory is one target
    Whole,
    /// Each immediate child is its own target
    Children,
}

/// One cache location relative to the home directory
#[derive(Debug, Clone, Copy)]
struct CacheDir {
    rel: &'static str,
    description: &'static str,
    unit: Unit,
}

const fn whole(rel: &'static str, description: &'static str) -> CacheDir {
    CacheDir {
        rel,
        description,
        unit: Unit::Whole,
    }
}

const fn children(rel: &'static str, description: &'static str) -> CacheDir {
    CacheDir {
        rel,
        description,
        unit: Unit::Children,
    }
}

/// A developer tool whose caches regenerate on demand
#[derive(Debug, Clone, Copy)]
pub struct DevTool {
    pub category: &'static str,
    pub description: &'static str,
    pub risk: RiskLevel,
    dirs: &'static [CacheDir],
}

pub const NODE: DevTool = DevTool {
    category: category::NODE,
    description: "npm, Yarn and pnpm package caches",
    risk: RiskLevel::Safe,
    dirs: &[
        whole(".npm/_cacache", "npm cache"),
        whole("Library/Caches/Yarn", "Yarn cache"),
        whole("Library/pnpm/store", "pnpm store"),
    ],
};

pub const PYTHON: DevTool = DevTool {
    category: category::PYTHON,
    description: "pip, Poetry and uv caches",
    risk: RiskLevel::Safe,
    dirs: &[
        whole("Library/Caches/pip", "pip cache"),
        whole("Library/Caches/pypoetry", "Poetry cache"),
        whole(".cache/uv", "uv cache"),
        whole("Library/Caches/uv", "uv cache"),
    ],
};

pub const RUST: DevTool = DevTool {
    category: category::RUST,
    description: "Cargo registry and git caches",
    risk: RiskLevel::Safe,
    dirs: &[
        whole(".cargo/registry/cache", "Cargo registry archives"),
        whole(".cargo/registry/src", "Cargo registry sources"),
        whole(".cargo/git/db", "Cargo git checkouts"),
    ],
};

pub const GO: DevTool = DevTool {
    category: category::GO,
    description: "Go build and module caches",
    risk: RiskLevel::Safe,
    dirs: &[
        whole("Library/Caches/go-build", "Go build cache"),
        whole("go/pkg/mod/cache", "Go module download cache"),
    ],
};

pub const RUBY: DevTool = DevTool {
    category: category::RUBY,
    description: "RubyGems and Bundler caches",
    risk: RiskLevel::Safe,
    dirs: &[
        whole(".gem/cache", "RubyGems cache"),
        whole(".bundle/cache", "Bundler cache"),
        whole("Library/Caches/CocoaPods", "CocoaPods cache"),
    ],
};

pub const JETBRAINS: DevTool = DevTool {
    category: category::JETBRAINS,
    description: "JetBrains IDE caches",
    risk: RiskLevel::Safe,
    dirs: &[children("Library/Caches/JetBrains", "JetBrains IDE cache")],
};

pub const MAVEN: DevTool = DevTool {
    category: category::MAVEN,
    description: "Maven local repository",
    risk: RiskLevel::Moderate,
    dirs: &[whole(".m2/repository", "Maven local repository")],
};

pub const GRADLE: DevTool = DevTool {
    category: category::GRADLE,
    description: "Gradle caches and wrapper distributions",
    risk: RiskLevel::Safe,
    dirs: &[
        whole(".gradle/caches", "Gradle build cache"),
        children(".gradle/wrapper/dists", "Gradle wrapper distribution"),
    ],
};

/// Scans the cache locations of one [`DevTool`]
pub struct DevCacheScanner {
    tool: DevTool,
    home: PathBuf,
    exclude: ExcludeSet,
}

impl DevCacheScanner {
    pub fn new(tool: DevTool, home: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            home: home.into(),
            exclude: ExcludeSet::default(),
        }
    }

    /// Leave excluded paths out of the reported caches
    pub fn with_exclude(mut self, exclude: ExcludeSet) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn for_tool(tool: DevTool) -> Self {
        Self::new(tool, default_home())
    }
}

impl Scanner for DevCacheScanner {
    fn name(&self) -> &str {
        self.tool.category
    }

    fn description(&self) -> &str {
        self.tool.description
    }

    fn risk(&self) -> RiskLevel {
        self.tool.risk
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        let mut targets = Vec::new();
        for dir in self.tool.dirs {
            cancel.check()?;
            let template = TargetTemplate {
                category: self.tool.category,
                description: dir.description,
                risk: self.tool.risk,
            };
            let path = self.home.join(dir.rel);
            match dir.unit {
                Unit::Whole => targets.extend(template.sized(&path, cancel)?),
                Unit::Children => targets.extend(template.children_of(&path, cancel)?),
            }
        }
        Ok(self.exclude.apply(targets, cancel)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(home: &std::path::Path, rel: &str, bytes: usize) {
        let path = home.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_node_caches_in_table_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Library/pnpm/store/v3/files/00/abc", 40);
        write(tmp.path(), ".npm/_cacache/index-v5/aa/bb", 100);

        let targets = DevCacheScanner::new(NODE, tmp.path())
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].description, "npm cache");
        assert_eq!(targets[0].size, 100);
        assert_eq!(targets[1].description, "pnpm store");
        assert!(targets.iter().all(|t| t.category == "Node.js" && t.is_dir));
    }

    #[test]
    fn test_excluded_cache_contents_are_not_reported() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".npm/_cacache/keep-me/blob", 1000);
        let exclude = ExcludeSet::new(&[format!(
            "{}/**",
            tmp.path().join(".npm/_cacache/keep-me").display()
        )]);

        let targets = DevCacheScanner::new(NODE, tmp.path())
            .with_exclude(exclude)
            .scan(&CancelToken::new())
            .unwrap();

        assert!(targets.is_empty(), "excluded bytes reported: {targets:?}");
    }

    #[test]
    fn test_excluded_subtree_splits_whole_cache() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".npm/_cacache/keep-me/blob", 1000);
        write(tmp.path(), ".npm/_cacache/index-v5/aa/bb", 60);
        write(tmp.path(), ".npm/_cacache/content-v2/sha512/cc", 40);
        let exclude = ExcludeSet::new(&[format!(
            "{}/**",
            tmp.path().join(".npm/_cacache/keep-me").display()
        )]);

        let targets = DevCacheScanner::new(NODE, tmp.path())
            .with_exclude(exclude)
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert!(targets[0].path.ends_with("_cacache/content-v2"));
        assert!(targets[1].path.ends_with("_cacache/index-v5"));
        assert_eq!(targets.iter().map(|t| t.size).sum::<u64>(), 100);
        assert!(targets.iter().all(|t| t.description == "npm cache"));
    }

    #[test]
    fn test_jetbrains_reports_each_ide() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Library/Caches/JetBrains/IntelliJIdea2024.1/index", 10);
        write(tmp.path(), "Library/Caches/JetBrains/GoLand2024.1/index", 20);

        let targets = DevCacheScanner::new(JETBRAINS, tmp.path())
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert!(targets[0].path.ends_with("GoLand2024.1"));
        assert!(targets[1].path.ends_with("IntelliJIdea2024.1"));
    }

    #[test]
    fn test_maven_is_moderate() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".m2/repository/org/junit/junit.jar", 10);
        let scanner = DevCacheScanner::new(MAVEN, tmp.path());
        let targets = scanner.scan(&CancelToken::new()).unwrap();
        assert_eq!(scanner.risk(), RiskLevel::Moderate);
        assert_eq!(targets[0].risk, RiskLevel::Moderate);
    }

    #[test]
    fn test_missing_dirs_yield_nothing() {
        let tmp = TempDir::new().unwrap();
        for tool in [NODE, PYTHON, RUST, GO, RUBY, JETBRAINS, MAVEN, GRADLE] {
            let targets = DevCacheScanner::new(tool, tmp.path())
                .scan(&CancelToken::new())
                .unwrap();
            assert!(targets.is_empty(), "{} found phantom caches", tool.category);
        }
    }
}
