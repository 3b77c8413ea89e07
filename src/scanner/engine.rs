use rayon::prelude::*;
use std::sync::Arc;

use super::browser::BrowserScanner;
use super::devcache::{self, DevCacheScanner};
use super::docker::DockerScanner;
use super::homebrew::HomebrewScanner;
use super::large::LargeFileScanner;
use super::simulator::SimulatorScanner;
use super::system::SystemScanner;
use super::targets::{category, Target};
use super::walker::ExcludeSet;
use super::xcode::XcodeScanner;
use super::Scanner;
use crate::common::config::Config;
use crate::common::{CancelToken, CommandRunner, ScanError};

/// The closed set of category scanners, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerKind {
    System,
    Browser,
    Xcode,
    Large,
    Docker,
    Node,
    Homebrew,
    Simulator,
    Python,
    Rust,
    Go,
    Ruby,
    JetBrains,
    Maven,
    Gradle,
}

impl ScannerKind {
    /// Every scanner in the order results are reported
    pub const ALL: [ScannerKind; 15] = [
        ScannerKind::System,
        ScannerKind::Browser,
        ScannerKind::Xcode,
        ScannerKind::Large,
        ScannerKind::Docker,
        ScannerKind::Node,
        ScannerKind::Homebrew,
        ScannerKind::Simulator,
        ScannerKind::Python,
        ScannerKind::Rust,
        ScannerKind::Go,
        ScannerKind::Ruby,
        ScannerKind::JetBrains,
        ScannerKind::Maven,
        ScannerKind::Gradle,
    ];

    /// Members of the `dev` umbrella
    pub fn is_dev(self) -> bool {
        !matches!(
            self,
            ScannerKind::System | ScannerKind::Browser | ScannerKind::Large
        )
    }

    /// Members of the `caches` umbrella
    pub fn is_general_cache(self) -> bool {
        matches!(self, ScannerKind::System | ScannerKind::Browser)
    }

    /// Category name the scanner reports under
    pub fn category(self) -> &'static str {
        match self {
            ScannerKind::System => category::SYSTEM,
            ScannerKind::Browser => category::BROWSER,
            ScannerKind::Xcode => category::XCODE,
            ScannerKind::Large => category::LARGE,
            ScannerKind::Docker => category::DOCKER,
            ScannerKind::Node => category::NODE,
            ScannerKind::Homebrew => category::HOMEBREW,
            ScannerKind::Simulator => category::SIMULATOR,
            ScannerKind::Python => category::PYTHON,
            ScannerKind::Rust => category::RUST,
            ScannerKind::Go => category::GO,
            ScannerKind::Ruby => category::RUBY,
            ScannerKind::JetBrains => category::JETBRAINS,
            ScannerKind::Maven => category::MAVEN,
            ScannerKind::Gradle => category::GRADLE,
        }
    }

    /// Construct the production scanner for this kind
    pub fn build(self, config: &Config, runner: &Arc<dyn CommandRunner>) -> Box<dyn Scanner> {
        match self {
            ScannerKind::System => Box::new(SystemScanner::default()),
            ScannerKind::Browser => Box::new(BrowserScanner::default()),
            ScannerKind::Xcode => Box::new(XcodeScanner::default()),
            ScannerKind::Large => Box::new(LargeFileScanner::from_config(config)),
            ScannerKind::Docker => Box::new(DockerScanner::new(Arc::clone(runner))),
            ScannerKind::Node => dev_cache(devcache::NODE, config),
            ScannerKind::Homebrew => {
                Box::new(HomebrewScanner::default().with_runner(Arc::clone(runner)))
            }
            ScannerKind::Simulator => {
                Box::new(SimulatorScanner::default().with_runner(Arc::clone(runner)))
            }
            ScannerKind::Python => dev_cache(devcache::PYTHON, config),
            ScannerKind::Rust => dev_cache(devcache::RUST, config),
            ScannerKind::Go => dev_cache(devcache::GO, config),
            ScannerKind::Ruby => dev_cache(devcache::RUBY, config),
            ScannerKind::JetBrains => dev_cache(devcache::JETBRAINS, config),
            ScannerKind::Maven => dev_cache(devcache::MAVEN, config),
            ScannerKind::Gradle => dev_cache(devcache::GRADLE, config),
        }
    }
}

fn dev_cache(tool: devcache::DevTool, config: &Config) -> Box<dyn Scanner> {
    Box::new(DevCacheScanner::for_tool(tool).with_exclude(ExcludeSet::new(&config.exclude)))
}

/// Category selection for one invocation.
///
/// Built once from command-line flags and passed to the engine. Selecting
/// nothing is the same as selecting `all`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub system: bool,
    pub browser: bool,
    pub xcode: bool,
    pub large: bool,
    pub docker: bool,
    pub node: bool,
    pub homebrew: bool,
    pub simulator: bool,
    pub python: bool,
    pub rust: bool,
    pub go: bool,
    pub ruby: bool,
    pub jetbrains: bool,
    pub maven: bool,
    pub gradle: bool,
    /// Every developer-tool scanner
    pub dev: bool,
    /// System and browser caches
    pub caches: bool,
    pub all: bool,
}

impl CategoryFilter {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    fn selects(&self, kind: ScannerKind) -> bool {
        let direct = match kind {
            ScannerKind::System => self.system,
            ScannerKind::Browser => self.browser,
            ScannerKind::Xcode => self.xcode,
            ScannerKind::Large => self.large,
            ScannerKind::Docker => self.docker,
            ScannerKind::Node => self.node,
            ScannerKind::Homebrew => self.homebrew,
            ScannerKind::Simulator => self.simulator,
            ScannerKind::Python => self.python,
            ScannerKind::Rust => self.rust,
            ScannerKind::Go => self.go,
            ScannerKind::Ruby => self.ruby,
            ScannerKind::JetBrains => self.jetbrains,
            ScannerKind::Maven => self.maven,
            ScannerKind::Gradle => self.gradle,
        };
        direct || (self.dev && kind.is_dev()) || (self.caches && kind.is_general_cache())
    }

    /// The scanners to run, in registration order
    pub fn resolve(&self) -> Vec<ScannerKind> {
        let selected: Vec<ScannerKind> = ScannerKind::ALL
            .into_iter()
            .filter(|k| self.selects(*k))
            .collect();
        if self.all || selected.is_empty() {
            ScannerKind::ALL.to_vec()
        } else {
            selected
        }
    }
}

/// A scanner that failed for a reason other than cancellation
#[derive(Debug)]
pub struct ScannerFailure {
    pub scanner: String,
    pub error: ScanError,
}

/// Result of one engine run
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Targets from every scanner that succeeded, in registration order
    pub targets: Vec<Target>,
    /// Scanners that failed; their targets are missing from `targets`
    pub failures: Vec<ScannerFailure>,
}

impl ScanOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The merged targets, or the first scanner failure
    pub fn into_targets(mut self) -> Result<Vec<Target>, ScanError> {
        if self.failures.is_empty() {
            return Ok(self.targets);
        }
        let first = self.failures.remove(0);
        Err(ScanError::Scanner {
            scanner: first.scanner,
            source: Box::new(first.error),
        })
    }
}

/// Runs a fixed list of scanners under one cancellation token
pub struct Engine {
    scanners: Vec<Box<dyn Scanner>>,
    exclude: ExcludeSet,
    parallel: bool,
}

impl Engine {
    pub fn new(scanners: Vec<Box<dyn Scanner>>) -> Self {
        Self {
            scanners,
            exclude: ExcludeSet::default(),
            parallel: false,
        }
    }

    /// Production scanners for `filter`, configured from `config`
    pub fn from_filter(
        filter: &CategoryFilter,
        config: &Config,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let scanners = filter
            .resolve()
            .into_iter()
            .map(|kind| kind.build(config, &runner))
            .collect();
        Self::new(scanners)
            .with_exclude(ExcludeSet::new(&config.exclude))
            .parallel(config.parallel_scan)
    }

    /// Keep excluded paths out of every scanner's output, splitting
    /// targets that hold excluded data
    pub fn with_exclude(mut self, exclude: ExcludeSet) -> Self {
        self.exclude = exclude;
        self
    }

    /// Run scanners concurrently. Result order is unchanged.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    pub fn scan(&self, cancel: &CancelToken) -> Result<ScanOutcome, ScanError> {
        self.scan_with_progress(cancel, |_| {})
    }

    /// Like [`Engine::scan`], calling `progress` with each scanner's name as
    /// it starts.
    pub fn scan_with_progress<F>(&self, cancel: &CancelToken, progress: F) -> Result<ScanOutcome, ScanError>
    where
        F: Fn(&str) + Sync,
    {
        let run = |scanner: &Box<dyn Scanner>| -> Result<Vec<Target>, ScanError> {
            progress(scanner.name());
            cancel.check()?;
            scanner.scan(cancel)
        };

        let results: Vec<Result<Vec<Target>, ScanError>> = if self.parallel {
            self.scanners.par_iter().map(&run).collect()
        } else {
            let mut results = Vec::with_capacity(self.scanners.len());
            for scanner in &self.scanners {
                let result = run(scanner);
                let stop = matches!(&result, Err(e) if e.is_cancelled());
                results.push(result);
                if stop {
                    break;
                }
            }
            results
        };

        let mut outcome = ScanOutcome::default();
        for (scanner, result) in self.scanners.iter().zip(results) {
            match result {
                Ok(targets) => outcome.targets.extend(self.exclude.apply(targets, cancel)?),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!("{} scanner failed: {}", scanner.name(), e);
                    outcome.failures.push(ScannerFailure {
                        scanner: scanner.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        // A token that fired after the last scanner returned still voids the run
        cancel.check()?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::targets::RiskLevel;
    use crate::common::Cancelled;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: fn() -> Result<Vec<Target>, ScanError>,
        calls: Arc<AtomicUsize>,
    }

    impl Scanner for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "fixed"
        }
        fn risk(&self) -> RiskLevel {
            RiskLevel::Safe
        }
        fn scan(&self, _cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn target(path: &str, category: &str) -> Target {
        Target {
            path: path.into(),
            size: 10,
            category: category.into(),
            description: String::new(),
            risk: RiskLevel::Safe,
            mod_time: None,
            is_dir: false,
        }
    }

    fn fixed(name: &'static str, result: fn() -> Result<Vec<Target>, ScanError>) -> (Box<dyn Scanner>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Fixed {
                name,
                result,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }

    #[test]
    fn test_empty_filter_selects_everything() {
        assert_eq!(CategoryFilter::default().resolve(), ScannerKind::ALL.to_vec());
        assert_eq!(CategoryFilter::all().resolve().len(), 15);
    }

    #[test]
    fn test_umbrellas_expand_in_registration_order() {
        let filter = CategoryFilter {
            caches: true,
            docker: true,
            ..Default::default()
        };
        assert_eq!(
            filter.resolve(),
            vec![ScannerKind::System, ScannerKind::Browser, ScannerKind::Docker]
        );

        let dev = CategoryFilter {
            dev: true,
            ..Default::default()
        }
        .resolve();
        assert_eq!(dev.len(), 12);
        assert!(!dev.contains(&ScannerKind::Large));
        assert_eq!(dev[0], ScannerKind::Xcode);
    }

    #[test]
    fn test_merges_in_registration_order() {
        let (a, _) = fixed("A", || Ok(vec![target("/a1", "A"), target("/a2", "A")]));
        let (b, _) = fixed("B", || Ok(vec![target("/b1", "B")]));
        for parallel in [false, true] {
            let (a2, _) = fixed("A", || Ok(vec![target("/a1", "A"), target("/a2", "A")]));
            let (b2, _) = fixed("B", || Ok(vec![target("/b1", "B")]));
            let outcome = Engine::new(vec![a2, b2])
                .parallel(parallel)
                .scan(&CancelToken::new())
                .unwrap();
            let paths: Vec<&str> = outcome.targets.iter().map(|t| t.path.as_str()).collect();
            assert_eq!(paths, vec!["/a1", "/a2", "/b1"]);
        }
        assert_eq!(Engine::new(vec![a, b]).scanner_names(), vec!["A", "B"]);
    }

    #[test]
    fn test_failure_is_recorded_not_dropped() {
        let (ok, _) = fixed("Ok", || Ok(vec![target("/ok", "Ok")]));
        let (bad, _) = fixed("Bad", || {
            Err(ScanError::io(
                "/broken",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        });
        let (after, after_calls) = fixed("After", || Ok(vec![target("/after", "After")]));

        let outcome = Engine::new(vec![ok, bad, after])
            .scan(&CancelToken::new())
            .unwrap();
        assert_eq!(outcome.targets.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].scanner, "Bad");
        assert_eq!(after_calls.load(Ordering::SeqCst), 1);

        let err = outcome.into_targets().unwrap_err();
        assert!(matches!(err, ScanError::Scanner { ref scanner, .. } if scanner == "Bad"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancellation_aborts_run() {
        let (first, _) = fixed("First", || Err(ScanError::Cancelled(Cancelled::Requested)));
        let (second, second_calls) = fixed("Second", || Ok(vec![target("/x", "Second")]));

        let err = Engine::new(vec![first, second])
            .scan(&CancelToken::new())
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_token_runs_nothing() {
        let (only, calls) = fixed("Only", || Ok(vec![target("/x", "Only")]));
        let token = CancelToken::new();
        token.cancel();
        let err = Engine::new(vec![only]).scan(&token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exclude_applies_to_all_targets() {
        let (a, _) = fixed("A", || {
            Ok(vec![
                target("/data/keep/one", "A"),
                target("/data/drop/two", "A"),
                target("docker image abc", "A"),
            ])
        });
        let outcome = Engine::new(vec![a])
            .with_exclude(ExcludeSet::new(&["/data/keep/**"]))
            .scan(&CancelToken::new())
            .unwrap();
        let paths: Vec<&str> = outcome.targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths, vec!["/data/drop/two", "docker image abc"]);
    }

    #[test]
    fn test_progress_reports_each_scanner() {
        let (a, _) = fixed("A", || Ok(Vec::new()));
        let (b, _) = fixed("B", || Ok(Vec::new()));
        let seen = std::sync::Mutex::new(Vec::new());
        Engine::new(vec![a, b])
            .scan_with_progress(&CancelToken::new(), |name| {
                seen.lock().unwrap().push(name.to_string())
            })
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["A", "B"]);
    }
}
