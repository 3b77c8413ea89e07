use std::path::{Path, PathBuf};

use super::targets::{category, RiskLevel, Target};
use super::walker::{entry_size, mod_time, sorted_children};
use super::{default_home, Scanner};
use crate::common::{CancelToken, ScanError};

/// Per-app data locations under ~/Library, with the label shown for matches
const APP_DATA_LOCATIONS: &[(&str, &str)] = &[
    ("Application Support", "Application support files"),
    ("Preferences", "Preferences"),
    ("Caches", "Cache"),
    ("Containers", "Sandbox container"),
    ("Saved Application State", "Saved window state"),
    ("Logs", "Logs"),
];

/// Finds an application bundle and everything it left under ~/Library
pub struct AppScanner {
    apps_dir: PathBuf,
    library_dir: PathBuf,
    app: Option<String>,
}

impl Default for AppScanner {
    fn default() -> Self {
        Self::new("/Applications", default_home().join("Library"))
    }
}

impl AppScanner {
    pub fn new(apps_dir: impl Into<PathBuf>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            apps_dir: apps_dir.into(),
            library_dir: library_dir.into(),
            app: None,
        }
    }

    /// Which application `scan` looks for
    pub fn with_app(mut self, name: impl Into<String>) -> Self {
        self.app = Some(name.into());
        self
    }

    /// Names of the `.app` bundles in the applications directory, sorted
    pub fn list_apps(&self) -> Vec<String> {
        sorted_children(&self.apps_dir)
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("app"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect()
    }

    /// The bundle itself plus every ~/Library entry whose name contains the
    /// app name or its bundle id as whole words, so "Go" finds
    /// `com.example.go` but not `Google`. Matches are returned regardless
    /// of size.
    pub fn find_related_files(
        &self,
        cancel: &CancelToken,
        app_name: &str,
    ) -> Result<Vec<Target>, ScanError> {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return Ok(Vec::new());
        }

        let bundle = self.apps_dir.join(format!("{}.app", app_name));
        let mut identifiers = vec![name_words(app_name)];
        if let Some(id) = bundle_id(&bundle) {
            identifiers.push(name_words(&id));
        }

        let mut targets = Vec::new();
        if bundle.exists() {
            targets.push(self.target(&bundle, "Application bundle", cancel)?);
        }

        for (dir, label) in APP_DATA_LOCATIONS {
            cancel.check()?;
            for child in sorted_children(&self.library_dir.join(dir)) {
                let words = match child.file_name() {
                    Some(n) => name_words(&n.to_string_lossy()),
                    None => continue,
                };
                if identifiers.iter().any(|id| contains_words(&words, id)) {
                    targets.push(self.target(&child, label, cancel)?);
                }
            }
        }

        Ok(targets)
    }

    fn target(&self, path: &Path, description: &str, cancel: &CancelToken) -> Result<Target, ScanError> {
        Ok(Target {
            path: path.display().to_string(),
            size: entry_size(path, cancel)?,
            category: category::APPLICATIONS.to_string(),
            description: description.to_string(),
            risk: RiskLevel::Dangerous,
            mod_time: mod_time(path),
            is_dir: path.is_dir(),
        })
    }
}

/// Lowercase alphanumeric words of a name: `com.fake.FakeApp.plist` gives
/// `["com", "fake", "fakeapp", "plist"]`
fn name_words(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when `needle` occurs as a run of whole words in `haystack`
fn contains_words(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Read CFBundleIdentifier from an app bundle's Info.plist
fn bundle_id(bundle: &Path) -> Option<String> {
    let info = bundle.join("Contents/Info.plist");
    let value = match plist::Value::from_file(&info) {
        Ok(v) => v,
        Err(e) => {
            if info.exists() {
                tracing::debug!("cannot read {}: {}", info.display(), e);
            }
            return None;
        }
    };
    value
        .as_dictionary()?
        .get("CFBundleIdentifier")?
        .as_string()
        .map(|s| s.to_string())
}

impl Scanner for AppScanner {
    fn name(&self) -> &str {
        category::APPLICATIONS
    }

    fn description(&self) -> &str {
        "Application bundle and leftover data"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Dangerous
    }

    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError> {
        match &self.app {
            Some(app) => self.find_related_files(cancel, app),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, bytes: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_find_related_files() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join("Library");
        write(&library.join("Application Support/FakeApp/config.json"), 256);
        write(&library.join("Preferences/com.fake.FakeApp.plist"), 128);
        write(&library.join("Caches/com.fake.FakeApp/cache.db"), 512);
        write(&library.join("Caches/com.other.Thing/cache.db"), 512);

        let scanner = AppScanner::new(tmp.path().join("Applications"), &library);
        let targets = scanner
            .find_related_files(&CancelToken::new(), "FakeApp")
            .unwrap();

        let paths: Vec<&str> = targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(targets.len(), 3, "{:?}", paths);
        assert_eq!(targets[0].size, 256);
        assert_eq!(targets[0].description, "Application support files");
        assert!(targets.iter().all(|t| t.risk == RiskLevel::Dangerous));
        assert!(!paths.iter().any(|p| p.contains("com.other.Thing")));
    }

    #[test]
    fn test_matches_by_bundle_id_and_keeps_empty_entries() {
        let tmp = TempDir::new().unwrap();
        let apps = tmp.path().join("Applications");
        let contents = apps.join("Editor.app/Contents");
        std::fs::create_dir_all(&contents).unwrap();
        let mut info = plist::Dictionary::new();
        info.insert(
            "CFBundleIdentifier".to_string(),
            plist::Value::String("io.example.writer".to_string()),
        );
        plist::Value::Dictionary(info)
            .to_file_xml(contents.join("Info.plist"))
            .unwrap();

        let library = tmp.path().join("Library");
        std::fs::create_dir_all(library.join("Containers/io.example.writer")).unwrap();

        let targets = AppScanner::new(&apps, &library)
            .with_app("Editor")
            .scan(&CancelToken::new())
            .unwrap();

        assert_eq!(targets.len(), 2);
        assert!(targets[0].path.ends_with("Editor.app"));
        assert_eq!(targets[0].description, "Application bundle");
        assert!(targets[1].path.ends_with("io.example.writer"));
        assert_eq!(targets[1].size, 0);
    }

    #[test]
    fn test_short_name_matches_whole_words_only() {
        let tmp = TempDir::new().unwrap();
        let library = tmp.path().join("Library");
        for rel in [
            "Application Support/Go/settings.json",
            "Application Support/Google/Chrome/prefs",
            "Caches/MongoDB/blob",
            "Caches/com.example.go/blob",
            "Logs/Gopher.log",
            "Preferences/com.example.go.plist",
        ] {
            write(&library.join(rel), 8);
        }

        let targets = AppScanner::new(tmp.path().join("Applications"), &library)
            .find_related_files(&CancelToken::new(), "Go")
            .unwrap();

        let paths: Vec<&str> = targets.iter().map(|t| t.path.as_str()).collect();
        assert_eq!(paths.len(), 3, "{paths:?}");
        assert!(paths[0].ends_with("Application Support/Go"));
        assert!(paths[1].ends_with("Preferences/com.example.go.plist"));
        assert!(paths[2].ends_with("Caches/com.example.go"));
    }

    #[test]
    fn test_word_matching() {
        let words = name_words("com.Fake.FakeApp-Helper.plist");
        assert_eq!(words, vec!["com", "fake", "fakeapp", "helper", "plist"]);
        assert!(contains_words(&words, &name_words("FakeApp")));
        assert!(contains_words(&words, &name_words("com.fake")));
        assert!(!contains_words(&words, &name_words("Fake App")));
        assert!(!contains_words(&words, &name_words("app")));
        assert!(!contains_words(&words, &[]));
    }

    #[test]
    fn test_list_apps() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("TestApp.app")).unwrap();
        std::fs::create_dir_all(tmp.path().join("Utilities")).unwrap();

        let scanner = AppScanner::new(tmp.path(), tmp.path().join("Library"));
        assert_eq!(scanner.list_apps(), vec!["TestApp".to_string()]);
    }

    #[test]
    fn test_scan_without_app_is_empty() {
        let tmp = TempDir::new().unwrap();
        let scanner = AppScanner::new(tmp.path(), tmp.path());
        assert!(scanner.scan(&CancelToken::new()).unwrap().is_empty());
    }
}
