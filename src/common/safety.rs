use std::path::Path;

/// Paths that must NEVER be deleted under any circumstances.
/// This is a critical safety net against bugs in scanners.
const PROTECTED_PATHS: &[&str] = &[
    "/",
    "/System",
    "/Applications",
    "/Users",
    "/Library",
    "/usr",
    "/bin",
    "/sbin",
    "/var",
    "/etc",
    "/opt",
    "/private",
    "/cores",
    "/Volumes",
];

/// Paths under home that must never be deleted entirely
const PROTECTED_HOME_DIRS: &[&str] = &[
    "Desktop",
    "Documents",
    "Downloads",
    "Pictures",
    "Music",
    "Movies",
    "Library",
    "Library/Caches",
    "Library/Application Support",
    "Library/Preferences",
    "Applications",
    ".Trash",
    ".ssh",
    ".gnupg",
];

/// Check if a path is protected and should NEVER be deleted
pub fn is_protected(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    let trimmed = if path_str.len() > 1 {
        path_str.trim_end_matches('/')
    } else {
        &path_str
    };

    if PROTECTED_PATHS.iter().any(|p| trimmed == *p) {
        return true;
    }

    if let Some(home) = dirs::home_dir() {
        if Path::new(trimmed) == home {
            return true;
        }
        if PROTECTED_HOME_DIRS
            .iter()
            .any(|dir| Path::new(trimmed) == home.join(dir))
        {
            return true;
        }
    }

    false
}
