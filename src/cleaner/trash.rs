use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::common::safety::is_protected;
use crate::common::{CancelToken, CommandRunner, ExecError, SystemRunner};
use crate::scanner::targets::Resource;
use crate::scanner::Target;

/// Why one target could not be removed
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error("refusing to remove protected path '{}'", .0.display())]
    Protected(PathBuf),

    #[error("'{}' no longer exists", .0.display())]
    Missing(PathBuf),

    #[error("failed to remove '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl CleanError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CleanError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Removes one target at a time.
///
/// `path` is a target's path: a filesystem path or a synthetic id such as
/// `docker image <id>`.
pub trait Trash {
    fn move_to_trash(&self, path: &str) -> Result<(), CleanError>;
    fn permanent_delete(&self, path: &str) -> Result<(), CleanError>;
}

/// Moves files into the user's Trash and drives the Docker and simctl
/// CLIs for synthetic targets.
pub struct SystemTrash {
    trash_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    cancel: CancelToken,
}

impl Default for SystemTrash {
    fn default() -> Self {
        Self::new(crate::scanner::default_home().join(".Trash"))
    }
}

impl SystemTrash {
    pub fn new(trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            trash_dir: trash_dir.into(),
            runner: Arc::new(SystemRunner::default()),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Token passed to every external command
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Remove a resource that has no file to move
    fn remove_synthetic(&self, resource: Resource<'_>) -> Result<(), CleanError> {
        let (program, args): (&str, Vec<&str>) = match resource {
            Resource::DockerImage(id) => ("docker", vec!["rmi", id]),
            Resource::DockerBuildCache => ("docker", vec!["builder", "prune", "-f"]),
            Resource::Simulator(udid) => ("xcrun", vec!["simctl", "delete", udid]),
            Resource::File(_) => return Ok(()),
        };
        tracing::debug!("running {} {}", program, args.join(" "));
        self.runner.run(&self.cancel, program, &args)?;
        Ok(())
    }

    /// A name inside the trash directory that is not taken yet
    fn trash_destination(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "item".to_string());
        let mut candidate = self.trash_dir.join(&name);
        let mut n = 2;
        while candidate.symlink_metadata().is_ok() {
            candidate = self.trash_dir.join(format!("{} {}", name, n));
            n += 1;
        }
        candidate
    }
}

fn check_removable(path: &Path) -> Result<(), CleanError> {
    if is_protected(path) {
        return Err(CleanError::Protected(path.to_path_buf()));
    }
    if path.symlink_metadata().is_err() {
        return Err(CleanError::Missing(path.to_path_buf()));
    }
    Ok(())
}

impl Trash for SystemTrash {
    fn move_to_trash(&self, path: &str) -> Result<(), CleanError> {
        let file = match Target::resource_of(path) {
            Resource::File(p) => p,
            synthetic => return self.remove_synthetic(synthetic),
        };
        check_removable(file)?;

        std::fs::create_dir_all(&self.trash_dir).map_err(|e| CleanError::io(&self.trash_dir, e))?;
        let dest = self.trash_destination(file);

        // Rename first (fast, same filesystem), copy across volumes otherwise
        match std::fs::rename(file, &dest) {
            Ok(()) => return Ok(()),
            Err(e) if crosses_devices(&e) => {
                tracing::debug!("{} is on another volume, copying to Trash", file.display());
            }
            Err(e) => return Err(CleanError::io(file, e)),
        }
        if file.is_dir() {
            copy_dir_recursive(file, &dest).map_err(|e| CleanError::io(file, e))?;
            std::fs::remove_dir_all(file).map_err(|e| CleanError::io(file, e))?;
        } else {
            std::fs::copy(file, &dest).map_err(|e| CleanError::io(file, e))?;
            std::fs::remove_file(file).map_err(|e| CleanError::io(file, e))?;
        }
        Ok(())
    }

    fn permanent_delete(&self, path: &str) -> Result<(), CleanError> {
        let file = match Target::resource_of(path) {
            Resource::File(p) => p,
            synthetic => return self.remove_synthetic(synthetic),
        };
        check_removable(file)?;

        let meta = file.symlink_metadata().map_err(|e| CleanError::io(file, e))?;
        if meta.is_dir() {
            std::fs::remove_dir_all(file).map_err(|e| CleanError::io(file, e))
        } else {
            std::fs::remove_file(file).map_err(|e| CleanError::io(file, e))
        }
    }
}

/// `rename(2)` reports EXDEV on Linux and macOS when source and destination
/// live on different filesystems
const EXDEV: i32 = 18;

fn crosses_devices(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(EXDEV)
}

/// Recursively copy a directory
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
