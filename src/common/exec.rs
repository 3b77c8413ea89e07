use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::cancel::CancelToken;
use super::errors::ExecError;

/// How often a running child is polled for exit or cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs external tools on behalf of scanners.
///
/// Scanners hold an `Arc<dyn CommandRunner>` so tests can substitute
/// canned output instead of spawning `docker` or `xcrun`.
pub trait CommandRunner: Send + Sync {
    /// Locate an executable on PATH
    fn look_path(&self, program: &str) -> Option<PathBuf>;

    /// Run a program to completion and return its stdout.
    ///
    /// Must return `ExecError::Cancelled` when `cancel` fires before the
    /// program exits.
    fn run(&self, cancel: &CancelToken, program: &str, args: &[&str]) -> Result<Vec<u8>, ExecError>;
}

/// Production runner backed by `std::process::Command`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn look_path(&self, program: &str) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn run(&self, cancel: &CancelToken, program: &str, args: &[&str]) -> Result<Vec<u8>, ExecError> {
        cancel.check()?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound(program.to_string())
                } else {
                    ExecError::Io {
                        program: program.to_string(),
                        source: e,
                    }
                }
            })?;

        // Drain pipes on helper threads so a chatty child cannot block on a full pipe
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    return Err(ExecError::Io {
                        program: program.to_string(),
                        source: e,
                    })
                }
            }

            if let Some(reason) = cancel.reason() {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!("{} killed: {}", program, reason);
                return Err(ExecError::Cancelled(reason));
            }

            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::TimedOut {
                    program: program.to_string(),
                    after: self.timeout,
                });
            }

            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_reader.map(join_reader).unwrap_or_default();
        let stderr = stderr_reader.map(join_reader).unwrap_or_default();

        if status.success() {
            Ok(stdout)
        } else {
            Err(ExecError::Failed {
                program: program.to_string(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            })
        }
    }
}

/// Runner backed by a closure, for substituting canned tool output.
///
/// `installed` controls what `look_path` reports for every program.
pub struct FnRunner<F> {
    installed: bool,
    run: F,
}

impl<F> FnRunner<F>
where
    F: Fn(&CancelToken, &str, &[&str]) -> Result<Vec<u8>, ExecError> + Send + Sync,
{
    pub fn new(run: F) -> Self {
        Self { installed: true, run }
    }

    /// Every program reports as missing from PATH
    pub fn not_installed(run: F) -> Self {
        Self {
            installed: false,
            run,
        }
    }
}

impl<F> CommandRunner for FnRunner<F>
where
    F: Fn(&CancelToken, &str, &[&str]) -> Result<Vec<u8>, ExecError> + Send + Sync,
{
    fn look_path(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .then(|| PathBuf::from("/usr/local/bin").join(program))
    }

    fn run(&self, cancel: &CancelToken, program: &str, args: &[&str]) -> Result<Vec<u8>, ExecError> {
        (self.run)(cancel, program, args)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: std::thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}
