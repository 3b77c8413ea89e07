use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use super::cancel::Cancelled;

// Typed errors for the scan pipeline.
// We use `anyhow` at the top level for CLI error handling,
// but these typed errors let callers tell cancellation apart from
// genuine failures.

/// Failure of an external command invocation
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The program is not on PATH
    #[error("'{0}' is not installed")]
    NotFound(String),

    /// The program ran but exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The per-command time budget ran out
    #[error("{program} timed out after {}s", after.as_secs())]
    TimedOut { program: String, after: Duration },

    /// The shared cancellation signal fired while the command ran
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Spawning or talking to the child failed
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled(_))
    }
}

/// Failure of a scanner or of the engine driving them
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool}: {source}")]
    Tool {
        tool: String,
        #[source]
        source: ExecError,
    },

    /// A scanner failed for a reason other than cancellation
    #[error("scanner '{scanner}' failed: {source}")]
    Scanner {
        scanner: String,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    /// True when the shared cancellation signal caused this error,
    /// however deeply it is wrapped.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ScanError::Cancelled(_) => true,
            ScanError::Tool { source, .. } => source.is_cancelled(),
            ScanError::Scanner { source, .. } => source.is_cancelled(),
            ScanError::Io { .. } => false,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ExecError> for ScanError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Cancelled(c) => ScanError::Cancelled(c),
            other => ScanError::Tool {
                tool: match &other {
                    ExecError::NotFound(p) => p.clone(),
                    ExecError::Failed { program, .. }
                    | ExecError::TimedOut { program, .. }
                    | ExecError::Io { program, .. } => program.clone(),
                    ExecError::Cancelled(_) => String::new(),
                },
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_survives_wrapping() {
        let inner = ScanError::Cancelled(Cancelled::Requested);
        let wrapped = ScanError::Scanner {
            scanner: "Docker".into(),
            source: Box::new(inner),
        };
        assert!(wrapped.is_cancelled());
    }

    #[test]
    fn test_exec_cancel_maps_to_scan_cancel() {
        let err: ScanError = ExecError::Cancelled(Cancelled::DeadlineExceeded).into();
        assert!(matches!(err, ScanError::Cancelled(Cancelled::DeadlineExceeded)));
    }

    #[test]
    fn test_timeout_is_not_cancellation() {
        let err: ScanError = ExecError::TimedOut {
            program: "docker".into(),
            after: Duration::from_secs(30),
        }
        .into();
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("docker"));
    }
}
