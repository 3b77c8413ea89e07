use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a cancellable operation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    #[error("operation cancelled")]
    Requested,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Shared cancellation signal for one top-level invocation.
///
/// Clones observe the same flag, so a scan, every scanner it runs, and
/// every external command or directory walk those scanners start can be
/// stopped from one place. An optional deadline makes the token fire on
/// its own once the time budget is spent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that fires by itself after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// The cancellation cause, if the token has fired
    pub fn reason(&self) -> Option<Cancelled> {
        if self.inner.cancelled.load(Ordering::SeqCst) {
            return Some(Cancelled::Requested);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Cancelled::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` once the token has fired; use with `?` at loop boundaries.
    pub fn check(&self) -> Result<(), Cancelled> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}
