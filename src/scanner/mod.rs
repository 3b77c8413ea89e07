//! Scanners discover reclaimable targets, one category each.
//!
//! Every scanner implements [`Scanner`]. The [`engine`] picks the set to
//! run for a category filter and merges their results in a fixed order.

pub mod apps;
pub mod browser;
pub mod devcache;
pub mod docker;
pub mod engine;
pub mod homebrew;
pub mod large;
pub mod simulator;
pub mod spacelens;
pub mod system;
pub mod targets;
pub mod walker;
pub mod xcode;

use std::path::PathBuf;

use crate::common::{CancelToken, ScanError};

pub use engine::{CategoryFilter, Engine, ScanOutcome, ScannerFailure, ScannerKind};
pub use targets::{Resource, RiskLevel, Target};

/// A source of reclaimable targets for one category.
///
/// `scan` returns everything currently discoverable, or fails. A missing
/// tool or service is not a failure: the scanner returns an empty list.
/// Cancellation of `cancel` must surface as an error for which
/// [`ScanError::is_cancelled`] is true.
pub trait Scanner: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn risk(&self) -> RiskLevel;
    fn scan(&self, cancel: &CancelToken) -> Result<Vec<Target>, ScanError>;
}

/// The user's home directory, or `/` when it cannot be determined
pub(crate) fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}
