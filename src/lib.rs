//! # macbroom
//!
//! Finds reclaimable disk space on a developer's Mac and cleans it.
//!
//! - **Scan**: a fixed set of category scanners (system and browser caches,
//!   Xcode, Docker, simulators, language toolchains, large old files)
//!   produce uniform [`scanner::Target`]s under one cancellation token.
//! - **Diff**: each complete scan is saved as a [`snapshot::Snapshot`] and
//!   compared with the previous one.
//! - **Clean**: approved targets go to the Trash (or are deleted), and the
//!   outcome is appended to the [`history`] ledger.
//! - **Space Lens**: an interactive disk-usage browser.

pub mod cleaner;
pub mod cli;
pub mod common;
pub mod history;
pub mod scanner;
pub mod snapshot;
pub mod tui;
