use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::walker::dir_size;
use crate::common::{CancelToken, Cancelled, ScanError};

/// One immediate child of a directory with its full subtree size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceLensNode {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}

/// Size every immediate child of `path`, largest first.
///
/// Directories are walked recursively, in parallel. Ties are broken by
/// name so the listing is stable between runs.
pub fn analyze(path: &Path, cancel: &CancelToken) -> Result<Vec<SpaceLensNode>, ScanError> {
    cancel.check()?;

    let entries: Vec<std::fs::DirEntry> = std::fs::read_dir(path)
        .map_err(|e| ScanError::io(path, e))?
        .filter_map(|e| e.ok())
        .collect();

    let mut nodes = entries
        .par_iter()
        .map(|entry| -> Result<Option<SpaceLensNode>, Cancelled> {
            let child = entry.path();
            // symlink_metadata so links are listed but never followed
            let meta = match std::fs::symlink_metadata(&child) {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("skipping {}: {}", child.display(), e);
                    return Ok(None);
                }
            };
            let size = if meta.is_dir() {
                dir_size(&child, cancel)?
            } else {
                meta.len()
            };
            Ok(Some(SpaceLensNode {
                name: entry.file_name().to_string_lossy().to_string(),
                path: child,
                size,
                is_dir: meta.is_dir(),
            }))
        })
        .collect::<Result<Vec<_>, Cancelled>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    nodes.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
    Ok(nodes)
}

/// Sum of the sizes of `nodes`
pub fn total_size(nodes: &[SpaceLensNode]) -> u64 {
    nodes.iter().map(|n| n.size).sum()
}
