use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::catalog::ModifiedMarker;

/// An archive file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedArchive {
    /// Relative path without extension, `/`-separated.
    pub archive_id: String,
    /// Relative path including extension, `/`-separated.
    pub relative_path: String,
    /// Absolute location on disk.
    #[serde(skip)]
    pub path: PathBuf,
    pub last_modified: ModifiedMarker,
}

/// Result of asking the scanner for work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextArchive {
    pub archive: Option<ScannedArchive>,
    /// Changed archives still queued after this one.
    pub remaining: usize,
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
