//! Types for the archive catalog.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rom::ArchiveContents;

/// Opaque "last seen" marker for an archive file. The scanner stores the
/// file's mtime in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModifiedMarker(pub i64);

impl ModifiedMarker {
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        };
        Self(millis)
    }
}

/// One catalogued archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Archive identifier.
    pub archive_id: String,
    /// Observed contents: checksum -> file name as extracted.
    pub files: ArchiveContents,
    /// Marker of the archive file when it was last hashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<ModifiedMarker>,
    /// When the contents were last replaced.
    pub updated_at: DateTime<Utc>,
}

/// Catalog statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Catalogued archives.
    pub archive_count: usize,
    /// Distinct checksums across all archives.
    pub checksum_count: usize,
    /// Total catalogued files.
    pub file_count: usize,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Database(e.to_string())
    }
}
