use thiserror::Error;

use crate::catalog::CatalogError;
use crate::scan::ScanError;

/// What a single worker step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing changed on disk.
    Idle,
    /// An archive was hashed and its catalog entry replaced.
    Catalogued {
        archive_id: String,
        files: usize,
        remaining: usize,
    },
    /// Hashing failed; the archive is retried after the next rescan.
    Failed { archive_id: String, error: String },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Internal error: {0}")]
    Internal(String),
}
