use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while hashing an archive.
#[derive(Debug, Error)]
pub enum HasherError {
    /// 7-Zip binary not found.
    #[error("7-Zip not found at path: {}", .path.display())]
    SevenZipNotFound { path: PathBuf },

    /// Archive file not found.
    #[error("Archive not found: {}", .path.display())]
    ArchiveNotFound { path: PathBuf },

    /// Extraction exited with an error.
    #[error("Extraction failed: {reason}")]
    ExtractionFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// No checksum in the hash output of a file.
    #[error("Unable to hash {}", .path.display())]
    HashFailed { path: PathBuf },

    /// A 7-Zip invocation ran past the configured limit.
    #[error("7-Zip timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HasherError {
    pub fn extraction_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether trying the same archive again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}
