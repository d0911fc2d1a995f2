//! Mock hasher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::hasher::{ArchiveHasher, HasherError};
use crate::rom::ArchiveContents;

/// Mock implementation of the ArchiveHasher trait.
///
/// Contents are configured per archive file name (`pacman.7z`), so tests do
/// not need to know where the scan root lives.
///
/// # Example
///
/// ```rust,ignore
/// use romcheck_core::testing::MockHasher;
///
/// let hasher = MockHasher::new();
/// hasher.set_contents("pacman.7z", contents).await;
///
/// let hashed = hasher.hash_archive(Path::new("/roms/mame/pacman.7z")).await?;
/// assert_eq!(hasher.hash_count().await, 1);
/// ```
#[derive(Debug, Default)]
pub struct MockHasher {
    /// Configured contents by archive file name.
    contents: Arc<RwLock<HashMap<String, ArchiveContents>>>,
    /// Archive file names that fail to hash.
    failing: Arc<RwLock<Vec<String>>>,
    /// Every path passed to `hash_archive`.
    hashed: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockHasher {
    /// Create a new mock hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contents returned for an archive file name.
    pub async fn set_contents(&self, file_name: impl Into<String>, contents: ArchiveContents) {
        self.contents.write().await.insert(file_name.into(), contents);
    }

    /// Make hashing the given archive file name fail.
    pub async fn set_failing(&self, file_name: impl Into<String>) {
        self.failing.write().await.push(file_name.into());
    }

    /// Paths hashed so far.
    pub async fn hashed_paths(&self) -> Vec<PathBuf> {
        self.hashed.read().await.clone()
    }

    /// Number of `hash_archive` calls.
    pub async fn hash_count(&self) -> usize {
        self.hashed.read().await.len()
    }
}

#[async_trait]
impl ArchiveHasher for MockHasher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn hash_archive(&self, path: &Path) -> Result<ArchiveContents, HasherError> {
        self.hashed.write().await.push(path.to_path_buf());

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if self.failing.read().await.contains(&file_name) {
            return Err(HasherError::extraction_failed(
                format!("mock failure for {}", file_name),
                None,
            ));
        }

        Ok(self
            .contents
            .read()
            .await
            .get(&file_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn validate(&self) -> Result<(), HasherError> {
        Ok(())
    }
}
