//! 7-Zip based hasher implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::HasherConfig;
use crate::rom::ArchiveContents;
use crate::scan::visible_files;

use super::error::HasherError;
use super::ArchiveHasher;

static SHA1_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Fa-f0-9]{40}").expect("sha1 pattern is valid"));

/// 7-Zip based hasher implementation.
pub struct SevenZipHasher {
    config: HasherConfig,
    scratch_counter: AtomicU64,
}

impl SevenZipHasher {
    /// Creates a new hasher with the given configuration.
    pub fn new(config: HasherConfig) -> Self {
        Self {
            config,
            scratch_counter: AtomicU64::new(0),
        }
    }

    /// Creates a hasher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(HasherConfig::default())
    }

    fn build_extract_args(source: &Path, destination: &Path) -> Vec<String> {
        vec![
            "x".to_string(),
            "-y".to_string(),
            format!("-o{}", destination.to_string_lossy()),
            source.to_string_lossy().to_string(),
        ]
    }

    fn build_hash_args(file: &Path) -> Vec<String> {
        vec![
            "h".to_string(),
            "-scrcSHA1".to_string(),
            file.to_string_lossy().to_string(),
        ]
    }

    /// First SHA-1 in `7z h` output, lowercased.
    fn parse_sha1(output: &str) -> Option<String> {
        SHA1_HEX.find(output).map(|m| m.as_str().to_lowercase())
    }

    fn scratch_dir(&self) -> PathBuf {
        let n = self.scratch_counter.fetch_add(1, Ordering::Relaxed);
        self.config
            .temp_dir
            .join(format!("extract-{}-{}", std::process::id(), n))
    }

    fn map_spawn_error(&self, e: std::io::Error) -> HasherError {
        if e.kind() == std::io::ErrorKind::NotFound {
            HasherError::SevenZipNotFound {
                path: self.config.seven_zip_path.clone(),
            }
        } else {
            HasherError::Io(e)
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output, HasherError> {
        let child = Command::new(&self.config.seven_zip_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        match timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(output) => Ok(output?),
            Err(_) => Err(HasherError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }),
        }
    }

    async fn extract(&self, source: &Path, destination: &Path) -> Result<(), HasherError> {
        let output = self
            .run(&Self::build_extract_args(source, destination))
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HasherError::extraction_failed(
                format!("7z exited with code: {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }
        Ok(())
    }

    async fn hash_file(&self, file: &Path) -> Result<String, HasherError> {
        let output = self.run(&Self::build_hash_args(file)).await?;
        Self::parse_sha1(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            HasherError::HashFailed {
                path: file.to_path_buf(),
            }
        })
    }

    async fn hash_extracted(&self, root: &Path) -> Result<ArchiveContents, HasherError> {
        let walk_root = root.to_path_buf();
        let files = tokio::task::spawn_blocking(move || visible_files(&walk_root))
            .await
            .map_err(|e| HasherError::Io(std::io::Error::other(e)))?;

        let mut contents = ArchiveContents::new();
        for (path, relative) in files {
            let checksum = self.hash_file(&path).await?;
            if let Some(previous) = contents.insert(checksum.clone(), relative) {
                debug!(checksum = %checksum, previous = %previous, "Duplicate content inside archive");
            }
        }
        Ok(contents)
    }
}

#[async_trait]
impl ArchiveHasher for SevenZipHasher {
    fn name(&self) -> &str {
        "7z"
    }

    async fn hash_archive(&self, path: &Path) -> Result<ArchiveContents, HasherError> {
        if !path.is_file() {
            return Err(HasherError::ArchiveNotFound {
                path: path.to_path_buf(),
            });
        }

        let scratch = self.scratch_dir();
        tokio::fs::create_dir_all(&scratch).await?;

        let result = match self.extract(path, &scratch).await {
            Ok(()) => self.hash_extracted(&scratch).await,
            Err(e) => Err(e),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            warn!(path = %scratch.display(), error = %e, "Failed to clean up scratch folder");
        }

        if let Ok(contents) = &result {
            debug!(archive = %path.display(), files = contents.len(), "Hashed archive");
        }
        result
    }

    async fn validate(&self) -> Result<(), HasherError> {
        Command::new(&self.config.seven_zip_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        Ok(())
    }
}
