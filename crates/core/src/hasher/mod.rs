//! Archive hashing.
//!
//! An [`ArchiveHasher`] turns one archive file on disk into its contents
//! (checksum -> file name). [`SevenZipHasher`] does it out-of-process: the
//! archive is extracted into a scratch folder and every visible file is
//! hashed with `7z h -scrcSHA1`.

mod error;
mod seven_zip;

pub use error::HasherError;
pub use seven_zip::SevenZipHasher;

use async_trait::async_trait;
use std::path::Path;

use crate::rom::ArchiveContents;

/// Something that can list the checksums inside an archive.
#[async_trait]
pub trait ArchiveHasher: Send + Sync {
    /// Returns the name of this hasher implementation.
    fn name(&self) -> &str;

    /// Hash every file inside the archive at `path`.
    async fn hash_archive(&self, path: &Path) -> Result<ArchiveContents, HasherError>;

    /// Check the external tooling is usable.
    async fn validate(&self) -> Result<(), HasherError>;
}
