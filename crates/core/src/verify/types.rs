//! Types for archive verification.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rom::RomRecord;

/// A file whose observed name differs from the reference name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRename {
    pub current: String,
    pub expected: String,
}

/// A file that belongs in a different archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomMove {
    /// Where the file is now.
    pub current: RomRecord,
    /// Where the reference says it belongs.
    pub suggested: RomRecord,
}

/// Everything wrong with one archive. Empty sections are left out of the
/// serialized form; a clean archive serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPlan {
    /// The archive's name is not one the reference knows for its contents.
    /// Holds the complete candidate archives, possibly none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_archive: Option<BTreeSet<String>>,

    /// Set when the single complete candidate was assumed to be the real
    /// name; every section below is then relative to that archive and
    /// provisional until the rename happens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumed_archive: Option<String>,

    /// checksum -> current/expected file name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rename_files: BTreeMap<String, FileRename>,

    /// Missing files of clone variants: clone -> file names within the clone.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub missing_clones: BTreeMap<String, BTreeSet<String>>,

    /// Missing files of the archive itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_core: Option<BTreeSet<String>>,

    /// Checksums the reference has never seen.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unknown: BTreeSet<String>,

    /// Files recognised as belonging to other, incomplete archives.
    #[serde(rename = "move", default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<RomMove>,
}

impl CorrectionPlan {
    /// No findings at all.
    pub fn is_clean(&self) -> bool {
        self.rename_archive.is_none()
            && self.assumed_archive.is_none()
            && self.rename_files.is_empty()
            && self.missing_clones.is_empty()
            && self.missing_core.is_none()
            && self.unknown.is_empty()
            && self.moves.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// The match result references a checksum its archive has no file for.
    #[error("Match result inconsistent for archive {archive_id}: no reference file for {checksum}")]
    Inconsistent { archive_id: String, checksum: String },
}
