//! Types for set matching.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How one reference archive relates to a checksum query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomSetMatch {
    /// Reference checksums present in the query.
    pub matched: BTreeSet<String>,
    /// Reference checksums absent from the query.
    pub missing: BTreeSet<String>,
    /// Reference file name of every checksum in the archive.
    pub files: BTreeMap<String, String>,
}

impl RomSetMatch {
    /// Nothing missing.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Output of [`SetMatcher::match_checksums`](super::SetMatcher::match_checksums).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Every archive owning at least one queried checksum.
    pub romsets: BTreeMap<String, RomSetMatch>,
    /// Queried checksums no reference archive owns.
    pub unknown: BTreeSet<String>,
}

impl MatchResult {
    pub fn romset(&self, archive_id: &str) -> Option<&RomSetMatch> {
        self.romsets.get(archive_id)
    }

    /// Archive id -> complete, for every archive touched by the query.
    pub fn completed(&self) -> BTreeMap<&str, bool> {
        self.romsets
            .iter()
            .map(|(id, romset)| (id.as_str(), romset.is_complete()))
            .collect()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    /// The checksum and archive views of the reference index disagree.
    #[error("Reference index inconsistent for archive {archive_id}: {detail}")]
    Inconsistent { archive_id: String, detail: String },
}
