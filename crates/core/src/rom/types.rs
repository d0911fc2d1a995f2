//! Types for rom records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contents of one archive: checksum -> file name inside the archive.
pub type ArchiveContents = BTreeMap<String, String>;

/// `<sha1> <archive>:<file>`. The archive part is greedy, so the last `:`
/// separates the file name.
static ROM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<checksum>[0-9A-Fa-f]{40}) (?P<archive>.+):(?P<file>.+)$")
        .expect("rom line pattern is valid")
});

/// A single known file: its checksum, the archive it belongs to and its
/// path inside that archive.
///
/// The file name may carry a leading clone folder (`clone/file.bin`) for
/// files that only exist in a variant of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RomRecord {
    /// Content hash (lowercase hex).
    pub checksum: String,
    /// Logical archive name, may contain `/` for hierarchical collections.
    pub archive_id: String,
    /// Path of the file inside the archive.
    pub file_name: String,
}

impl RomRecord {
    pub fn new(
        checksum: impl Into<String>,
        archive_id: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            checksum: checksum.into(),
            archive_id: archive_id.into(),
            file_name: file_name.into(),
        }
    }

    /// Parse one line of the flat reference format.
    pub fn parse(line: &str) -> Result<Self, RomParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = ROM_LINE
            .captures(line)
            .ok_or_else(|| RomParseError::Malformed(line.to_string()))?;

        Ok(Self {
            checksum: caps["checksum"].to_lowercase(),
            archive_id: caps["archive"].to_string(),
            file_name: caps["file"].to_string(),
        })
    }
}

impl FromStr for RomRecord {
    type Err = RomParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RomRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.checksum, self.archive_id, self.file_name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RomParseError {
    #[error("Malformed rom line: {0:?}")]
    Malformed(String),
}
