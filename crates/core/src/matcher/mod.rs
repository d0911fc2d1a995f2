//! Set matcher - classifies a batch of checksums against the reference index.
//!
//! For every archive that owns at least one queried checksum the result holds
//! the matched and missing checksums plus the reference file name of every
//! record in that archive. Checksums no archive owns end up in `unknown`.

mod types;

pub use types::*;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::reference::ReferenceIndex;
use crate::rom::ArchiveContents;

/// Classifies checksum batches against a shared reference index.
#[derive(Debug, Clone)]
pub struct SetMatcher {
    reference: Arc<ReferenceIndex>,
}

impl SetMatcher {
    pub fn new(reference: Arc<ReferenceIndex>) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &ReferenceIndex {
        &self.reference
    }

    /// Partition `query` into per-archive matched/missing sets and a global
    /// unknown set.
    pub fn match_checksums(&self, query: &BTreeSet<String>) -> Result<MatchResult, MatchError> {
        // Each candidate archive is visited once, however many query
        // checksums point into it.
        let candidates: BTreeSet<&str> = query
            .iter()
            .filter_map(|checksum| self.reference.by_checksum(checksum))
            .flatten()
            .map(|record| record.archive_id.as_str())
            .collect();

        let mut result = MatchResult::default();
        let mut all_matched: BTreeSet<&str> = BTreeSet::new();

        for archive_id in candidates {
            let records =
                self.reference
                    .by_archive(archive_id)
                    .ok_or_else(|| MatchError::Inconsistent {
                        archive_id: archive_id.to_string(),
                        detail: "archive owns a checksum but has no archive records".to_string(),
                    })?;

            let mut romset = RomSetMatch::default();
            for record in records {
                romset
                    .files
                    .insert(record.checksum.clone(), record.file_name.clone());
            }
            // `all_matched` borrows from the query, not from `romset`.
            for checksum in romset.files.keys() {
                match query.get(checksum) {
                    Some(queried) => {
                        romset.matched.insert(checksum.clone());
                        all_matched.insert(queried.as_str());
                    }
                    None => {
                        romset.missing.insert(checksum.clone());
                    }
                }
            }
            result.romsets.insert(archive_id.to_string(), romset);
        }

        result.unknown = query
            .iter()
            .filter(|checksum| !all_matched.contains(checksum.as_str()))
            .cloned()
            .collect();

        debug!(
            queried = query.len(),
            archives = result.romsets.len(),
            unknown = result.unknown.len(),
            "Matched checksum set"
        );
        Ok(result)
    }

    /// Match the checksums of one observed archive.
    pub fn match_contents(&self, contents: &ArchiveContents) -> Result<MatchResult, MatchError> {
        let query: BTreeSet<String> = contents.keys().cloned().collect();
        self.match_checksums(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomRecord;

    fn matcher(records: &[(&str, &str, &str)]) -> SetMatcher {
        let index = ReferenceIndex::build(
            records
                .iter()
                .map(|(c, a, f)| RomRecord::new(*c, *a, *f)),
        );
        SetMatcher::new(Arc::new(index))
    }

    fn query(checksums: &[&str]) -> BTreeSet<String> {
        checksums.iter().map(|c| c.to_string()).collect()
    }

    fn set(checksums: &[&str]) -> BTreeSet<String> {
        query(checksums)
    }

    #[test]
    fn test_complete_archive() {
        let m = matcher(&[("h1", "pacman", "a.bin"), ("h2", "pacman", "b.bin")]);
        let result = m.match_checksums(&query(&["h1", "h2"])).unwrap();

        let pacman = result.romset("pacman").unwrap();
        assert_eq!(pacman.matched, set(&["h1", "h2"]));
        assert!(pacman.missing.is_empty());
        assert!(pacman.is_complete());
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn test_missing_and_files_cover_whole_archive() {
        let m = matcher(&[("h1", "foo", "a.bin"), ("h2", "foo", "clone1/b.bin")]);
        let result = m.match_checksums(&query(&["h1"])).unwrap();

        let foo = result.romset("foo").unwrap();
        assert_eq!(foo.matched, set(&["h1"]));
        assert_eq!(foo.missing, set(&["h2"]));
        assert_eq!(foo.files.get("h2").map(String::as_str), Some("clone1/b.bin"));
        assert!(!foo.is_complete());
    }

    #[test]
    fn test_unknown_checksums() {
        let m = matcher(&[("h1", "pacman", "a.bin")]);
        let result = m.match_checksums(&query(&["h1", "zz"])).unwrap();

        assert_eq!(result.unknown, set(&["zz"]));
        assert_eq!(result.romsets.len(), 1);
    }

    #[test]
    fn test_only_unknown_checksums() {
        let m = matcher(&[("h1", "pacman", "a.bin")]);
        let result = m.match_checksums(&query(&["x", "y"])).unwrap();

        assert!(result.romsets.is_empty());
        assert_eq!(result.unknown, set(&["x", "y"]));
        assert!(result.completed().is_empty());
    }

    #[test]
    fn test_empty_query() {
        let m = matcher(&[("h1", "pacman", "a.bin")]);
        let result = m.match_checksums(&BTreeSet::new()).unwrap();
        assert!(result.romsets.is_empty());
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn test_shared_checksum_matched_under_every_owner() {
        let m = matcher(&[
            ("shared", "pacman", "a.bin"),
            ("h2", "pacman", "b.bin"),
            ("shared", "puckman", "a.bin"),
        ]);
        let result = m.match_checksums(&query(&["shared"])).unwrap();

        assert!(result.romset("pacman").unwrap().matched.contains("shared"));
        assert!(result.romset("puckman").unwrap().matched.contains("shared"));
        assert!(result.unknown.is_empty());

        let completed = result.completed();
        assert_eq!(completed.get("pacman"), Some(&false));
        assert_eq!(completed.get("puckman"), Some(&true));
    }

    #[test]
    fn test_every_query_checksum_accounted_for() {
        let m = matcher(&[
            ("h1", "a", "1"),
            ("h2", "a", "2"),
            ("h2", "b", "2"),
            ("h3", "b", "3"),
            ("h4", "c", "4"),
        ]);
        let q = query(&["h1", "h2", "h3", "u1", "u2"]);
        let result = m.match_checksums(&q).unwrap();

        for checksum in &q {
            let owners = result
                .romsets
                .values()
                .filter(|r| r.matched.contains(checksum))
                .count();
            let unknown = result.unknown.contains(checksum);
            assert!(
                (owners > 0) != unknown,
                "{} must be matched or unknown, not both or neither",
                checksum
            );
            let reference_owners = m.reference().by_checksum(checksum).map_or(0, |r| r.len());
            assert_eq!(owners, reference_owners);
        }
        assert!(result.romset("c").is_none());
    }

    #[test]
    fn test_inconsistent_index_is_an_error() {
        use crate::testing::fixtures::{inconsistent_index, sha1};

        let m = SetMatcher::new(Arc::new(inconsistent_index()));

        let err = m.match_checksums(&query(&[&sha1('4'), &sha1('9')])).unwrap_err();
        assert_eq!(
            err,
            MatchError::Inconsistent {
                archive_id: "ghost".to_string(),
                detail: "archive owns a checksum but has no archive records".to_string(),
            }
        );

        // Queries that never touch the broken archive still work
        let result = m.match_checksums(&query(&[&sha1('4')])).unwrap();
        assert!(result.romset("mame/galaga").unwrap().missing.contains(&sha1('5')));
    }

    #[test]
    fn test_match_contents() {
        let m = matcher(&[("h1", "pacman", "a.bin")]);
        let contents: ArchiveContents = [("h1".to_string(), "whatever.bin".to_string())]
            .into_iter()
            .collect();
        let result = m.match_contents(&contents).unwrap();
        assert!(result.romset("pacman").unwrap().is_complete());
    }

    #[test]
    fn test_serialized_shape() {
        let m = matcher(&[("h1", "foo", "a.bin"), ("h2", "foo", "b.bin")]);
        let result = m.match_checksums(&query(&["h2", "h1", "zz"])).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["romsets"]["foo"]["matched"], serde_json::json!(["h1", "h2"]));
        assert_eq!(json["romsets"]["foo"]["missing"], serde_json::json!([]));
        assert_eq!(json["romsets"]["foo"]["files"]["h1"], "a.bin");
        assert_eq!(json["unknown"], serde_json::json!(["zz"]));
    }
}
