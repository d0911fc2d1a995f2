use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::rom::{ArchiveContents, RomRecord};

/// Immutable checksum/archive index over a set of rom records.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    by_checksum: HashMap<String, BTreeSet<RomRecord>>,
    by_archive: HashMap<String, BTreeSet<RomRecord>>,
    record_count: usize,
}

/// Index size summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub checksum_count: usize,
    pub archive_count: usize,
    pub record_count: usize,
}

impl ReferenceIndex {
    /// Build the index. Duplicate triples collapse into one record.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RomRecord>,
    {
        let mut by_checksum: HashMap<String, BTreeSet<RomRecord>> = HashMap::new();
        let mut by_archive: HashMap<String, BTreeSet<RomRecord>> = HashMap::new();
        let mut record_count = 0;

        for record in records {
            let inserted = by_archive
                .entry(record.archive_id.clone())
                .or_default()
                .insert(record.clone());
            if !inserted {
                continue;
            }
            by_checksum
                .entry(record.checksum.clone())
                .or_default()
                .insert(record);
            record_count += 1;
        }

        Self {
            by_checksum,
            by_archive,
            record_count,
        }
    }

    /// Index over views supplied as-is, with no cross-checking. `build` never
    /// produces views that disagree; this exists for the test fixtures.
    pub(crate) fn from_views(
        by_checksum: HashMap<String, BTreeSet<RomRecord>>,
        by_archive: HashMap<String, BTreeSet<RomRecord>>,
    ) -> Self {
        let record_count = by_archive.values().map(BTreeSet::len).sum();
        Self {
            by_checksum,
            by_archive,
            record_count,
        }
    }

    /// All records carrying this checksum, across every archive.
    pub fn by_checksum(&self, checksum: &str) -> Option<&BTreeSet<RomRecord>> {
        self.by_checksum.get(checksum)
    }

    /// All records of one archive.
    pub fn by_archive(&self, archive_id: &str) -> Option<&BTreeSet<RomRecord>> {
        self.by_archive.get(archive_id)
    }

    /// Reference contents of one archive as checksum -> file name.
    pub fn archive_files(&self, archive_id: &str) -> Option<ArchiveContents> {
        self.by_archive(archive_id).map(|records| {
            records
                .iter()
                .map(|r| (r.checksum.clone(), r.file_name.clone()))
                .collect()
        })
    }

    /// Archive ids, sorted.
    pub fn archive_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_archive.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Every unique record, grouped by archive.
    pub fn records(&self) -> impl Iterator<Item = &RomRecord> {
        self.by_archive.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    pub fn stats(&self) -> ReferenceStats {
        ReferenceStats {
            checksum_count: self.by_checksum.len(),
            archive_count: self.by_archive.len(),
            record_count: self.record_count,
        }
    }
}

impl FromIterator<RomRecord> for ReferenceIndex {
    fn from_iter<T: IntoIterator<Item = RomRecord>>(iter: T) -> Self {
        Self::build(iter)
    }
}
