//! In-memory catalog store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use super::{CatalogEntry, CatalogError, CatalogPersistence, CatalogStats, ModifiedMarker};
use crate::rom::{ArchiveContents, RomRecord};

/// Shared, mutable catalog of observed archive contents.
///
/// `entries` is the authoritative record store; `by_checksum` is derived from
/// it. Both live under one lock so every replace/remove (purge of the old
/// records plus insert of the new ones) is observed as a single change.
#[derive(Debug, Default)]
pub struct CatalogStore {
    inner: RwLock<CatalogInner>,
}

#[derive(Debug, Default)]
struct CatalogInner {
    entries: HashMap<String, CatalogEntry>,
    by_checksum: HashMap<String, BTreeSet<RomRecord>>,
}

impl CatalogInner {
    /// Drop every derived record that belongs to `archive_id`.
    fn retract(&mut self, archive_id: &str, files: &ArchiveContents) {
        for checksum in files.keys() {
            if let Some(records) = self.by_checksum.get_mut(checksum) {
                records.retain(|r| r.archive_id != archive_id);
                if records.is_empty() {
                    self.by_checksum.remove(checksum);
                }
            }
        }
    }

    fn index(&mut self, archive_id: &str, files: &ArchiveContents) {
        for (checksum, file_name) in files {
            self.by_checksum
                .entry(checksum.clone())
                .or_default()
                .insert(RomRecord::new(checksum, archive_id, file_name));
        }
    }

    /// The entry that replacing `archive_id` with `files` would produce.
    fn next_entry(
        &self,
        archive_id: &str,
        files: ArchiveContents,
        marker: Option<ModifiedMarker>,
    ) -> CatalogEntry {
        let last_modified = marker.or_else(|| {
            self.entries
                .get(archive_id)
                .and_then(|e| e.last_modified)
        });
        CatalogEntry {
            archive_id: archive_id.to_string(),
            files,
            last_modified,
            updated_at: Utc::now(),
        }
    }

    fn take(&mut self, archive_id: &str) -> Option<CatalogEntry> {
        let removed = self.entries.remove(archive_id)?;
        self.retract(archive_id, &removed.files);
        Some(removed)
    }

    fn insert(&mut self, entry: CatalogEntry) {
        if let Some(old) = self.entries.remove(&entry.archive_id) {
            self.retract(&old.archive_id, &old.files);
        }
        self.index(&entry.archive_id, &entry.files);
        self.entries.insert(entry.archive_id.clone(), entry);
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Populate from persisted entries, replacing any existing entry with the
    /// same id.
    pub fn load<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = CatalogEntry>,
    {
        let mut inner = self.write();
        let mut count = 0;
        for entry in entries {
            inner.insert(entry);
            count += 1;
        }
        count
    }

    pub fn get(&self, archive_id: &str) -> Option<CatalogEntry> {
        self.read().entries.get(archive_id).cloned()
    }

    /// Replace an archive's contents wholesale, creating the entry if needed.
    /// The modification marker is kept. Returns the new entry.
    pub fn replace(&self, archive_id: &str, files: ArchiveContents) -> CatalogEntry {
        let mut inner = self.write();
        let entry = inner.next_entry(archive_id, files, None);
        inner.insert(entry.clone());
        debug!(
            archive = archive_id,
            files = entry.files.len(),
            "Catalog entry replaced"
        );
        entry
    }

    /// [`replace`](Self::replace) plus an optional new marker, written to
    /// `persistence` before it is applied in memory. The write lock is held
    /// across both steps, so commits for one archive reach disk and memory in
    /// the same order. On a persistence error the store is left untouched.
    pub fn commit_replace(
        &self,
        archive_id: &str,
        files: ArchiveContents,
        marker: Option<ModifiedMarker>,
        persistence: &dyn CatalogPersistence,
    ) -> Result<CatalogEntry, CatalogError> {
        let mut inner = self.write();
        let entry = inner.next_entry(archive_id, files, marker);
        persistence.save_entry(&entry)?;
        inner.insert(entry.clone());
        debug!(
            archive = archive_id,
            files = entry.files.len(),
            "Catalog entry committed"
        );
        Ok(entry)
    }

    /// Delete an archive's entry. Unknown ids are a no-op.
    pub fn remove(&self, archive_id: &str) -> Option<CatalogEntry> {
        let removed = self.write().take(archive_id)?;
        debug!(archive = archive_id, "Catalog entry removed");
        Some(removed)
    }

    /// [`remove`](Self::remove), deleting from `persistence` first. Unknown
    /// ids touch neither.
    pub fn commit_remove(
        &self,
        archive_id: &str,
        persistence: &dyn CatalogPersistence,
    ) -> Result<Option<CatalogEntry>, CatalogError> {
        let mut inner = self.write();
        if !inner.entries.contains_key(archive_id) {
            return Ok(None);
        }
        persistence.delete_entry(archive_id)?;
        let removed = inner.take(archive_id);
        debug!(archive = archive_id, "Catalog entry removal committed");
        Ok(removed)
    }

    /// Record the marker of the archive file. An archive without contents
    /// gets an empty entry so the marker is remembered.
    pub fn set_modified_marker(&self, archive_id: &str, marker: ModifiedMarker) -> CatalogEntry {
        let mut inner = self.write();
        let entry = inner
            .entries
            .entry(archive_id.to_string())
            .or_insert_with(|| CatalogEntry {
                archive_id: archive_id.to_string(),
                files: ArchiveContents::new(),
                last_modified: None,
                updated_at: Utc::now(),
            });
        entry.last_modified = Some(marker);
        entry.clone()
    }

    pub fn get_modified_marker(&self, archive_id: &str) -> Option<ModifiedMarker> {
        self.read()
            .entries
            .get(archive_id)
            .and_then(|e| e.last_modified)
    }

    /// Where a checksum currently lives on disk, across all archives.
    pub fn by_checksum(&self, checksum: &str) -> Vec<RomRecord> {
        self.read()
            .by_checksum
            .get(checksum)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Catalogued archive ids, sorted.
    pub fn archive_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().entries.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn stats(&self) -> CatalogStats {
        let inner = self.read();
        CatalogStats {
            archive_count: inner.entries.len(),
            checksum_count: inner.by_checksum.len(),
            file_count: inner.entries.values().map(|e| e.files.len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SqliteCatalogPersistence;
    use std::sync::Arc;

    fn contents(pairs: &[(&str, &str)]) -> ArchiveContents {
        pairs
            .iter()
            .map(|(c, f)| (c.to_string(), f.to_string()))
            .collect()
    }

    #[test]
    fn test_get_unknown_is_none() {
        let store = CatalogStore::new();
        assert!(store.get("pacman").is_none());
        assert!(store.get_modified_marker("pacman").is_none());
        assert!(store.by_checksum("h1").is_empty());
    }

    #[test]
    fn test_replace_creates_entry() {
        let store = CatalogStore::new();
        store.replace("pacman", contents(&[("h1", "a.bin"), ("h2", "b.bin")]));

        let entry = store.get("pacman").unwrap();
        assert_eq!(entry.files.len(), 2);
        assert_eq!(
            store.by_checksum("h1"),
            vec![RomRecord::new("h1", "pacman", "a.bin")]
        );
    }

    #[test]
    fn test_replace_purges_previous_contents() {
        let store = CatalogStore::new();
        store.replace("pacman", contents(&[("h1", "a.bin"), ("h2", "b.bin")]));
        store.replace("pacman", contents(&[("h2", "renamed.bin"), ("h3", "c.bin")]));

        assert!(store.by_checksum("h1").is_empty());
        assert_eq!(
            store.by_checksum("h2"),
            vec![RomRecord::new("h2", "pacman", "renamed.bin")]
        );
        assert_eq!(store.get("pacman").unwrap().files, contents(&[("h2", "renamed.bin"), ("h3", "c.bin")]));
    }

    #[test]
    fn test_replace_leaves_other_archives_sharing_checksum() {
        let store = CatalogStore::new();
        store.replace("pacman", contents(&[("shared", "a.bin")]));
        store.replace("puckman", contents(&[("shared", "a.bin")]));

        store.replace("pacman", contents(&[("h9", "z.bin")]));

        assert_eq!(
            store.by_checksum("shared"),
            vec![RomRecord::new("shared", "puckman", "a.bin")]
        );
    }

    #[test]
    fn test_remove() {
        let store = CatalogStore::new();
        store.replace("pacman", contents(&[("shared", "a.bin")]));
        store.replace("puckman", contents(&[("shared", "a.bin")]));

        let removed = store.remove("pacman").unwrap();
        assert_eq!(removed.archive_id, "pacman");
        assert!(store.get("pacman").is_none());
        assert_eq!(store.by_checksum("shared").len(), 1);

        assert!(store.remove("pacman").is_none());
        assert!(store.remove("never-seen").is_none());
    }

    #[test]
    fn test_marker_survives_replace() {
        let store = CatalogStore::new();
        store.set_modified_marker("pacman", ModifiedMarker(10));
        assert_eq!(store.get("pacman").unwrap().files.len(), 0);

        store.replace("pacman", contents(&[("h1", "a.bin")]));
        assert_eq!(store.get_modified_marker("pacman"), Some(ModifiedMarker(10)));

        store.set_modified_marker("pacman", ModifiedMarker(20));
        assert_eq!(store.get_modified_marker("pacman"), Some(ModifiedMarker(20)));
        assert_eq!(store.get("pacman").unwrap().files.len(), 1);
    }

    /// Persistence whose writes always fail.
    struct BrokenDisk;

    impl CatalogPersistence for BrokenDisk {
        fn load_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
            Ok(Vec::new())
        }

        fn save_entry(&self, _entry: &CatalogEntry) -> Result<(), CatalogError> {
            Err(CatalogError::Database("disk full".to_string()))
        }

        fn delete_entry(&self, _archive_id: &str) -> Result<bool, CatalogError> {
            Err(CatalogError::Database("disk full".to_string()))
        }
    }

    #[test]
    fn test_commit_writes_through() {
        let store = CatalogStore::new();
        let db = SqliteCatalogPersistence::in_memory().unwrap();

        let entry = store
            .commit_replace(
                "pacman",
                contents(&[("h1", "a.bin")]),
                Some(ModifiedMarker(3)),
                &db,
            )
            .unwrap();
        assert_eq!(entry.last_modified, Some(ModifiedMarker(3)));
        assert_eq!(db.load_all().unwrap(), vec![entry.clone()]);
        assert_eq!(store.get("pacman"), Some(entry));

        // No marker given: the stored one is kept
        let entry = store
            .commit_replace("pacman", contents(&[("h2", "b.bin")]), None, &db)
            .unwrap();
        assert_eq!(entry.last_modified, Some(ModifiedMarker(3)));
        assert_eq!(db.load_all().unwrap(), vec![entry]);

        assert!(store.commit_remove("pacman", &db).unwrap().is_some());
        assert!(db.load_all().unwrap().is_empty());
        assert!(store.get("pacman").is_none());

        assert!(store.commit_remove("pacman", &db).unwrap().is_none());
    }

    #[test]
    fn test_failed_commit_leaves_store_untouched() {
        let store = CatalogStore::new();
        store.replace("pacman", contents(&[("h1", "a.bin")]));
        let before = store.set_modified_marker("pacman", ModifiedMarker(1));

        let err = store.commit_replace(
            "pacman",
            contents(&[("h2", "b.bin")]),
            Some(ModifiedMarker(2)),
            &BrokenDisk,
        );
        assert!(err.is_err());
        assert_eq!(store.get("pacman"), Some(before.clone()));
        assert!(store.by_checksum("h2").is_empty());

        assert!(store.commit_remove("pacman", &BrokenDisk).is_err());
        assert_eq!(store.get("pacman"), Some(before));
        assert_eq!(store.by_checksum("h1").len(), 1);

        // Unknown ids never reach the disk
        assert!(store.commit_remove("never-seen", &BrokenDisk).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_commits_keep_memory_and_disk_in_step() {
        let store = Arc::new(CatalogStore::new());
        let db = Arc::new(SqliteCatalogPersistence::in_memory().unwrap());

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        let checksum = format!("h{}-{}", i, n);
                        store
                            .commit_replace(
                                "pacman",
                                contents(&[(checksum.as_str(), "x.bin")]),
                                Some(ModifiedMarker(n)),
                                &*db,
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        assert_eq!(db.load_all().unwrap(), vec![store.get("pacman").unwrap()]);
    }

    #[test]
    fn test_load_and_stats() {
        let store = CatalogStore::new();
        let now = Utc::now();
        let loaded = store.load(vec![
            CatalogEntry {
                archive_id: "pacman".to_string(),
                files: contents(&[("h1", "a.bin"), ("h2", "b.bin")]),
                last_modified: Some(ModifiedMarker(1)),
                updated_at: now,
            },
            CatalogEntry {
                archive_id: "puckman".to_string(),
                files: contents(&[("h2", "b.bin")]),
                last_modified: None,
                updated_at: now,
            },
        ]);

        assert_eq!(loaded, 2);
        assert_eq!(store.archive_ids(), vec!["pacman", "puckman"]);
        assert_eq!(
            store.stats(),
            CatalogStats {
                archive_count: 2,
                checksum_count: 2,
                file_count: 3,
            }
        );
    }

    #[test]
    fn test_concurrent_replace_never_leaks_previous_contents() {
        let store = Arc::new(CatalogStore::new());
        store.replace("pacman", contents(&[("old", "old.bin")]));

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let checksum = format!("h{}-{}", i, n);
                        store.replace("pacman", contents(&[(checksum.as_str(), "x.bin")]));
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let entry = store.get("pacman").unwrap();
        assert_eq!(entry.files.len(), 1);
        assert!(store.by_checksum("old").is_empty());
        assert_eq!(store.stats().checksum_count, 1);
    }
}
