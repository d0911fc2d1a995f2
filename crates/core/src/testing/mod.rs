//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use romcheck_core::testing::{fixtures, MockHasher};
//!
//! let reference = fixtures::reference_index();
//! let hasher = MockHasher::new();
//! hasher
//!     .set_contents("pacman.7z", fixtures::contents(&[(&fixtures::sha1('1'), "a.bin")]))
//!     .await;
//! ```

mod mock_hasher;

pub use mock_hasher::MockHasher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::{BTreeSet, HashMap};

    use crate::reference::ReferenceIndex;
    use crate::rom::{ArchiveContents, RomRecord};

    /// A checksum that looks real: the tag repeated to 40 hex digits.
    pub fn sha1(tag: char) -> String {
        tag.to_string().repeat(40)
    }

    /// Build archive contents from `(checksum, file name)` pairs.
    pub fn contents(pairs: &[(&str, &str)]) -> ArchiveContents {
        pairs
            .iter()
            .map(|(checksum, file)| (checksum.to_string(), file.to_string()))
            .collect()
    }

    /// Reference records from `(checksum, archive, file name)` triples.
    pub fn records(triples: &[(&str, &str, &str)]) -> Vec<RomRecord> {
        triples
            .iter()
            .map(|(checksum, archive, file)| RomRecord::new(*checksum, *archive, *file))
            .collect()
    }

    /// Small reference set over `sha1('1')`..`sha1('6')`:
    ///
    /// - `mame/pacman`: 1 `a.bin`, 2 `b.bin`, 3 `puckman/c.bin`, 6 `shared.bin`
    /// - `mame/galaga`: 4 `d.bin`, 5 `e.bin`, 6 `shared.bin`
    pub fn reference_index() -> ReferenceIndex {
        let h: Vec<String> = ('1'..='6').map(sha1).collect();
        ReferenceIndex::build(vec![
            RomRecord::new(&h[0], "mame/pacman", "a.bin"),
            RomRecord::new(&h[1], "mame/pacman", "b.bin"),
            RomRecord::new(&h[2], "mame/pacman", "puckman/c.bin"),
            RomRecord::new(&h[5], "mame/pacman", "shared.bin"),
            RomRecord::new(&h[3], "mame/galaga", "d.bin"),
            RomRecord::new(&h[4], "mame/galaga", "e.bin"),
            RomRecord::new(&h[5], "mame/galaga", "shared.bin"),
        ])
    }

    /// A corrupted index: `sha1('9')` points at archive `ghost`, which has no
    /// archive records. `mame/galaga` is intact.
    pub fn inconsistent_index() -> ReferenceIndex {
        let ghost = RomRecord::new(sha1('9'), "ghost", "ghost.bin");
        let galaga: BTreeSet<RomRecord> = records(&[
            (&sha1('4'), "mame/galaga", "d.bin"),
            (&sha1('5'), "mame/galaga", "e.bin"),
        ])
        .into_iter()
        .collect();

        let mut by_checksum: HashMap<String, BTreeSet<RomRecord>> = HashMap::new();
        for record in galaga.iter().chain(std::iter::once(&ghost)) {
            by_checksum
                .entry(record.checksum.clone())
                .or_default()
                .insert(record.clone());
        }
        let by_archive = HashMap::from([("mame/galaga".to_string(), galaga)]);

        ReferenceIndex::from_views(by_checksum, by_archive)
    }

    /// The same data as [`reference_index`] in the flat text format.
    pub fn reference_text() -> String {
        reference_index()
            .records()
            .map(|r| format!("{}\n", r))
            .collect()
    }
}
