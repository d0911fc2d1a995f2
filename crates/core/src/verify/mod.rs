//! Archive verification - reconciles one observed archive against a match
//! result and produces a [`CorrectionPlan`].
//!
//! [`verify`] is a pure function of its inputs. The steps run in a fixed
//! order:
//!
//! 1. archive identity (is the archive named after what it contains?)
//! 2. bail out if the reference knows nothing about the effective archive
//! 3. file names
//! 4. missing files, split into core files and clone variants
//! 5. unknown checksums
//! 6. files that belong in another, incomplete archive

mod types;

pub use types::*;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::matcher::{MatchResult, RomSetMatch};
use crate::rom::{ArchiveContents, RomRecord};

/// Reconcile `catalog` (the observed contents of `archive_id`) against
/// `matches`, the match result for those same checksums.
pub fn verify(
    archive_id: &str,
    catalog: &ArchiveContents,
    matches: &MatchResult,
) -> Result<CorrectionPlan, VerifyError> {
    let mut plan = CorrectionPlan::default();
    let completed = matches.completed();

    let mut effective = archive_id;
    if !completed.is_empty() && !completed.contains_key(archive_id) {
        let candidates: Vec<&str> = completed
            .iter()
            .filter(|(_, complete)| **complete)
            .map(|(id, _)| *id)
            .collect();
        debug!(
            archive = archive_id,
            ?candidates,
            "Archive name does not match its contents"
        );
        // Best effort: only a single complete candidate is assumed.
        if let [only] = candidates.as_slice() {
            effective = *only;
            plan.assumed_archive = Some(only.to_string());
        }
        plan.rename_archive = Some(candidates.iter().map(|id| id.to_string()).collect());
    }

    let Some(romset) = matches.romset(effective) else {
        debug!(archive = effective, "No reference data for archive");
        return Ok(plan);
    };

    plan.rename_files = misnamed_files(catalog, romset);

    let (missing_clones, missing_core) = classify_missing(effective, romset)?;
    plan.missing_clones = missing_clones;
    plan.missing_core = missing_core;

    plan.unknown = matches.unknown.clone();

    plan.moves = misplaced_files(effective, catalog, romset, matches, &plan.unknown)?;

    Ok(plan)
}

/// Catalogued files whose name differs from the reference name. Checksums
/// the archive has no reference name for are left to the unknown/move steps.
fn misnamed_files(catalog: &ArchiveContents, romset: &RomSetMatch) -> BTreeMap<String, FileRename> {
    let mut renames = BTreeMap::new();
    for (checksum, current) in catalog {
        if let Some(expected) = romset.files.get(checksum) {
            if expected != current {
                renames.insert(
                    checksum.clone(),
                    FileRename {
                        current: current.clone(),
                        expected: expected.clone(),
                    },
                );
            }
        }
    }
    renames
}

type MissingFiles = (BTreeMap<String, BTreeSet<String>>, Option<BTreeSet<String>>);

/// Group missing files by clone folder. Files without a folder (or with an
/// empty one) belong to the archive itself.
fn classify_missing(archive_id: &str, romset: &RomSetMatch) -> Result<MissingFiles, VerifyError> {
    let mut clones: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for checksum in &romset.missing {
        let file_name = romset
            .files
            .get(checksum)
            .ok_or_else(|| VerifyError::Inconsistent {
                archive_id: archive_id.to_string(),
                checksum: checksum.clone(),
            })?;
        let (clone, name) = file_name.split_once('/').unwrap_or(("", file_name.as_str()));
        clones
            .entry(clone.to_string())
            .or_default()
            .insert(name.to_string());
    }

    let core = clones.remove("");
    Ok((clones, core))
}

/// Catalogued files this archive does not claim but another, incomplete
/// archive matched. Every candidate destination is reported.
fn misplaced_files(
    archive_id: &str,
    catalog: &ArchiveContents,
    romset: &RomSetMatch,
    matches: &MatchResult,
    unknown: &BTreeSet<String>,
) -> Result<Vec<RomMove>, VerifyError> {
    let mut moves = Vec::new();

    for (checksum, file_name) in catalog {
        if romset.matched.contains(checksum) || unknown.contains(checksum) {
            continue;
        }
        for (other_id, other) in &matches.romsets {
            if other_id == archive_id || other.is_complete() || !other.matched.contains(checksum) {
                continue;
            }
            let expected = other
                .files
                .get(checksum)
                .ok_or_else(|| VerifyError::Inconsistent {
                    archive_id: other_id.clone(),
                    checksum: checksum.clone(),
                })?;
            moves.push(RomMove {
                current: RomRecord::new(checksum, archive_id, file_name),
                suggested: RomRecord::new(checksum, other_id, expected),
            });
        }
    }

    Ok(moves)
}
