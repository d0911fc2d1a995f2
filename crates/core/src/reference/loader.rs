//! Loading the reference index from the flat `<sha1> <archive>:<file>` format.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::ReferenceIndex;
use crate::rom::RomRecord;

const PROGRESS_EVERY: usize = 100_000;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Reference file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error reading reference data: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the index from a reader. Malformed lines (including lines that are
/// not valid UTF-8) are logged and skipped; blank lines are ignored. Only
/// I/O errors abort the load.
pub fn load_reference<R: BufRead>(mut reader: R) -> Result<ReferenceIndex, ReferenceError> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                skipped += 1;
                warn!("Skipping reference line {}: not valid UTF-8 ({})", line_no, e);
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match RomRecord::parse(line) {
            Ok(record) => {
                records.push(record);
                if records.len() % PROGRESS_EVERY == 0 {
                    debug!("Parsed {} reference records", records.len());
                }
            }
            Err(e) => {
                skipped += 1;
                warn!("Skipping reference line {}: {}", line_no, e);
            }
        }
    }

    let index = ReferenceIndex::build(records);
    let stats = index.stats();
    info!(
        records = stats.record_count,
        archives = stats.archive_count,
        checksums = stats.checksum_count,
        skipped,
        "Loaded reference data"
    );
    Ok(index)
}

/// Build the index from a file on disk.
pub fn load_reference_file(path: &Path) -> Result<ReferenceIndex, ReferenceError> {
    if !path.exists() {
        return Err(ReferenceError::FileNotFound(path.display().to_string()));
    }
    info!("Loading reference data from {:?}", path);
    let file = File::open(path)?;
    load_reference(BufReader::new(file))
}
