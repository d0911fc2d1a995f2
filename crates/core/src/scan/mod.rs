//! Discovery of archive files on disk.
//!
//! Walks the ROM folder, derives archive ids from relative paths and hands
//! out archives whose modification marker differs from the catalog's.
//! Entries whose name starts with `.` or `__` are never visited.

mod scanner;
mod types;

pub use scanner::{archive_id_for, scan_archives, visible_files, ArchiveScanner};
pub use types::{NextArchive, ScanError, ScannedArchive};
