//! Reference index - the read-only database of known-good rom records.
//!
//! The index is built once at startup and then shared behind an `Arc`.
//! Both lookups (by checksum, by archive) are views of the same record set.
//! The flat reference file itself can be generated from MAME's XML listings.

mod import;
mod index;
mod loader;

pub use import::*;
pub use index::*;
pub use loader::*;
