//! Rom records - the `(checksum, archive, file)` triples that reference data
//! and on-disk catalogs are joined on.

mod types;

pub use types::*;
