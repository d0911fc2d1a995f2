pub mod catalog;
pub mod config;
pub mod hasher;
pub mod matcher;
pub mod reference;
pub mod rom;
pub mod scan;
pub mod testing;
pub mod verify;
pub mod worker;

pub use catalog::{
    CatalogEntry, CatalogError, CatalogPersistence, CatalogStats, CatalogStore, ModifiedMarker,
    SqliteCatalogPersistence,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use hasher::{ArchiveHasher, HasherError, SevenZipHasher};
pub use matcher::{MatchError, MatchResult, RomSetMatch, SetMatcher};
pub use reference::{
    import_mame, import_software, load_reference, load_reference_file, write_reference,
    ImportError, ReferenceError, ReferenceIndex, ReferenceStats,
};
pub use rom::{ArchiveContents, RomParseError, RomRecord};
pub use scan::{ArchiveScanner, NextArchive, ScanError, ScannedArchive};
pub use verify::{verify, CorrectionPlan, FileRename, RomMove, VerifyError};
pub use worker::{CatalogWorker, ProcessOutcome, WorkerError};
