//! Archive catalog - what the archives on disk actually contain.
//!
//! [`CatalogStore`] is the in-memory, shared view used by queries. Durable
//! storage lives behind [`CatalogPersistence`] and is loaded once at startup
//! and written through on every change.

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteCatalogPersistence;
pub use store::CatalogStore;
pub use types::*;

/// Trait for durable catalog storage.
pub trait CatalogPersistence: Send + Sync {
    /// Load every stored entry.
    fn load_all(&self) -> Result<Vec<CatalogEntry>, CatalogError>;

    /// Insert or wholesale-replace one entry (contents and marker).
    fn save_entry(&self, entry: &CatalogEntry) -> Result<(), CatalogError>;

    /// Delete one entry. Returns `false` if nothing was stored for it.
    fn delete_entry(&self, archive_id: &str) -> Result<bool, CatalogError>;
}
