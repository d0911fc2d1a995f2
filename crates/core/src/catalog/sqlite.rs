//! SQLite-backed catalog persistence.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CatalogEntry, CatalogError, CatalogPersistence, ModifiedMarker};
use crate::rom::ArchiveContents;

/// SQLite-backed catalog persistence.
pub struct SqliteCatalogPersistence {
    conn: Mutex<Connection>,
}

impl SqliteCatalogPersistence {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            -- One row per catalogued archive
            CREATE TABLE IF NOT EXISTS catalog_archives (
                archive_id TEXT PRIMARY KEY,
                last_modified INTEGER,
                updated_at TEXT NOT NULL
            );

            -- Observed files inside each archive
            CREATE TABLE IF NOT EXISTS catalog_files (
                archive_id TEXT NOT NULL REFERENCES catalog_archives(archive_id) ON DELETE CASCADE,
                checksum TEXT NOT NULL,
                file_name TEXT NOT NULL,
                PRIMARY KEY(archive_id, checksum)
            );

            CREATE INDEX IF NOT EXISTS idx_catalog_files_checksum ON catalog_files(checksum);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CatalogPersistence for SqliteCatalogPersistence {
    fn load_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let conn = self.lock();

        let mut files: HashMap<String, ArchiveContents> = HashMap::new();
        {
            let mut stmt = conn.prepare("SELECT archive_id, checksum, file_name FROM catalog_files")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (archive_id, checksum, file_name) = row?;
                files.entry(archive_id).or_default().insert(checksum, file_name);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT archive_id, last_modified, updated_at FROM catalog_archives ORDER BY archive_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let updated_at_str: String = row.get(2)?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<i64>>(1)?,
                updated_at,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (archive_id, last_modified, updated_at) = row?;
            entries.push(CatalogEntry {
                files: files.remove(&archive_id).unwrap_or_default(),
                archive_id,
                last_modified: last_modified.map(ModifiedMarker),
                updated_at,
            });
        }
        Ok(entries)
    }

    fn save_entry(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO catalog_archives (archive_id, last_modified, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(archive_id) DO UPDATE SET
                last_modified = excluded.last_modified,
                updated_at = excluded.updated_at",
            params![
                entry.archive_id,
                entry.last_modified.map(|m| m.0),
                entry.updated_at.to_rfc3339()
            ],
        )?;
        tx.execute(
            "DELETE FROM catalog_files WHERE archive_id = ?",
            params![entry.archive_id],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO catalog_files (archive_id, checksum, file_name) VALUES (?1, ?2, ?3)",
            )?;
            for (checksum, file_name) in &entry.files {
                insert.execute(params![entry.archive_id, checksum, file_name])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_entry(&self, archive_id: &str) -> Result<bool, CatalogError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM catalog_files WHERE archive_id = ?",
            params![archive_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM catalog_archives WHERE archive_id = ?",
            params![archive_id],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}
