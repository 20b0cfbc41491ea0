//! SQLite conversion catalog
//!
//! Append-only log of successful conversions, listed newest first.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{CatalogEntry, SourceKind};

/// Catalog of conversions backed by a `conversions` table
#[derive(Clone)]
pub struct ConversionCatalog {
    conn: Arc<Mutex<Connection>>,
}

/// Fields of a catalog entry that the caller supplies
#[derive(Debug, Clone)]
pub struct NewCatalogEntry<'a> {
    pub source_name: &'a str,
    pub collection_name: &'a str,
    pub source_kind: SourceKind,
    pub content_hash: &'a str,
    pub record_count: usize,
}

impl ConversionCatalog {
    /// Create or open the catalog at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            Error::catalog(format!(
                "Failed to open catalog '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.migrate(true)?;
        Ok(catalog)
    }

    /// Create an in-memory catalog
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::catalog(format!("Failed to open in-memory catalog: {}", e)))?;

        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        catalog.migrate(false)?;
        Ok(catalog)
    }

    fn migrate(&self, wal: bool) -> Result<()> {
        let conn = self.conn.lock();

        if wal {
            conn.execute_batch(
                r#"
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                "#,
            )
            .map_err(|e| Error::catalog(format!("Failed to set pragmas: {}", e)))?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_name TEXT NOT NULL,
                collection_name TEXT NOT NULL,
                source_kind TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                record_count INTEGER NOT NULL,
                converted_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversions_collection ON conversions(collection_name);
            "#,
        )
        .map_err(|e| Error::catalog(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Record a conversion and return the stored entry
    pub fn append(&self, entry: NewCatalogEntry<'_>) -> Result<CatalogEntry> {
        let converted_at = Utc::now();
        let conn = self.conn.lock();

        conn.execute(
            r#"
            INSERT INTO conversions (source_name, collection_name, source_kind, content_hash, record_count, converted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.source_name,
                entry.collection_name,
                entry.source_kind.as_str(),
                entry.content_hash,
                entry.record_count as i64,
                converted_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::catalog(format!("Failed to append conversion: {}", e)))?;

        Ok(CatalogEntry {
            id: conn.last_insert_rowid(),
            source_name: entry.source_name.to_string(),
            collection_name: entry.collection_name.to_string(),
            source_kind: entry.source_kind,
            content_hash: entry.content_hash.to_string(),
            record_count: entry.record_count,
            converted_at,
        })
    }

    /// Most recent conversions first
    pub fn recent(&self, limit: usize) -> Result<Vec<CatalogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, source_name, collection_name, source_kind, content_hash, record_count, converted_at
            FROM conversions ORDER BY id DESC LIMIT ?1
            "#,
        )?;

        // SQLite takes a signed limit; anything past i64::MAX means no limit
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map([limit], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Total number of conversions recorded
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM conversions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CatalogEntry> {
    let kind: String = row.get(3)?;
    let source_kind = SourceKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown source kind: {}", kind).into(),
        )
    })?;

    let converted_at: String = row.get(6)?;
    let converted_at = DateTime::parse_from_rfc3339(&converted_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(CatalogEntry {
        id: row.get(0)?,
        source_name: row.get(1)?,
        collection_name: row.get(2)?,
        source_kind,
        content_hash: row.get(4)?,
        record_count: row.get::<_, i64>(5)? as usize,
        converted_at,
    })
}
