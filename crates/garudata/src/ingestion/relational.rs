//! SQLite table converter

use base64::Engine;
use rusqlite::{
    types::ValueRef,
    Connection, ErrorCode, OpenFlags,
};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{Collection, Record, SourceKind, Value};

/// Converts one table of a SQLite database into a collection
#[derive(Debug, Clone)]
pub struct RelationalConverter {
    busy_timeout: Duration,
}

impl RelationalConverter {
    pub fn new(busy_timeout: Duration) -> Self {
        Self { busy_timeout }
    }

    /// Read every row of `table`; the collection is named after the table
    pub fn convert(&self, path: &Path, table: &str) -> Result<Collection> {
        let source = path.display().to_string();

        if !path.is_file() {
            return Err(Error::source_unavailable(&source, "database file does not exist"));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::source_unavailable(&source, format!("Failed to open database: {}", e)))?;

        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| Error::source_unavailable(&source, e))?;

        ensure_table_exists(&conn, &source, table)?;

        // Name was checked against sqlite_master above; quoting keeps it an identifier
        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| classify(e, &source, table))?;

        let field_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let column_count = field_names.len();

        let mut rows = stmt.query([]).map_err(|e| classify(e, &source, table))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().map_err(|e| classify(e, &source, table))? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let cell = row.get_ref(idx).map_err(|e| classify(e, &source, table))?;
                values.push(sql_value(cell));
            }
            records.push(Record::from_row(&field_names, values));
        }

        tracing::debug!(
            "Read {} rows ({} columns) from table '{}' in {}",
            records.len(),
            column_count,
            table,
            source
        );

        Ok(Collection::new(table, SourceKind::Relational, records))
    }
}

impl Default for RelationalConverter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Allow-list check: the table (or view) must be declared in the schema
fn ensure_table_exists(conn: &Connection, source: &str, table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(Error::query_failed(source, table, "table name is empty"));
    }

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| classify(e, source, table))?;

    if count == 0 {
        return Err(Error::query_failed(
            source,
            table,
            format!("no such table: {}", table),
        ));
    }
    Ok(())
}

/// Quote a SQLite identifier, doubling embedded quotes
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Container-level failures make the source unavailable; everything else is a query failure
fn classify(err: rusqlite::Error, source: &str, table: &str) -> Error {
    let unavailable = matches!(
        &err,
        rusqlite::Error::SqliteFailure(failure, _) if matches!(
            failure.code,
            ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::CannotOpen
                | ErrorCode::PermissionDenied
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
        )
    );

    if unavailable {
        Error::source_unavailable(source, err)
    } else {
        Error::query_failed(source, table, err)
    }
}

fn sql_value(cell: ValueRef<'_>) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT, price REAL, note TEXT, thumb BLOB);
            INSERT INTO products (id, name, price, note, thumb) VALUES (1, 'Widget', 9.5, NULL, x'0102');
            INSERT INTO products (id, name, price, note, thumb) VALUES (2, 'Gadget', 20.0, 'blue', NULL);
            CREATE TABLE "odd ""name""" (v TEXT);
            INSERT INTO "odd ""name""" VALUES ('quoted');
            "#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_convert_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_db(dir.path());

        let collection = RelationalConverter::default().convert(&path, "products").unwrap();
        assert_eq!(collection.name(), "products");
        assert_eq!(collection.source_kind(), SourceKind::Relational);
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.field_names(),
            vec!["id", "name", "price", "note", "thumb"]
        );

        let first = &collection.records()[0];
        assert_eq!(first.get("id"), Some(&Value::Int(1)));
        assert_eq!(first.get("name"), Some(&Value::from("Widget")));
        assert_eq!(first.get("price"), Some(&Value::Float(9.5)));
        assert_eq!(first.get("note"), Some(&Value::Null));
        assert_eq!(first.get("thumb"), Some(&Value::from("AQI=")));

        let second = &collection.records()[1];
        assert_eq!(second.get("thumb"), Some(&Value::Null));
        assert_eq!(second.len(), 5);
    }

    #[test]
    fn test_missing_table_is_query_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_db(dir.path());

        let err = RelationalConverter::default().convert(&path, "orders").unwrap_err();
        assert!(matches!(err, Error::QueryFailed { .. }), "got {:?}", err);
    }

    #[test]
    fn test_injection_attempt_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_db(dir.path());

        let err = RelationalConverter::default()
            .convert(&path, "products; DROP TABLE products")
            .unwrap_err();
        assert!(matches!(err, Error::QueryFailed { .. }));

        // Table is still there
        let collection = RelationalConverter::default().convert(&path, "products").unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_quoted_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture_db(dir.path());

        let collection = RelationalConverter::default()
            .convert(&path, "odd \"name\"")
            .unwrap();
        assert_eq!(collection.records()[0].get("v"), Some(&Value::from("quoted")));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = RelationalConverter::default()
            .convert(&dir.path().join("nope.db"), "products")
            .unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[test]
    fn test_not_a_database_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.db");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let err = RelationalConverter::default().convert(&path, "products").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }), "got {:?}", err);
    }
}
