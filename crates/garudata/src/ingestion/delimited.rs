//! CSV / TSV converter
//!
//! Values are kept as strings exactly as they appear in the file; no type
//! inference is applied.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Collection, Record, SourceKind, Value};

use super::collection_name_for;

/// Converts a delimited text file into a collection named after the file stem
#[derive(Debug, Clone, Default)]
pub struct DelimitedConverter {
    delimiter: Option<u8>,
}

impl DelimitedConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a delimiter instead of picking one from the file extension
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Delimiter used for `path`: the override, tab for `.tsv`, comma otherwise
    pub fn delimiter_for(&self, path: &Path) -> u8 {
        if let Some(d) = self.delimiter {
            return d;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        }
    }

    pub fn convert(&self, path: &Path) -> Result<Collection> {
        let source = path.display().to_string();
        let name = collection_name_for(path)?;

        let file = File::open(path)
            .map_err(|e| Error::source_unavailable(&source, format!("Failed to open file: {}", e)))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter_for(path))
            .from_reader(BufReader::new(file));

        let mut rows = reader.records();

        let header = match rows.next() {
            Some(result) => result.map_err(|e| csv_error(&source, e))?,
            None => return Err(Error::malformed(&source, "file is empty, no header row")),
        };
        let field_names: Vec<String> = header.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for result in rows {
            let row = result.map_err(|e| csv_error(&source, e))?;
            let values = row.iter().map(|v| Value::String(v.to_string()));
            records.push(Record::from_row(&field_names, values));
        }

        tracing::debug!(
            "Read {} rows ({} columns) from {}",
            records.len(),
            field_names.len(),
            source
        );

        Ok(Collection::new(name, SourceKind::Delimited, records))
    }
}

fn csv_error(source: &str, err: csv::Error) -> Error {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        Error::source_unavailable(source, err)
    } else {
        Error::malformed(source, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "people.csv", "name,age\nAlice,30\nBob,41\n");

        let collection = DelimitedConverter::new().convert(&path).unwrap();
        assert_eq!(collection.name(), "people");
        assert_eq!(collection.source_kind(), SourceKind::Delimited);
        assert_eq!(collection.len(), 2);
        // Numbers stay strings
        assert_eq!(collection.records()[0].get("age"), Some(&Value::from("30")));
        assert_eq!(collection.records()[1].get("name"), Some(&Value::from("Bob")));
    }

    #[test]
    fn test_short_and_long_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ragged.csv", "a,b,c\n1,2\n1,2,3,4\n");

        let collection = DelimitedConverter::new().convert(&path).unwrap();
        let short = &collection.records()[0];
        assert_eq!(short.get("a"), Some(&Value::from("1")));
        assert_eq!(short.get("b"), Some(&Value::from("2")));
        assert_eq!(short.get("c"), Some(&Value::Null));

        let long = &collection.records()[1];
        assert_eq!(long.len(), 3);
        assert_eq!(long.get("c"), Some(&Value::from("3")));
    }

    #[test]
    fn test_quoted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "quotes.csv",
            "title,notes\n\"Hello, world\",\"said \"\"hi\"\"\"\n",
        );

        let collection = DelimitedConverter::new().convert(&path).unwrap();
        let record = &collection.records()[0];
        assert_eq!(record.get("title"), Some(&Value::from("Hello, world")));
        assert_eq!(record.get("notes"), Some(&Value::from("said \"hi\"")));
    }

    #[test]
    fn test_tsv_uses_tab() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "tabs.tsv", "k\tv\nx\t1,5\n");

        let collection = DelimitedConverter::new().convert(&path).unwrap();
        assert_eq!(collection.records()[0].get("v"), Some(&Value::from("1,5")));
    }

    #[test]
    fn test_delimiter_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "semi.csv", "k;v\nx;y\n");

        let collection = DelimitedConverter::new()
            .with_delimiter(b';')
            .convert(&path)
            .unwrap();
        assert_eq!(collection.records()[0].get("v"), Some(&Value::from("y")));
    }

    #[test]
    fn test_header_only_gives_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "header.csv", "a,b\n");

        let collection = DelimitedConverter::new().convert(&path).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_empty_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", "");

        let err = DelimitedConverter::new().convert(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DelimitedConverter::new()
            .convert(&dir.path().join("missing.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"name\ncaf\xe9\n").unwrap();

        let err = DelimitedConverter::new().convert(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }
}
