//! Schema-less record model shared by every converter

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source a collection was converted from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// SQLite database table
    Relational,
    /// CSV / TSV text file
    Delimited,
    /// Spreadsheet workbook (xlsx, xls, ods)
    Spreadsheet,
}

impl SourceKind {
    /// Detect source kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "db" | "sqlite" | "sqlite3" => Some(Self::Relational),
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relational => "relational",
            Self::Delimited => "delimited",
            Self::Spreadsheet => "spreadsheet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relational" => Some(Self::Relational),
            "delimited" => Some(Self::Delimited),
            "spreadsheet" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loosely typed scalar held by a record field
///
/// Serialized as the bare JSON scalar, so a persisted collection reads as a
/// plain array of flat objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical textual form used by keyword search
    ///
    /// Floats use their JSON rendering (`3.0`, `2.5`), so a whole-number float
    /// and an integer stay distinguishable.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(|n| n.to_string())
                .unwrap_or_else(|| f.to_string()),
            Value::String(s) => s.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row: field name to value, in source field order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip a row positionally with the field names
    ///
    /// Missing trailing values become `Null`; values beyond the field list
    /// are dropped. A repeated field name keeps its first position and takes
    /// the last value.
    pub fn from_row<I>(field_names: &[String], row: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut record = Self {
            fields: IndexMap::with_capacity(field_names.len()),
        };
        let mut values = row.into_iter();
        for name in field_names {
            let value = values.next().unwrap_or(Value::Null);
            record.insert(name.clone(), value);
        }
        record
    }

    /// Set a field, replacing any previous value in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Named, immutable sequence of records produced by one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    source_kind: SourceKind,
    records: Vec<Record>,
}

impl Collection {
    pub fn new(name: impl Into<String>, source_kind: SourceKind, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            source_kind,
            records,
        }
    }

    /// Build a collection from positional rows sharing one header
    pub fn from_rows<R, I>(
        name: impl Into<String>,
        source_kind: SourceKind,
        field_names: &[String],
        rows: R,
    ) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = Value>,
    {
        let records = rows
            .into_iter()
            .map(|row| Record::from_row(field_names, row))
            .collect();
        Self::new(name, source_kind, records)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field names of the first record, for display
    pub fn field_names(&self) -> Vec<String> {
        self.records
            .first()
            .map(|r| r.field_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Serialize the records as a JSON array of flat objects
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.records)
    }

    /// Rebuild a collection from its persisted JSON form
    pub fn from_json_slice(
        name: impl Into<String>,
        source_kind: SourceKind,
        data: &[u8],
    ) -> serde_json::Result<Self> {
        let records: Vec<Record> = serde_json::from_slice(data)?;
        Ok(Self::new(name, source_kind, records))
    }
}
