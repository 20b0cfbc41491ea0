//! Results returned by conversion and search

use serde::{Deserialize, Serialize};

use super::record::{Record, SourceKind};

/// Handle to a persisted collection, returned by every conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionRef {
    /// Collection name (store key)
    pub name: String,
    /// Source format the collection came from
    pub source_kind: SourceKind,
    /// Number of records
    pub record_count: usize,
    /// Field names of the first record
    pub fields: Vec<String>,
    /// Where the backend persisted the collection
    pub location: String,
}

/// A record matched by keyword search, with its provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Collection the record belongs to
    pub collection: String,
    /// The matching record
    pub record: Record,
}
