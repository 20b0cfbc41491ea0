//! Conversion catalog entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::SourceKind;

/// One successful conversion, as recorded in the catalog
///
/// The catalog is append-only: converting the same source twice yields two
/// entries even though the store only holds one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    /// Catalog row ID (monotonic, newest is largest)
    pub id: i64,
    /// Name of the source artifact (uploaded file name)
    pub source_name: String,
    /// Name of the collection the conversion produced
    pub collection_name: String,
    /// Source format
    pub source_kind: SourceKind,
    /// SHA-256 of the source artifact, hex encoded
    pub content_hash: String,
    /// Number of records converted
    pub record_count: usize,
    /// When the conversion completed
    pub converted_at: DateTime<Utc>,
}
