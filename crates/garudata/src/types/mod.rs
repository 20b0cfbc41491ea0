//! Core types for tabular normalization

pub mod catalog;
pub mod record;
pub mod response;

pub use catalog::CatalogEntry;
pub use record::{Collection, Record, SourceKind, Value};
pub use response::{CollectionRef, SearchHit};
