//! garudata: tabular data normalization
//!
//! Converts SQLite tables, delimited text files and spreadsheets into named
//! collections of schema-less records, persists them as JSON, and answers
//! keyword searches across every collection. An axum server exposes upload,
//! search, preview and download endpoints.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;

pub use config::GarudataConfig;
pub use error::{Error, Result};
pub use retrieval::SearchOutcome;
pub use service::Garudata;
pub use types::{CatalogEntry, Collection, CollectionRef, Record, SearchHit, SourceKind, Value};
