//! Collection persistence and the conversion catalog

mod backend;
mod catalog;
mod collection_store;

pub use backend::{CollectionBackend, FsCollectionBackend, MemoryCollectionBackend};
pub use catalog::{ConversionCatalog, NewCatalogEntry};
pub use collection_store::{validate_name, CollectionStore, SourceInfo};
