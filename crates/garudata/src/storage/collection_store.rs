//! Named collection store
//!
//! Holds every converted collection behind an `Arc` so readers always see a
//! complete collection, persists through a `CollectionBackend`, and records
//! each put in the conversion catalog.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{CatalogEntry, Collection, CollectionRef};

use super::backend::{CollectionBackend, MemoryCollectionBackend};
use super::catalog::{ConversionCatalog, NewCatalogEntry};

/// Maximum collection name length in bytes
const MAX_NAME_LEN: usize = 255;

/// Where a collection came from, as recorded in the catalog
#[derive(Debug, Clone)]
pub struct SourceInfo {
    /// Source artifact name (uploaded file name or path)
    pub name: String,
    /// SHA-256 of the source artifact, hex encoded
    pub content_hash: String,
}

impl SourceInfo {
    pub fn new(name: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_hash: content_hash.into(),
        }
    }
}

pub struct CollectionStore {
    collections: DashMap<String, Arc<Collection>>,
    backend: Arc<dyn CollectionBackend>,
    catalog: ConversionCatalog,
    /// Serializes puts so the backend and the map agree on the last writer
    write_lock: Mutex<()>,
}

impl CollectionStore {
    /// Open a store, loading every collection the backend already holds
    pub async fn open(
        backend: Arc<dyn CollectionBackend>,
        catalog: ConversionCatalog,
    ) -> Result<Self> {
        let collections = DashMap::new();
        for collection in backend.load_all().await? {
            if let Err(e) = validate_name(collection.name()) {
                tracing::warn!("Skipping stored collection: {}", e);
                continue;
            }
            collections.insert(collection.name().to_string(), Arc::new(collection));
        }

        tracing::info!(
            "Loaded {} collections from {} backend",
            collections.len(),
            backend.name()
        );

        Ok(Self {
            collections,
            backend,
            catalog,
            write_lock: Mutex::new(()),
        })
    }

    /// Empty store with memory backend and in-memory catalog
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            collections: DashMap::new(),
            backend: Arc::new(MemoryCollectionBackend::new()),
            catalog: ConversionCatalog::in_memory()?,
            write_lock: Mutex::new(()),
        })
    }

    /// Persist and publish a collection, replacing any previous one of the same name
    pub async fn put(&self, source: &SourceInfo, collection: Collection) -> Result<CollectionRef> {
        validate_name(collection.name())?;

        let _guard = self.write_lock.lock().await;

        let location = self.backend.store(&collection).await?;

        let collection = Arc::new(collection);
        self.collections
            .insert(collection.name().to_string(), Arc::clone(&collection));

        self.catalog.append(NewCatalogEntry {
            source_name: &source.name,
            collection_name: collection.name(),
            source_kind: collection.source_kind(),
            content_hash: &source.content_hash,
            record_count: collection.len(),
        })?;

        tracing::info!(
            "Stored collection '{}' ({} records) at {}",
            collection.name(),
            collection.len(),
            location
        );

        Ok(CollectionRef {
            name: collection.name().to_string(),
            source_kind: collection.source_kind(),
            record_count: collection.len(),
            fields: collection.field_names(),
            location,
        })
    }

    pub fn get(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Catalog entries, newest first
    pub fn list(&self, limit: usize) -> Result<Vec<CatalogEntry>> {
        self.catalog.recent(limit)
    }

    /// Names of held collections, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Point-in-time view of every collection, sorted by name
    pub fn snapshot(&self) -> Vec<Arc<Collection>> {
        let mut collections: Vec<Arc<Collection>> = self
            .collections
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        collections.sort_by(|a, b| a.name().cmp(b.name()));
        collections
    }

    /// Serialized form of a collection, as persisted
    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        if !self.contains(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        self.backend.fetch(name).await
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Check that a name can serve as a store key and a file stem
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.len() > MAX_NAME_LEN
        || name.starts_with('.')
        || name.chars().any(|c| c == '/' || c == '\\' || c.is_control());

    if invalid {
        return Err(Error::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}
