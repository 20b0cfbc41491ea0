//! Persistence backends for collections

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Collection, SourceKind};

/// Trait for collection persistence
///
/// Implementations:
/// - `FsCollectionBackend`: `<name>.json` files on the local filesystem
/// - `MemoryCollectionBackend`: serialized bytes held in memory
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    /// Persist a collection, replacing any previous one of the same name
    ///
    /// Returns the storage location
    async fn store(&self, collection: &Collection) -> Result<String>;

    /// Load every collection the backend holds
    async fn load_all(&self) -> Result<Vec<Collection>>;

    /// Serialized form of one collection
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Sidecar written next to each collection file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionMeta {
    name: String,
    source_kind: SourceKind,
    record_count: usize,
    stored_at: DateTime<Utc>,
}

/// Directory under the root holding metadata sidecars
///
/// Collection names never start with `.`, so no data file can land here.
const META_DIR: &str = ".meta";

/// Filesystem backend: `<root>/<name>.json` plus `<root>/.meta/<name>.json`
pub struct FsCollectionBackend {
    root: PathBuf,
}

impl FsCollectionBackend {
    /// Create a backend rooted at `root`, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(META_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.meta_dir().join(format!("{}.json", name))
    }
}

/// Write to a temp file in the target directory, then rename over the target
fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn read_collection(data_path: &Path, meta_path: &Path) -> Result<Option<Collection>> {
    let stem = match data_path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => stem.to_string(),
        None => return Ok(None),
    };

    let (name, kind) = if meta_path.is_file() {
        let meta: CollectionMeta = serde_json::from_slice(&std::fs::read(meta_path)?)?;
        (meta.name, meta.source_kind)
    } else {
        tracing::warn!(
            "No metadata for {}, loading as delimited collection",
            data_path.display()
        );
        (stem, SourceKind::Delimited)
    };

    let data = std::fs::read(data_path)?;
    Ok(Some(Collection::from_json_slice(name, kind, &data)?))
}

#[async_trait]
impl CollectionBackend for FsCollectionBackend {
    async fn store(&self, collection: &Collection) -> Result<String> {
        let data = collection.to_json_bytes()?;
        let meta = CollectionMeta {
            name: collection.name().to_string(),
            source_kind: collection.source_kind(),
            record_count: collection.len(),
            stored_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)?;

        let root = self.root.clone();
        let meta_dir = self.meta_dir();
        let data_path = self.data_path(collection.name());
        let meta_path = self.meta_path(collection.name());
        let location = data_path.to_string_lossy().to_string();

        tokio::task::spawn_blocking(move || {
            write_atomic(&root, &data_path, &data)?;
            write_atomic(&meta_dir, &meta_path, &meta_json)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        Ok(location)
    }

    async fn load_all(&self) -> Result<Vec<Collection>> {
        let root = self.root.clone();
        let meta_dir = self.meta_dir();

        tokio::task::spawn_blocking(move || -> Result<Vec<Collection>> {
            let mut collections = Vec::new();

            for entry in std::fs::read_dir(&root)? {
                let path = entry?.path();
                if !path.is_file() {
                    continue;
                }
                let file_name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(n) => n,
                    None => continue,
                };
                if !file_name.ends_with(".json") {
                    continue;
                }

                let meta_path = meta_dir.join(file_name);
                match read_collection(&path, &meta_path) {
                    Ok(Some(collection)) => collections.push(collection),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Skipping unreadable collection {}: {}", path.display(), e)
                    }
                }
            }

            Ok(collections)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.data_path(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(name.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn name(&self) -> &str {
        "filesystem"
    }
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryCollectionBackend {
    entries: DashMap<String, (SourceKind, Vec<u8>)>,
}

impl MemoryCollectionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionBackend for MemoryCollectionBackend {
    async fn store(&self, collection: &Collection) -> Result<String> {
        let data = collection.to_json_bytes()?;
        self.entries.insert(
            collection.name().to_string(),
            (collection.source_kind(), data),
        );
        Ok(format!("memory://{}", collection.name()))
    }

    async fn load_all(&self) -> Result<Vec<Collection>> {
        self.entries
            .iter()
            .map(|entry| {
                let (kind, data) = entry.value();
                Collection::from_json_slice(entry.key().clone(), *kind, data).map_err(Error::from)
            })
            .collect()
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .get(name)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
