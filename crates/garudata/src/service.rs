//! Garudata facade: convert, store, search, preview

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GarudataConfig;
use crate::error::{Error, Result};
use crate::ingestion::{
    hash_source, DelimitedConverter, RelationalConverter, SpreadsheetConverter,
};
use crate::retrieval::{PreviewService, SearchEngine, SearchOutcome};
use crate::storage::{
    CollectionStore, ConversionCatalog, FsCollectionBackend, SourceInfo,
};
use crate::types::{CatalogEntry, Collection, CollectionRef, Record, SourceKind};

/// Entry point tying converters, the collection store and search together
pub struct Garudata {
    config: GarudataConfig,
    store: Arc<CollectionStore>,
    search: Arc<SearchEngine>,
    preview: PreviewService,
    relational: RelationalConverter,
    delimited: DelimitedConverter,
    spreadsheet: SpreadsheetConverter,
}

impl Garudata {
    /// Open the filesystem store and catalog named by `config`
    pub async fn new(config: GarudataConfig) -> Result<Self> {
        config.ensure_dirs()?;

        let backend = Arc::new(FsCollectionBackend::new(&config.storage.collections_dir)?);
        let catalog = ConversionCatalog::open(&config.storage.catalog_path)?;
        let store = Arc::new(CollectionStore::open(backend, catalog).await?);

        Self::with_store(config, store)
    }

    /// Memory-backed instance
    pub fn in_memory(config: GarudataConfig) -> Result<Self> {
        let store = Arc::new(CollectionStore::in_memory()?);
        Self::with_store(config, store)
    }

    pub fn with_store(config: GarudataConfig, store: Arc<CollectionStore>) -> Result<Self> {
        let mut delimited = DelimitedConverter::new();
        if let Some(delimiter) = config.conversion.delimiter {
            if !delimiter.is_ascii() {
                return Err(Error::Config(format!(
                    "Delimiter must be a single ASCII character, got '{}'",
                    delimiter
                )));
            }
            delimited = delimited.with_delimiter(delimiter as u8);
        }

        let search = Arc::new(SearchEngine::new(Arc::clone(&store), config.search.clone()));
        let preview = PreviewService::new(Arc::clone(&store), config.preview.rows);

        Ok(Self {
            relational: RelationalConverter::new(config.conversion.busy_timeout()),
            delimited,
            spreadsheet: SpreadsheetConverter::new(),
            config,
            store,
            search,
            preview,
        })
    }

    pub fn config(&self) -> &GarudataConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CollectionStore> {
        &self.store
    }

    /// Convert one table of a SQLite database
    pub async fn convert_relational(&self, path: &Path, table: &str) -> Result<CollectionRef> {
        let converter = self.relational.clone();
        let table = table.to_string();
        self.run_conversion(path, move |p| converter.convert(p, &table))
            .await
    }

    /// Convert a CSV / TSV file
    pub async fn convert_delimited(&self, path: &Path) -> Result<CollectionRef> {
        let converter = self.delimited.clone();
        self.run_conversion(path, move |p| converter.convert(p)).await
    }

    /// Convert the active sheet of a workbook
    pub async fn convert_spreadsheet(&self, path: &Path) -> Result<CollectionRef> {
        let converter = self.spreadsheet;
        self.run_conversion(path, move |p| converter.convert(p)).await
    }

    /// Convert by file extension; relational sources need `table`
    pub async fn convert(&self, path: &Path, table: Option<&str>) -> Result<CollectionRef> {
        let source = path.display().to_string();
        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SourceKind::from_extension)
            .ok_or_else(|| Error::UnsupportedSource(source.clone()))?;

        match kind {
            SourceKind::Relational => {
                let table = table.ok_or_else(|| {
                    Error::query_failed(&source, "", "a table name is required for database sources")
                })?;
                self.convert_relational(path, table).await
            }
            SourceKind::Delimited => self.convert_delimited(path).await,
            SourceKind::Spreadsheet => self.convert_spreadsheet(path).await,
        }
    }

    /// Read and hash the source on the blocking pool under the conversion
    /// timeout, then store the result. Nothing is stored on failure.
    async fn run_conversion<F>(&self, path: &Path, convert: F) -> Result<CollectionRef>
    where
        F: FnOnce(&Path) -> Result<Collection> + Send + 'static,
    {
        let path: PathBuf = path.to_path_buf();
        let source = path.display().to_string();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.clone());
        let timeout = self.config.conversion.timeout();

        tracing::info!("Converting {}", source);
        let started = std::time::Instant::now();

        let task = tokio::task::spawn_blocking(move || -> Result<(String, Collection)> {
            let content_hash = hash_source(&path)?;
            let collection = convert(&path)?;
            Ok((content_hash, collection))
        });

        let (content_hash, collection) = match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined.map_err(|e| Error::Internal(format!("Task join error: {}", e)))??,
            Err(_) => {
                tracing::warn!("Conversion of {} timed out after {:?}", source, timeout);
                return Err(Error::source_unavailable(
                    &source,
                    format!("read timed out after {}s", timeout.as_secs()),
                ));
            }
        };

        let reference = self
            .store
            .put(&SourceInfo::new(source_name, content_hash), collection)
            .await?;

        tracing::info!(
            "Converted {} into '{}' ({} records) in {:?}",
            source,
            reference.name,
            reference.record_count,
            started.elapsed()
        );

        Ok(reference)
    }

    /// Keyword search across every collection
    pub async fn search(&self, keyword: &str) -> Result<SearchOutcome> {
        let engine = Arc::clone(&self.search);
        let keyword = keyword.to_string();
        tokio::task::spawn_blocking(move || engine.search(&keyword))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))
    }

    /// Most recent conversions first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<CatalogEntry>> {
        self.store.list(limit)
    }

    pub fn preview(&self, collection_name: &str) -> Result<Vec<Record>> {
        self.preview.preview(collection_name)
    }

    /// Persisted JSON of a collection
    pub async fn fetch_collection(&self, collection_name: &str) -> Result<Vec<u8>> {
        self.store.fetch(collection_name).await
    }
}
