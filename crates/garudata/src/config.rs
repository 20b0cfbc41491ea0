//! Configuration for the Garudata service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main Garudata configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GarudataConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage locations
    pub storage: StorageConfig,
    /// Converter configuration
    pub conversion: ConversionConfig,
    /// Search configuration
    pub search: SearchConfig,
    /// Preview configuration
    pub preview: PreviewConfig,
    /// Catalog listing configuration
    pub catalog: CatalogConfig,
}

impl GarudataConfig {
    /// Load configuration from a TOML file; absent sections keep defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Configuration rooted at a single directory (used by tests and embedding)
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            storage: StorageConfig {
                collections_dir: root.join("collections"),
                uploads_dir: root.join("uploads"),
                catalog_path: root.join("catalog.db"),
            },
            ..Self::default()
        }
    }

    /// Create the storage directories if they do not exist yet
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.storage.collections_dir)?;
        std::fs::create_dir_all(&self.storage.uploads_dir)?;
        if let Some(parent) = self.storage.catalog_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Where collections, uploads and the catalog live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<name>.json` collections
    pub collections_dir: PathBuf,
    /// Directory uploaded source artifacts are saved to
    pub uploads_dir: PathBuf,
    /// SQLite file holding the conversion catalog
    pub catalog_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("garudata");

        Self {
            collections_dir: base.join("collections"),
            uploads_dir: base.join("uploads"),
            catalog_path: base.join("catalog.db"),
        }
    }
}

/// Converter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Timeout for reading one source artifact in seconds
    pub timeout_secs: u64,
    /// SQLite busy timeout for source databases in milliseconds
    pub sqlite_busy_timeout_ms: u64,
    /// Delimiter override for delimited text (default: by extension)
    pub delimiter: Option<char>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            sqlite_busy_timeout_ms: 5000,
            delimiter: None,
        }
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.sqlite_busy_timeout_ms)
    }
}

/// Search configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Let null fields match the keyword "null"
    pub match_null: bool,
    /// Cap on returned hits (None = unbounded)
    pub max_results: Option<usize>,
}

/// Preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Number of leading records returned by a preview
    pub rows: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { rows: 10 }
    }
}

/// Catalog listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Default number of entries for the recent conversions listing
    pub recent_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { recent_limit: 10 }
    }
}
