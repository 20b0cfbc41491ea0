//! Application state for the Garudata server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::GarudataConfig;
use crate::error::Result;
use crate::service::Garudata;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Converters, store and search
    garudata: Garudata,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state over the configured storage
    pub async fn new(config: GarudataConfig) -> Result<Self> {
        tracing::info!("Initializing Garudata application state...");

        let garudata = Garudata::new(config).await?;
        tracing::info!(
            "Collection store ready ({} collections, {} backend)",
            garudata.store().len(),
            garudata.store().backend_name()
        );

        Ok(Self::from_service(garudata))
    }

    /// Wrap an already built service
    pub fn from_service(garudata: Garudata) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                garudata,
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn garudata(&self) -> &Garudata {
        &self.inner.garudata
    }

    pub fn config(&self) -> &GarudataConfig {
        self.inner.garudata.config()
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
