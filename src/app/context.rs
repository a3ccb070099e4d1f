use std::sync::Arc;

use crate::app::error::Result;
use crate::cache::DocumentCache;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::{ByteStore, StoreConnector, StoreLocation};
use crate::viewer::ViewerSession;

/// Wires configuration into a ready [`DocumentCache`].
pub struct ViewerContext {
    pub config: Config,
    pub store: Arc<StoreConnector>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub cache: DocumentCache,
}

impl ViewerContext {
    pub fn new(config: Config) -> Result<Self> {
        let location = config.cache.location();
        Self::with_location(config, location)
    }

    /// Like [`new`](Self::new) with the store location overridden.
    pub fn with_location(config: Config, location: StoreLocation) -> Result<Self> {
        let store = Arc::new(StoreConnector::new(location));
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);
        Ok(Self::with_parts(config, store, fetcher))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<StoreConnector>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        let byte_store: Arc<dyn ByteStore + Send + Sync> = store.clone();
        let cache = DocumentCache::new(byte_store, fetcher.clone(), config.cache.limits());
        Self {
            config,
            store,
            fetcher,
            cache,
        }
    }

    /// A fresh session using the configured viewer settings.
    pub fn session(&self) -> ViewerSession {
        ViewerSession::new(self.config.viewer.clone())
    }
}
