//! Lazily opened store handle.
//!
//! A successful open is memoized for the life of the connector. A failed open
//! is not: the next operation tries again. When persistence is disabled every
//! operation behaves like an empty store that drops writes.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::app::{FolioError, Result};
use crate::cache::CacheLimits;
use crate::domain::{CacheEntrySummary, CacheRecord};
use crate::store::{ByteStore, SqliteByteStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// No persistent store on this platform or by configuration.
    Disabled,
    InMemory,
    Path(PathBuf),
}

pub struct StoreConnector {
    location: StoreLocation,
    handle: Mutex<Option<Arc<SqliteByteStore>>>,
}

impl StoreConnector {
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            handle: Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(StoreLocation::Disabled)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn is_enabled(&self) -> bool {
        self.location != StoreLocation::Disabled
    }

    /// Open (or reuse) the store. `Ok(None)` means persistence is disabled.
    pub async fn connect(&self) -> Result<Option<Arc<SqliteByteStore>>> {
        let mut handle = self.handle.lock().await;
        if let Some(store) = handle.as_ref() {
            return Ok(Some(store.clone()));
        }

        let location = self.location.clone();
        let opened = match location {
            StoreLocation::Disabled => return Ok(None),
            StoreLocation::InMemory => {
                tokio::task::spawn_blocking(SqliteByteStore::in_memory).await
            }
            StoreLocation::Path(path) => {
                tokio::task::spawn_blocking(move || SqliteByteStore::open(&path)).await
            }
        };

        let store = match opened {
            Ok(Ok(store)) => Arc::new(store),
            Ok(Err(e)) => {
                tracing::warn!("Failed to open cache store at {:?}: {}", self.location, e);
                return Err(FolioError::StorageUnavailable(e.to_string()));
            }
            Err(e) => return Err(FolioError::StorageUnavailable(e.to_string())),
        };

        *handle = Some(store.clone());
        Ok(Some(store))
    }

    /// Forget the memoized handle so the next operation reopens the store.
    pub async fn reset(&self) {
        *self.handle.lock().await = None;
    }
}

#[async_trait]
impl ByteStore for StoreConnector {
    fn is_persistent(&self) -> bool {
        self.is_enabled()
    }

    async fn get(&self, url: &str) -> Result<Option<CacheRecord>> {
        match self.connect().await? {
            Some(store) => store.get(url).await,
            None => Ok(None),
        }
    }

    async fn put(&self, record: &CacheRecord) -> Result<()> {
        match self.connect().await? {
            Some(store) => store.put(record).await,
            None => Ok(()),
        }
    }

    async fn delete(&self, url: &str) -> Result<()> {
        match self.connect().await? {
            Some(store) => store.delete(url).await,
            None => Ok(()),
        }
    }

    async fn list_all(&self) -> Result<Vec<CacheRecord>> {
        match self.connect().await? {
            Some(store) => store.list_all().await,
            None => Ok(Vec::new()),
        }
    }

    async fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<bool> {
        match self.connect().await? {
            Some(store) => store.touch(url, at).await,
            None => Ok(false),
        }
    }

    async fn list_summaries(&self) -> Result<Vec<CacheEntrySummary>> {
        match self.connect().await? {
            Some(store) => store.list_summaries().await,
            None => Ok(Vec::new()),
        }
    }

    async fn delete_many(&self, urls: &[String]) -> Result<()> {
        match self.connect().await? {
            Some(store) => store.delete_many(urls).await,
            None => Ok(()),
        }
    }
    async fn put_and_trim(&self, record: &CacheRecord, limits: &CacheLimits) -> Result<Vec<String>> {
        match self.connect().await? {
            Some(store) => store.put_and_trim(record, limits).await,
            None => Ok(Vec::new()),
        }
    }
}
