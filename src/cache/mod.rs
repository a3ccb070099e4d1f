//! Document byte cache.
//!
//! [`DocumentCache::load_bytes`] answers from the store when it can and
//! revalidates in the background, so a cached copy never waits on the
//! network. Misses fetch, validate, store and trim.

pub mod eviction;
pub mod integrity;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use url::Url;

use crate::app::{FolioError, Result};
use crate::domain::{store_now, CacheEntrySummary, CacheRecord};
use crate::fetcher::{FetchResult, Fetcher};
use crate::store::ByteStore;

pub use eviction::{plan_eviction, CacheLimits, MAX_CACHE_BYTES, MAX_CACHE_ENTRIES};
pub use integrity::looks_like_pdf;

struct Shared {
    store: Arc<dyn ByteStore + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    limits: CacheLimits,
}

pub struct DocumentCache {
    shared: Arc<Shared>,
    tasks: Mutex<JoinSet<()>>,
}

impl DocumentCache {
    pub fn new(
        store: Arc<dyn ByteStore + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        limits: CacheLimits,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                fetcher,
                limits,
            }),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn limits(&self) -> CacheLimits {
        self.shared.limits
    }

    /// Bytes for `url`.
    ///
    /// A valid cached copy is returned as-is and revalidated in the
    /// background; the returned value never changes after the fact.
    pub async fn load_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Url::parse(url)?;

        if !self.shared.store.is_persistent() {
            tracing::debug!("No persistent store, fetching {} directly", url);
            return self.shared.fetch_uncached(url).await;
        }

        if let Some(record) = self.shared.cached_record(url).await {
            tracing::info!("Serving {} from cache ({} bytes)", url, record.size_bytes);
            let bytes = record.payload.clone();
            self.spawn_revalidation(record);
            return Ok(bytes);
        }

        self.shared.fetch_and_store(url).await
    }

    fn spawn_revalidation(&self, record: CacheRecord) {
        let shared = self.shared.clone();
        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            shared.revalidate(record).await;
        });
    }

    /// Wait for every background revalidation spawned so far.
    pub async fn wait_idle(&self) {
        let mut pending = std::mem::take(&mut *self.lock_tasks());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                if !e.is_cancelled() {
                    tracing::warn!("Background revalidation panicked: {}", e);
                }
            }
        }
    }

    /// Abort outstanding background work. Dropping the cache does the same.
    pub fn shutdown(&self) {
        self.lock_tasks().abort_all();
    }

    pub fn background_tasks(&self) -> usize {
        self.lock_tasks().len()
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn entries(&self) -> Result<Vec<CacheEntrySummary>> {
        self.shared.store.list_summaries().await
    }

    pub async fn remove(&self, url: &str) -> Result<()> {
        self.shared.store.delete(url).await
    }

    pub async fn clear(&self) -> Result<usize> {
        let urls: Vec<String> = self
            .shared
            .store
            .list_summaries()
            .await?
            .into_iter()
            .map(|s| s.url)
            .collect();
        self.shared.store.delete_many(&urls).await?;
        Ok(urls.len())
    }

    /// Enforce the limits now. Returns the evicted URLs.
    pub async fn trim(&self) -> Result<Vec<String>> {
        self.shared.trim().await
    }
}

impl Shared {
    /// A cached record that passes the integrity check. Corrupt records are
    /// deleted; store failures read as a miss.
    async fn cached_record(&self, url: &str) -> Option<CacheRecord> {
        match self.store.get(url).await {
            Ok(Some(record)) if looks_like_pdf(&record.payload) => Some(record),
            Ok(Some(record)) => {
                tracing::warn!(
                    "Cached copy of {} is not a PDF ({} bytes), discarding",
                    url,
                    record.size_bytes
                );
                if let Err(e) = self.store.delete(url).await {
                    tracing::warn!("Failed to delete corrupt cache entry {}: {}", url, e);
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache lookup for {} failed, going to network: {}", url, e);
                None
            }
        }
    }

    async fn fetch_uncached(&self, url: &str) -> Result<Vec<u8>> {
        match self.fetcher.fetch(url, None).await? {
            FetchResult::Content { body, .. } => Ok(body),
            FetchResult::NotModified => Err(FolioError::FetchFailed {
                url: url.to_string(),
                status: 304,
            }),
        }
    }

    async fn fetch_and_store(&self, url: &str) -> Result<Vec<u8>> {
        match self.fetcher.fetch(url, None).await? {
            FetchResult::NotModified => Err(FolioError::CacheInconsistent(format!(
                "{url} answered 304 to an unconditional request"
            ))),
            FetchResult::Content { body, etag } => {
                if looks_like_pdf(&body) {
                    let record = CacheRecord::new(url.to_string(), body.clone(), etag);
                    if let Err(e) = self.persist(&record).await {
                        tracing::warn!("Failed to cache {}: {}", url, e);
                    }
                } else {
                    tracing::warn!("Response for {} is not a PDF, not caching", url);
                }
                Ok(body)
            }
        }
    }

    /// Upsert then trim, strictly in that order and as one store operation.
    async fn persist(&self, record: &CacheRecord) -> Result<()> {
        let evicted = self.store.put_and_trim(record, &self.limits).await?;
        if !evicted.is_empty() {
            tracing::info!("Evicted {} cached document(s) after storing {}", evicted.len(), record.url);
            for url in &evicted {
                tracing::debug!("Evicting {}", url);
            }
        }
        Ok(())
    }

    async fn trim(&self) -> Result<Vec<String>> {
        let entries = self.store.list_summaries().await?;
        let victims = plan_eviction(&entries, &self.limits);
        if victims.is_empty() {
            return Ok(victims);
        }

        tracing::info!("Evicting {} cached document(s)", victims.len());
        for url in &victims {
            tracing::debug!("Evicting {}", url);
        }
        self.store.delete_many(&victims).await?;
        Ok(victims)
    }

    async fn touch(&self, url: &str) {
        if let Err(e) = self.store.touch(url, store_now()).await {
            tracing::debug!("Failed to touch {}: {}", url, e);
        }
    }

    /// Conditional refetch of a cached record. Never fails: the cached copy
    /// stays authoritative whatever happens here.
    ///
    /// The read is recorded before the network is involved, so recency holds
    /// even if the task is aborted mid-fetch.
    async fn revalidate(&self, record: CacheRecord) {
        let url = record.url.clone();
        self.touch(&url).await;

        match self.fetcher.fetch(&url, record.etag.as_deref()).await {
            Ok(FetchResult::NotModified) => {
                tracing::debug!("{} not modified", url);
            }
            Ok(FetchResult::Content { body, etag }) if looks_like_pdf(&body) => {
                tracing::info!("{} changed upstream, refreshing cache ({} bytes)", url, body.len());
                let refreshed = record.with_payload(body, etag);
                if let Err(e) = self.persist(&refreshed).await {
                    tracing::warn!("Failed to store refreshed {}: {}", url, e);
                }
            }
            Ok(FetchResult::Content { body, .. }) => {
                tracing::warn!(
                    "Revalidation of {} returned {} bytes that are not a PDF, keeping cached copy",
                    url,
                    body.len()
                );
            }
            Err(e) => {
                tracing::debug!("Revalidation of {} failed, keeping cached copy: {}", url, e);
            }
        }
    }
}
