pub mod connector;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::cache::{plan_eviction, CacheLimits};
use crate::domain::{CacheEntrySummary, CacheRecord};

pub use connector::{StoreConnector, StoreLocation};
pub use sqlite::SqliteByteStore;

/// Persistent key/value store for document payloads, keyed by URL.
///
/// Every operation is one atomic transaction: on error the prior state is
/// untouched.
#[async_trait]
pub trait ByteStore {
    /// `false` when the platform or configuration offers no persistent store.
    fn is_persistent(&self) -> bool {
        true
    }

    async fn get(&self, url: &str) -> Result<Option<CacheRecord>>;

    /// Insert or replace the record stored under `record.url`.
    async fn put(&self, record: &CacheRecord) -> Result<()>;

    async fn delete(&self, url: &str) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<CacheRecord>>;

    /// Refresh `last_accessed_at` without rewriting the payload.
    /// Returns `false` when no record exists for `url`.
    async fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Metadata for every record, oldest access first.
    async fn list_summaries(&self) -> Result<Vec<CacheEntrySummary>> {
        let mut summaries: Vec<_> = self.list_all().await?.iter().map(CacheRecord::summary).collect();
        summaries.sort_by_key(|s| s.last_accessed_at);
        Ok(summaries)
    }

    async fn delete_many(&self, urls: &[String]) -> Result<()> {
        for url in urls {
            self.delete(url).await?;
        }
        Ok(())
    }

    /// Upsert `record`, then evict least recently read records until
    /// `limits` hold. Returns the evicted URLs.
    ///
    /// Implementations should make the pair one unit of work so that a
    /// cancelled caller never leaves the store over its limits.
    async fn put_and_trim(&self, record: &CacheRecord, limits: &CacheLimits) -> Result<Vec<String>> {
        self.put(record).await?;
        let victims = plan_eviction(&self.list_summaries().await?, limits);
        if !victims.is_empty() {
            self.delete_many(&victims).await?;
        }
        Ok(victims)
    }
}
