use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A cached document payload keyed by its URL.
///
/// `size_bytes` always mirrors `payload.len()`; build records through
/// [`CacheRecord::new`] or [`CacheRecord::with_payload`] to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub url: String,
    pub etag: Option<String>,
    pub payload: Vec<u8>,
    pub size_bytes: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(url: String, payload: Vec<u8>, etag: Option<String>) -> Self {
        let now = store_now();
        Self {
            url,
            etag,
            size_bytes: payload.len() as u64,
            payload,
            last_accessed_at: now,
            updated_at: now,
        }
    }

    /// Replace the payload and token, refreshing both timestamps.
    pub fn with_payload(mut self, payload: Vec<u8>, etag: Option<String>) -> Self {
        let now = store_now();
        self.size_bytes = payload.len() as u64;
        self.payload = payload;
        self.etag = etag;
        self.last_accessed_at = now;
        self.updated_at = now;
        self
    }

    pub fn accessed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_accessed_at = at;
        self
    }

    pub fn summary(&self) -> CacheEntrySummary {
        CacheEntrySummary {
            url: self.url.clone(),
            etag: self.etag.clone(),
            size_bytes: self.size_bytes,
            last_accessed_at: self.last_accessed_at,
            updated_at: self.updated_at,
        }
    }
}

/// Current time at the precision the store keeps (microseconds).
pub fn store_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Record metadata without the payload, used for eviction scans and listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntrySummary {
    pub url: String,
    pub etag: Option<String>,
    pub size_bytes: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
