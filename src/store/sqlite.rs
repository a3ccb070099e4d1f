use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FolioError, Result};
use crate::cache::{plan_eviction, CacheLimits};
use crate::domain::{CacheEntrySummary, CacheRecord};
use crate::store::ByteStore;

pub struct SqliteByteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteByteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        migrations
            .to_latest(&mut conn)
            .map_err(|e| FolioError::StorageUnavailable(format!("migration failed: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                FolioError::TransactionFailed(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(1),
                    Some(e.to_string()),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| FolioError::Other(format!("store task failed: {e}")))?
    }

    fn to_micros(at: DateTime<Utc>) -> i64 {
        at.timestamp_micros()
    }

    fn from_micros(us: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(us).unwrap_or_default()
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CacheRecord> {
        let payload: Vec<u8> = row.get(2)?;
        Ok(CacheRecord {
            url: row.get(0)?,
            etag: row.get(1)?,
            size_bytes: payload.len() as u64,
            payload,
            last_accessed_at: Self::from_micros(row.get(3)?),
            updated_at: Self::from_micros(row.get(4)?),
        })
    }

    fn upsert(conn: &Connection, record: &CacheRecord) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO documents (url, etag, payload, size_bytes, last_accessed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(url) DO UPDATE SET
                etag = ?2, payload = ?3, size_bytes = ?4,
                last_accessed_at = ?5, updated_at = ?6",
            params![
                record.url,
                record.etag,
                record.payload,
                record.payload.len() as i64,
                Self::to_micros(record.last_accessed_at),
                Self::to_micros(record.updated_at),
            ],
        )
    }

    fn summaries(conn: &Connection) -> rusqlite::Result<Vec<CacheEntrySummary>> {
        let mut stmt = conn.prepare(
            "SELECT url, etag, size_bytes, last_accessed_at, updated_at
             FROM documents ORDER BY last_accessed_at ASC",
        )?;
        let summaries = stmt
            .query_map([], Self::summary_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntrySummary> {
        Ok(CacheEntrySummary {
            url: row.get(0)?,
            etag: row.get(1)?,
            size_bytes: row.get::<_, i64>(2)?.max(0) as u64,
            last_accessed_at: Self::from_micros(row.get(3)?),
            updated_at: Self::from_micros(row.get(4)?),
        })
    }
}

#[async_trait]
impl ByteStore for SqliteByteStore {
    async fn get(&self, url: &str) -> Result<Option<CacheRecord>> {
        let url = url.to_string();
        self.run(move |conn| {
            let record = conn
                .query_row(
                    "SELECT url, etag, payload, last_accessed_at, updated_at
                     FROM documents WHERE url = ?1",
                    params![url],
                    Self::record_from_row,
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn put(&self, record: &CacheRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |conn| {
            Self::upsert(conn, &record)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM documents WHERE url = ?1", params![url])?;
            Ok(())
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<CacheRecord>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url, etag, payload, last_accessed_at, updated_at
                 FROM documents ORDER BY last_accessed_at ASC",
            )?;
            let records = stmt
                .query_map([], Self::record_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await
    }

    async fn touch(&self, url: &str, at: DateTime<Utc>) -> Result<bool> {
        let url = url.to_string();
        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET last_accessed_at = ?1 WHERE url = ?2",
                params![Self::to_micros(at), url],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_summaries(&self) -> Result<Vec<CacheEntrySummary>> {
        self.run(|conn| Ok(Self::summaries(conn)?)).await
    }

    async fn delete_many(&self, urls: &[String]) -> Result<()> {
        let urls = urls.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            for url in &urls {
                tx.execute("DELETE FROM documents WHERE url = ?1", params![url])?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Upsert and eviction share one transaction on the blocking pool, which
    /// runs to completion even if the awaiting task is aborted.
    async fn put_and_trim(&self, record: &CacheRecord, limits: &CacheLimits) -> Result<Vec<String>> {
        let record = record.clone();
        let limits = *limits;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            Self::upsert(&tx, &record)?;
            let victims = plan_eviction(&Self::summaries(&tx)?, &limits);
            for url in &victims {
                tx.execute("DELETE FROM documents WHERE url = ?1", params![url])?;
            }
            tx.commit()?;
            Ok(victims)
        })
        .await
    }
}
