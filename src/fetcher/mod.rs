pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

#[derive(Debug)]
pub enum FetchResult {
    /// Any 2xx response
    Content {
        body: Vec<u8>,
        etag: Option<String>,
    },
    /// Content not modified (HTTP 304)
    NotModified,
}

/// Issues GETs for document bytes.
///
/// When `etag` is set the request is conditional (`If-None-Match`). Any status
/// outside 2xx and 304 is reported as [`FolioError::FetchFailed`](crate::app::FolioError::FetchFailed).
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchResult>;
}
