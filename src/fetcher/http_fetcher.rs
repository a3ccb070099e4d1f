use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use reqwest::{Client, StatusCode};

use crate::app::{FolioError, Result};
use crate::config::FetchConfig;
use crate::fetcher::{FetchResult, Fetcher};

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }
}

/// Headers for a document request. Intermediate HTTP caches are always asked
/// to revalidate; the stored token rides along as `If-None-Match`.
pub(crate) fn request_headers(etag: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if let Some(etag) = etag {
        match HeaderValue::from_str(etag) {
            Ok(value) => {
                headers.insert(IF_NONE_MATCH, value);
            }
            Err(_) => tracing::warn!("Ignoring unusable freshness token {:?}", etag),
        }
    }

    headers
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchResult> {
        let response = self
            .client
            .get(url)
            .headers(request_headers(etag))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchResult::NotModified);
        }

        if !status.is_success() {
            return Err(FolioError::FetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.bytes().await?.to_vec();
        tracing::debug!("Fetched {} bytes from {} (etag {:?})", body.len(), url, etag);

        Ok(FetchResult::Content { body, etag })
    }
}
