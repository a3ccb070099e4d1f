//! Fakes shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::app::{FolioError, Result};
use crate::domain::PageSize;
use crate::fetcher::{FetchResult, Fetcher};
use crate::viewer::provider::{DocumentBackend, RenderedPage, RenderingProvider};

/// A small but valid-looking PDF payload tagged with `marker`.
pub fn pdf_bytes(marker: &str) -> Vec<u8> {
    format!("%PDF-1.7\n% {marker}\n%%EOF\n").into_bytes()
}

enum Scripted {
    Content(Vec<u8>, Option<String>),
    NotModified,
    Status(u16),
}

/// Answers fetches from a queue and records the tokens it was sent.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_content(&self, body: Vec<u8>, etag: Option<&str>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Scripted::Content(body, etag.map(String::from)));
    }

    pub fn push_not_modified(&self) {
        self.responses.lock().unwrap().push_back(Scripted::NotModified);
    }

    pub fn push_status(&self, status: u16) {
        self.responses.lock().unwrap().push_back(Scripted::Status(status));
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, etag: Option<&str>) -> Result<FetchResult> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), etag.map(String::from)));

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Content(body, etag)) => Ok(FetchResult::Content { body, etag }),
            Some(Scripted::NotModified) => Ok(FetchResult::NotModified),
            Some(Scripted::Status(status)) => Err(FolioError::FetchFailed {
                url: url.to_string(),
                status,
            }),
            None => Err(FolioError::Other(format!("no scripted response for {url}"))),
        }
    }
}

pub const A4: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

/// Rendering provider with per-page sizes, failures and an optional gate that
/// holds size queries until the test releases them.
pub struct FakeProvider {
    page_count: u32,
    sizes: Mutex<HashMap<u32, VecDeque<PageSize>>>,
    failing: Mutex<HashSet<u32>>,
    gate: Option<Arc<Semaphore>>,
    pub size_queries: AtomicUsize,
    pub renders: Mutex<Vec<(u32, u32)>>,
}

impl FakeProvider {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            sizes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gate: None,
            size_queries: AtomicUsize::new(0),
            renders: Mutex::new(Vec::new()),
        }
    }

    /// Size queries block until `gate` receives permits.
    pub fn gated(page_count: u32, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(page_count)
        }
    }

    /// Queue the size returned by the next query for `page`.
    pub fn with_size(self, page: u32, size: PageSize) -> Self {
        self.sizes
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(size);
        self
    }

    pub fn failing(self, page: u32) -> Self {
        self.failing.lock().unwrap().insert(page);
        self
    }

    pub fn rendered_pages(&self) -> Vec<u32> {
        self.renders.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }
}

#[async_trait]
impl RenderingProvider for FakeProvider {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page_natural_size(&self, page: u32) -> Result<PageSize> {
        self.size_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| FolioError::Render(e.to_string()))?
                .forget();
        }
        if self.failing.lock().unwrap().contains(&page) {
            return Err(FolioError::Render(format!("page {page} is damaged")));
        }
        let next = self
            .sizes
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(|queue| queue.pop_front());
        Ok(next.unwrap_or(A4))
    }

    async fn render_page(&self, page: u32, target_width: u32) -> Result<RenderedPage> {
        if self.failing.lock().unwrap().contains(&page) {
            return Err(FolioError::Render(format!("page {page} is damaged")));
        }
        self.renders.lock().unwrap().push((page, target_width));
        let height = (target_width as f64 * A4.height / A4.width).round() as u32;
        Ok(RenderedPage {
            page,
            width: target_width,
            height,
            pixels: Vec::new(),
        })
    }
}

/// Opens every payload as a document with `page_count` pages, unless it
/// contains `broken`.
pub struct FakeBackend {
    pub page_count: u32,
}

impl DocumentBackend for FakeBackend {
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn RenderingProvider + Send + Sync>> {
        if bytes.windows(6).any(|w| w == b"broken") {
            return Err(FolioError::Render("unreadable cross-reference table".into()));
        }
        Ok(Arc::new(FakeProvider::new(self.page_count)))
    }
}
