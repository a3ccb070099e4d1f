use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::PageSize;

/// A rasterized page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub page: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major
    pub pixels: Vec<u8>,
}

/// The engine that turns an opened document into pixels. Pages are 1-based.
#[async_trait]
pub trait RenderingProvider {
    fn page_count(&self) -> u32;

    async fn page_natural_size(&self, page: u32) -> Result<PageSize>;

    async fn render_page(&self, page: u32, target_width: u32) -> Result<RenderedPage>;
}

/// Opens raw document bytes into a [`RenderingProvider`].
pub trait DocumentBackend {
    fn open(&self, bytes: Vec<u8>) -> Result<Arc<dyn RenderingProvider + Send + Sync>>;
}
