//! Per-page aspect ratios and the sizes derived from them.
//!
//! Ratios are discovered lazily from the rendering provider and written
//! once per page: the first measurement to land wins and later ones are
//! dropped. Everything that depends on them (row heights, slide sizes) reads
//! [`PageLayoutModel::revision`] to know when to recompute.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::{FolioError, Result};
use crate::config::ViewerConfig;
use crate::domain::ViewerMode;
use crate::viewer::liveness::Liveness;
use crate::viewer::lock;
use crate::viewer::provider::RenderingProvider;

const MIN_ZOOM: f64 = 0.25;
const MAX_ZOOM: f64 = 4.0;

/// Size of the area pages are laid out in, plus the user's zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            zoom: 1.0,
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[derive(Default)]
struct RatioTable {
    ratios: HashMap<u32, f64>,
    /// Page to the requester measuring it.
    in_flight: HashMap<u32, Liveness>,
    failed: HashSet<u32>,
}

pub struct PageLayoutModel {
    provider: Arc<dyn RenderingProvider + Send + Sync>,
    config: ViewerConfig,
    table: Mutex<RatioTable>,
    revision: watch::Sender<u64>,
}

impl PageLayoutModel {
    pub fn new(provider: Arc<dyn RenderingProvider + Send + Sync>, config: ViewerConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            provider,
            config,
            table: Mutex::new(RatioTable::default()),
            revision,
        }
    }

    pub fn provider(&self) -> &Arc<dyn RenderingProvider + Send + Sync> {
        &self.provider
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn page_count(&self) -> u32 {
        self.provider.page_count().max(1)
    }

    pub fn ratio(&self, page: u32) -> Option<f64> {
        lock(&self.table).ratios.get(&page).copied()
    }

    pub fn ratio_or_default(&self, page: u32) -> f64 {
        self.ratio(page).unwrap_or(self.config.default_ratio)
    }

    pub fn is_failed(&self, page: u32) -> bool {
        lock(&self.table).failed.contains(&page)
    }

    pub fn measured_pages(&self) -> usize {
        lock(&self.table).ratios.len()
    }

    /// Bumped every time a ratio lands or a page fails to measure.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Store `ratio` for `page` unless one is already known. Returns the
    /// ratio now in effect for the page.
    pub fn record_ratio(&self, page: u32, ratio: f64) -> f64 {
        let mut table = lock(&self.table);
        if let Some(existing) = table.ratios.get(&page) {
            return *existing;
        }
        table.ratios.insert(page, ratio);
        table.failed.remove(&page);
        drop(table);

        self.revision.send_modify(|rev| *rev += 1);
        ratio
    }

    /// Measure `page` if needed and return its ratio.
    pub async fn ensure_ratio(&self, page: u32) -> Result<f64> {
        match self.measure(page, None).await? {
            Some(ratio) => Ok(ratio),
            None => Err(FolioError::Render(format!("page {page} measurement discarded"))),
        }
    }

    /// Like [`ensure_ratio`](Self::ensure_ratio), but the measurement is
    /// dropped (`Ok(None)`) if `alive` was revoked while it was in flight.
    pub async fn ensure_ratio_while(&self, page: u32, alive: &Liveness) -> Result<Option<f64>> {
        self.measure(page, Some(alive)).await
    }

    async fn measure(&self, page: u32, alive: Option<&Liveness>) -> Result<Option<f64>> {
        if let Some(ratio) = self.ratio(page) {
            return Ok(Some(ratio));
        }

        let measured = self.provider.page_natural_size(page).await;
        if alive.is_some_and(|a| !a.is_alive()) {
            tracing::debug!("Discarding size of page {} after teardown", page);
            return Ok(None);
        }

        let ratio = measured.and_then(|size| {
            size.ratio().ok_or_else(|| {
                FolioError::Render(format!(
                    "page {page} has unusable size {}x{}",
                    size.width, size.height
                ))
            })
        });

        match ratio {
            Ok(ratio) => Ok(Some(self.record_ratio(page, ratio))),
            Err(e) => {
                tracing::warn!("Failed to measure page {}: {}", page, e);
                let marked = {
                    let mut table = lock(&self.table);
                    !table.ratios.contains_key(&page) && table.failed.insert(page)
                };
                if marked {
                    self.revision.send_modify(|rev| *rev += 1);
                }
                Err(e)
            }
        }
    }

    /// Measure every page in `pages` that is not known, failed, or already
    /// being measured for a live requester. Returns `None` when there is
    /// nothing to do.
    ///
    /// A page still in flight for a revoked requester is measured again: that
    /// result will be discarded, so waiting on it would leave the page at the
    /// default ratio.
    pub fn spawn_measurements<I>(self: &Arc<Self>, pages: I, alive: Liveness) -> Option<JoinHandle<()>>
    where
        I: IntoIterator<Item = u32>,
    {
        let pending: Vec<u32> = {
            let mut table = lock(&self.table);
            let mut pending = Vec::new();
            for page in pages {
                if table.ratios.contains_key(&page) || table.failed.contains(&page) {
                    continue;
                }
                if table.in_flight.get(&page).is_some_and(Liveness::is_alive) {
                    continue;
                }
                table.in_flight.insert(page, alive.clone());
                pending.push(page);
            }
            pending
        };

        if pending.is_empty() {
            return None;
        }

        let model = self.clone();
        Some(tokio::spawn(async move {
            let measurements = pending.iter().map(|&page| model.ensure_ratio_while(page, &alive));
            // Failures are already logged and recorded per page.
            let _ = join_all(measurements).await;

            let mut table = lock(&model.table);
            for page in &pending {
                if table.in_flight.get(page).is_some_and(|owner| owner.same_as(&alive)) {
                    table.in_flight.remove(page);
                }
            }
        }))
    }

    /// Laid-out width of `page`.
    ///
    /// Continuous mode only fits the width since the reader scrolls
    /// vertically. Discrete mode also fits the height so the whole page is
    /// visible at once.
    pub fn width_for(&self, page: u32, viewport: Viewport, mode: ViewerMode) -> f64 {
        fit_width(self.ratio_or_default(page), viewport, mode, &self.config)
    }

    pub fn height_for(&self, page: u32, width: f64) -> f64 {
        width * self.ratio_or_default(page)
    }
}

/// Pure sizing rule behind [`PageLayoutModel::width_for`].
pub fn fit_width(ratio: f64, viewport: Viewport, mode: ViewerMode, config: &ViewerConfig) -> f64 {
    let available = if viewport.width > 0.0 {
        (viewport.width - config.horizontal_padding).max(0.0)
    } else {
        config.fallback_width
    };
    let mut fit = available.min(config.max_page_width);

    if mode == ViewerMode::Discrete && viewport.height > 0.0 && ratio > 0.0 {
        let available_height = (viewport.height - config.vertical_padding).max(0.0);
        fit = fit.min(available_height / ratio);
    }

    fit.max(config.min_page_width) * viewport.effective_zoom()
}
