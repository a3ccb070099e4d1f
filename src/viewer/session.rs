use std::sync::Arc;

use crate::cache::DocumentCache;
use crate::config::ViewerConfig;
use crate::domain::ViewerMode;
use crate::viewer::continuous::ContinuousMode;
use crate::viewer::discrete::DiscreteMode;
use crate::viewer::layout::{PageLayoutModel, Viewport};
use crate::viewer::navigation::NavigationController;
use crate::viewer::provider::DocumentBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Loading,
    Ready { num_pages: u32 },
    /// Pages are not shown while the document is in this state.
    Failed(String),
}

pub enum ActiveMode {
    Continuous(ContinuousMode),
    Discrete(DiscreteMode),
}

impl ActiveMode {
    fn mount(
        mode: ViewerMode,
        controller: Arc<NavigationController>,
        layout: Arc<PageLayoutModel>,
        viewport: Viewport,
    ) -> Self {
        match mode {
            ViewerMode::Continuous => Self::Continuous(ContinuousMode::mount(controller, layout, viewport)),
            ViewerMode::Discrete => Self::Discrete(DiscreteMode::mount(controller, layout, viewport)),
        }
    }

    pub fn kind(&self) -> ViewerMode {
        match self {
            Self::Continuous(_) => ViewerMode::Continuous,
            Self::Discrete(_) => ViewerMode::Discrete,
        }
    }

    fn set_viewport(&self, viewport: Viewport) {
        match self {
            Self::Continuous(mode) => mode.set_viewport(viewport),
            Self::Discrete(mode) => mode.set_viewport(viewport),
        }
    }
}

/// One open document: its status, layout, and the mounted presentation mode.
pub struct ViewerSession {
    config: ViewerConfig,
    controller: Arc<NavigationController>,
    viewport: Viewport,
    status: DocumentStatus,
    layout: Option<Arc<PageLayoutModel>>,
    active: Option<ActiveMode>,
}

impl ViewerSession {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            controller: Arc::new(NavigationController::new()),
            viewport: Viewport::default(),
            status: DocumentStatus::Loading,
            layout: None,
            active: None,
        }
    }

    /// Load `url` through the cache and open it with `backend`.
    ///
    /// Either failure leaves the session in [`DocumentStatus::Failed`] with no
    /// mode mounted. The error is reported through the status, not returned.
    pub async fn open(&mut self, cache: &DocumentCache, backend: &dyn DocumentBackend, url: &str) {
        self.active = None;
        self.layout = None;
        self.status = DocumentStatus::Loading;

        let bytes = match cache.load_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to load {}: {}", url, e);
                self.status = DocumentStatus::Failed(e.to_string());
                return;
            }
        };

        let provider = match backend.open(bytes) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::error!("Failed to open {}: {}", url, e);
                self.status = DocumentStatus::Failed(e.to_string());
                return;
            }
        };

        let num_pages = provider.page_count().max(1);
        self.controller.set_num_pages(num_pages);
        self.controller.set_current_page(1);

        let layout = Arc::new(PageLayoutModel::new(provider, self.config.clone()));
        self.active = Some(ActiveMode::mount(
            self.controller.mode(),
            self.controller.clone(),
            layout.clone(),
            self.viewport,
        ));
        self.layout = Some(layout);
        self.status = DocumentStatus::Ready { num_pages };
        tracing::info!("Opened {} ({} pages)", url, num_pages);
    }

    pub fn status(&self) -> &DocumentStatus {
        &self.status
    }

    pub fn controller(&self) -> &Arc<NavigationController> {
        &self.controller
    }

    pub fn layout(&self) -> Option<&Arc<PageLayoutModel>> {
        self.layout.as_ref()
    }

    pub fn active_mode(&self) -> Option<&ActiveMode> {
        self.active.as_ref()
    }

    pub fn mode(&self) -> ViewerMode {
        self.controller.mode()
    }

    /// Switch presentation. The new mode mounts before the old one is
    /// dropped, so the navigator is never missing in between.
    pub fn set_mode(&mut self, mode: ViewerMode) {
        let mounted = self.active.as_ref().map(ActiveMode::kind);
        if self.controller.mode() == mode && mounted.map_or(true, |kind| kind == mode) {
            return;
        }
        self.controller.set_mode(mode);

        if let Some(layout) = &self.layout {
            let next = ActiveMode::mount(mode, self.controller.clone(), layout.clone(), self.viewport);
            let previous = self.active.replace(next);
            drop(previous);
        }
    }

    /// Flip the mode and snap the new presentation to the current page.
    pub fn toggle_mode(&mut self) {
        self.set_mode(self.controller.mode().toggle());
        self.controller.go_to_page(self.controller.current_page());
    }

    pub fn go_to_page(&self, page: u32) {
        self.controller.go_to_page(page);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(active) = &self.active {
            active.set_viewport(viewport);
        }
    }
}
