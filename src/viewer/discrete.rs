//! Horizontal, one-page-at-a-time presentation.
//!
//! Each page is a slide. Slides near the current page render; the rest are
//! placeholders sized by their ratio so the carousel track keeps its geometry.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::domain::ViewerMode;
use crate::viewer::layout::{PageLayoutModel, Viewport};
use crate::viewer::liveness::Liveness;
use crate::viewer::lock;
use crate::viewer::navigation::{NavigationController, Navigator};
use crate::viewer::provider::RenderedPage;
use crate::viewer::render::{render_views, PageContent, PageState, PageView};

/// Slide the host carousel should move to. `jump` skips the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideRequest {
    pub index: usize,
    pub jump: bool,
}

struct CarouselState {
    viewport: Viewport,
    selected: usize,
    pending: Option<SlideRequest>,
}

struct DiscreteNavigator {
    state: Arc<Mutex<CarouselState>>,
}

impl Navigator for DiscreteNavigator {
    fn scroll_to_page(&self, page: u32) {
        let index = page.max(1) as usize - 1;
        let mut state = lock(&self.state);
        state.selected = index;
        state.pending = Some(SlideRequest { index, jump: false });
    }
}

pub struct DiscreteMode {
    controller: Arc<NavigationController>,
    layout: Arc<PageLayoutModel>,
    state: Arc<Mutex<CarouselState>>,
    navigator: Arc<dyn Navigator>,
    alive: Liveness,
}

impl DiscreteMode {
    /// Install the navigator and jump straight to the current page.
    pub fn mount(
        controller: Arc<NavigationController>,
        layout: Arc<PageLayoutModel>,
        viewport: Viewport,
    ) -> Self {
        let index = controller.current_page() as usize - 1;
        let state = Arc::new(Mutex::new(CarouselState {
            viewport,
            selected: index,
            pending: Some(SlideRequest { index, jump: true }),
        }));
        let navigator: Arc<dyn Navigator> = Arc::new(DiscreteNavigator {
            state: state.clone(),
        });
        controller.register_navigator(Some(navigator.clone()));
        tracing::debug!("Discrete mode mounted at slide {}", index);

        Self {
            controller,
            layout,
            state,
            navigator,
            alive: Liveness::new(),
        }
    }

    /// The carousel settled on slide `index`.
    pub fn on_select(&self, index: usize) -> Option<u32> {
        if !self.alive.is_alive() {
            return None;
        }
        lock(&self.state).selected = index;

        let page = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
        self.controller.set_current_page(page);
        Some(self.controller.current_page())
    }

    pub fn selected(&self) -> usize {
        lock(&self.state).selected
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        lock(&self.state).viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        lock(&self.state).viewport
    }

    pub fn take_slide_request(&self) -> Option<SlideRequest> {
        lock(&self.state).pending.take()
    }

    /// Pages handed to the renderer: the current page and its neighbours.
    pub fn near_pages(&self) -> RangeInclusive<u32> {
        let current = self.controller.current_page();
        let radius = self.layout.config().near_radius;
        let last = self.layout.page_count();
        current.saturating_sub(radius).max(1)..=current.saturating_add(radius).min(last)
    }

    /// One view per page, in order.
    pub fn slides(&self) -> Vec<PageView> {
        let viewport = self.viewport();
        let near = self.near_pages();

        (1..=self.layout.page_count())
            .map(|page| {
                let width = self.layout.width_for(page, viewport, ViewerMode::Discrete);
                let state = if self.layout.is_failed(page) {
                    PageState::Failed
                } else if near.contains(&page) {
                    PageState::Render
                } else {
                    PageState::Placeholder
                };
                PageView {
                    page,
                    width,
                    height: self.layout.height_for(page, width),
                    state,
                }
            })
            .collect()
    }

    /// Measure the near pages so their slides fit exactly.
    pub fn spawn_measurements(&self) -> Option<JoinHandle<()>> {
        self.layout.spawn_measurements(self.near_pages(), self.alive.clone())
    }

    /// Render every slide. Placeholders never reach the provider.
    pub async fn render(&self) -> Vec<(u32, PageContent)> {
        let slides = self.slides();
        render_views(self.layout.provider().as_ref(), &slides).await
    }

    /// Rendered near pages only.
    pub async fn render_near(&self) -> Vec<RenderedPage> {
        let near: Vec<PageView> = self
            .slides()
            .into_iter()
            .filter(|view| view.state == PageState::Render)
            .collect();

        render_views(self.layout.provider().as_ref(), &near)
            .await
            .into_iter()
            .filter_map(|(_, content)| match content {
                PageContent::Rendered(page) => Some(page),
                _ => None,
            })
            .collect()
    }
}

impl Drop for DiscreteMode {
    fn drop(&mut self) {
        self.alive.revoke();
        self.controller.unregister_navigator(&self.navigator);
        tracing::debug!("Discrete mode unmounted");
    }
}
