//! Vertical, virtualized presentation.
//!
//! Every page is a row whose height is `reader_width * ratio(page)`, using
//! the default ratio until the page has been measured. Only the rows that
//! intersect the viewport, plus `overscan` on each side, are materialized.
//! Rows are recomputed whenever a ratio lands, the page count changes, or the
//! reader width changes.

use std::ops::Range;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::domain::ViewerMode;
use crate::viewer::layout::{PageLayoutModel, Viewport};
use crate::viewer::liveness::Liveness;
use crate::viewer::lock;
use crate::viewer::navigation::{NavigationController, Navigator};
use crate::viewer::render::{PageState, PageView};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualRow {
    pub page: u32,
    pub start: f64,
    pub size: f64,
}

impl VirtualRow {
    pub fn end(&self) -> f64 {
        self.start + self.size
    }

    pub fn center(&self) -> f64 {
        self.start + self.size / 2.0
    }
}

/// Scroll offset the host should apply to its scroll container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RowsKey {
    revision: u64,
    reader_width: f64,
    count: u32,
}

struct ScrollState {
    viewport: Viewport,
    scroll_top: f64,
    suppress_until: Option<Instant>,
    pending: Option<ScrollRequest>,
    rows: Vec<VirtualRow>,
    rows_key: Option<RowsKey>,
}

impl ScrollState {
    fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            scroll_top: 0.0,
            suppress_until: None,
            pending: None,
            rows: Vec::new(),
            rows_key: None,
        }
    }

    fn reader_width(&self, layout: &PageLayoutModel) -> f64 {
        // Continuous fitting ignores the ratio, any page gives the same width.
        layout.width_for(1, self.viewport, ViewerMode::Continuous)
    }

    /// Recompute row geometry if anything it depends on moved.
    fn refresh(&mut self, layout: &PageLayoutModel) {
        let key = RowsKey {
            revision: layout.revision(),
            reader_width: self.reader_width(layout),
            count: layout.page_count(),
        };
        if self.rows_key == Some(key) {
            return;
        }

        let gap = layout.config().page_gap;
        let mut rows = Vec::with_capacity(key.count as usize);
        let mut start = 0.0;
        for page in 1..=key.count {
            let size = (key.reader_width * layout.ratio_or_default(page)).ceil();
            rows.push(VirtualRow { page, start, size });
            start += size + gap;
        }

        self.rows = rows;
        self.rows_key = Some(key);
    }

    fn total_height(&self) -> f64 {
        self.rows.last().map(VirtualRow::end).unwrap_or(0.0)
    }

    fn max_scroll(&self) -> f64 {
        (self.total_height() - self.viewport.height).max(0.0)
    }

    /// Rows intersecting the viewport, widened by `overscan` on each side.
    fn window(&self, overscan: usize) -> Range<usize> {
        if self.rows.is_empty() {
            return 0..0;
        }
        let top = self.scroll_top;
        let bottom = top + self.viewport.height.max(1.0);

        let first = self
            .rows
            .partition_point(|row| row.end() <= top)
            .min(self.rows.len() - 1);
        let last = self.rows.partition_point(|row| row.start < bottom).max(first + 1);

        first.saturating_sub(overscan)..(last + overscan).min(self.rows.len())
    }

    /// Page the viewport shows, or `None` while programmatic scrolls settle.
    fn detect_page(&self, now: Instant, overscan: usize, edge_tolerance: f64) -> Option<u32> {
        let count = self.rows.len() as u32;
        if count == 0 {
            return None;
        }

        if self.scroll_top <= edge_tolerance {
            return Some(1);
        }
        if self.scroll_top + self.viewport.height >= self.total_height() - edge_tolerance {
            return Some(count);
        }
        if self.suppress_until.is_some_and(|until| now < until) {
            return None;
        }

        let center = self.scroll_top + self.viewport.height / 2.0;
        self.rows[self.window(overscan)]
            .iter()
            .min_by(|a, b| {
                let da = (a.center() - center).abs();
                let db = (b.center() - center).abs();
                da.total_cmp(&db)
            })
            .map(|row| row.page)
    }

    fn scroll_to_page(&mut self, page: u32, layout: &PageLayoutModel, now: Instant) {
        self.refresh(layout);
        let index = (page.max(1) as usize - 1).min(self.rows.len().saturating_sub(1));
        let offset = self
            .rows
            .get(index)
            .map(|row| row.start.min(self.max_scroll()))
            .unwrap_or(0.0);

        self.scroll_top = offset;
        self.suppress_until = Some(now + layout.config().suppress_window());
        self.pending = Some(ScrollRequest { offset });
    }
}

struct ContinuousNavigator {
    state: Arc<Mutex<ScrollState>>,
    layout: Arc<PageLayoutModel>,
}

impl Navigator for ContinuousNavigator {
    fn scroll_to_page(&self, page: u32) {
        lock(&self.state).scroll_to_page(page, &self.layout, Instant::now());
    }
}

/// Continuous-scroll presentation mode.
///
/// Mounting installs its navigator on the controller and scrolls to the
/// current page. Dropping it revokes its liveness and removes the navigator.
pub struct ContinuousMode {
    controller: Arc<NavigationController>,
    layout: Arc<PageLayoutModel>,
    state: Arc<Mutex<ScrollState>>,
    navigator: Arc<dyn Navigator>,
    alive: Liveness,
}

impl ContinuousMode {
    pub fn mount(
        controller: Arc<NavigationController>,
        layout: Arc<PageLayoutModel>,
        viewport: Viewport,
    ) -> Self {
        let state = Arc::new(Mutex::new(ScrollState::new(viewport)));
        let navigator: Arc<dyn Navigator> = Arc::new(ContinuousNavigator {
            state: state.clone(),
            layout: layout.clone(),
        });

        controller.register_navigator(Some(navigator.clone()));
        navigator.scroll_to_page(controller.current_page());
        tracing::debug!("Continuous mode mounted at page {}", controller.current_page());

        Self {
            controller,
            layout,
            state,
            navigator,
            alive: Liveness::new(),
        }
    }

    /// Host scroll event. Reports the detected page to the controller and
    /// returns it.
    pub fn on_scroll(&self, scroll_top: f64) -> Option<u32> {
        if !self.alive.is_alive() {
            return None;
        }

        let config = self.layout.config();
        let page = {
            let mut state = lock(&self.state);
            state.refresh(&self.layout);
            state.scroll_top = scroll_top.max(0.0);
            state.detect_page(Instant::now(), config.overscan, config.edge_tolerance)
        }?;

        self.controller.set_current_page(page);
        Some(page)
    }

    /// New viewport size or zoom. A width or zoom change invalidates every
    /// row height, so the view re-anchors on the current page.
    pub fn set_viewport(&self, viewport: Viewport) {
        let mut state = lock(&self.state);
        let previous = state.viewport;
        state.viewport = viewport;

        if previous.width != viewport.width || previous.zoom != viewport.zoom {
            state.scroll_to_page(self.controller.current_page(), &self.layout, Instant::now());
        } else {
            state.refresh(&self.layout);
        }
    }

    pub fn viewport(&self) -> Viewport {
        lock(&self.state).viewport
    }

    pub fn scroll_top(&self) -> f64 {
        lock(&self.state).scroll_top
    }

    pub fn reader_width(&self) -> f64 {
        lock(&self.state).reader_width(&self.layout)
    }

    pub fn total_height(&self) -> f64 {
        let mut state = lock(&self.state);
        state.refresh(&self.layout);
        state.total_height()
    }

    /// Geometry of every page.
    pub fn rows(&self) -> Vec<VirtualRow> {
        let mut state = lock(&self.state);
        state.refresh(&self.layout);
        state.rows.clone()
    }

    /// Rows to materialize right now.
    pub fn visible_rows(&self) -> Vec<VirtualRow> {
        let mut state = lock(&self.state);
        state.refresh(&self.layout);
        let window = state.window(self.layout.config().overscan);
        state.rows[window].to_vec()
    }

    /// Materialized rows as views for the page widget.
    pub fn page_views(&self) -> Vec<PageView> {
        let width = self.reader_width();
        self.visible_rows()
            .into_iter()
            .map(|row| PageView {
                page: row.page,
                width,
                height: row.size,
                state: if self.layout.is_failed(row.page) {
                    PageState::Failed
                } else {
                    PageState::Render
                },
            })
            .collect()
    }

    /// Offset the host has yet to apply, if any.
    pub fn take_scroll_request(&self) -> Option<ScrollRequest> {
        lock(&self.state).pending.take()
    }

    pub fn is_suppressed(&self) -> bool {
        lock(&self.state)
            .suppress_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Measure materialized pages whose ratio is still unknown.
    pub fn spawn_measurements(&self) -> Option<JoinHandle<()>> {
        let pages: Vec<u32> = self.visible_rows().iter().map(|row| row.page).collect();
        self.layout.spawn_measurements(pages, self.alive.clone())
    }
}

impl Drop for ContinuousMode {
    fn drop(&mut self) {
        self.alive.revoke();
        self.controller.unregister_navigator(&self.navigator);
        tracing::debug!("Continuous mode unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::domain::PageSize;
    use crate::testing::FakeProvider;
    use crate::viewer::provider::RenderingProvider;
    use std::time::Duration;

    // 1032px wide viewport => 1024px reader width => 1449px rows at the
    // default ratio, 4px gap.
    const ROW: f64 = 1449.0;
    const STRIDE: f64 = ROW + 4.0;

    fn setup(pages: u32) -> (Arc<NavigationController>, Arc<PageLayoutModel>) {
        setup_with(FakeProvider::new(pages))
    }

    fn setup_with(provider: FakeProvider) -> (Arc<NavigationController>, Arc<PageLayoutModel>) {
        let pages = provider.page_count();
        let layout = Arc::new(PageLayoutModel::new(Arc::new(provider), ViewerConfig::default()));
        let controller = Arc::new(NavigationController::new());
        controller.set_num_pages(pages);
        (controller, layout)
    }

    fn viewport() -> Viewport {
        Viewport::new(1032.0, 900.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rows_use_default_ratio_until_measured() {
        let (controller, layout) = setup(3);
        let mode = ContinuousMode::mount(controller, layout.clone(), viewport());

        let rows = mode.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], VirtualRow { page: 1, start: 0.0, size: ROW });
        assert_eq!(rows[1].start, STRIDE);
        assert_eq!(mode.total_height(), 3.0 * ROW + 2.0 * 4.0);

        layout.record_ratio(1, 0.5);
        let rows = mode.rows();
        assert_eq!(rows[0].size, 512.0);
        assert_eq!(rows[1].start, 516.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_window_is_materialized() {
        let (controller, layout) = setup(40);
        let mode = ContinuousMode::mount(controller, layout, viewport());
        tokio::time::advance(Duration::from_millis(400)).await;

        mode.on_scroll(STRIDE * 20.0 + 10.0);
        let pages: Vec<u32> = mode.visible_rows().iter().map(|r| r.page).collect();
        // Only row 21 intersects the viewport; two rows of overscan each side.
        assert_eq!(pages, vec![19, 20, 21, 22, 23]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_top_zero_forces_first_page() {
        let (controller, layout) = setup(10);
        // Tall first page so the nearest centre at the top is not page 1.
        layout.record_ratio(1, 0.1);
        let mode = ContinuousMode::mount(controller.clone(), layout, Viewport::new(1032.0, 3000.0));
        controller.set_current_page(4);
        tokio::time::advance(Duration::from_millis(400)).await;

        assert_eq!(mode.on_scroll(0.0), Some(1));
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bottom_edge_forces_last_page() {
        let (controller, layout) = setup(10);
        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        tokio::time::advance(Duration::from_millis(400)).await;

        let bottom = mode.total_height() - 900.0 - 1.5;
        assert_eq!(mode.on_scroll(bottom), Some(10));
        assert_eq!(controller.current_page(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_nearest_center_wins() {
        let (controller, layout) = setup(10);
        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        tokio::time::advance(Duration::from_millis(400)).await;

        // Viewport centre sits inside row 4 (index 3).
        let top = STRIDE * 3.0 + ROW / 2.0 - 450.0;
        assert_eq!(mode.on_scroll(top), Some(4));
        assert_eq!(controller.current_page(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_go_to_page_scrolls_and_suppresses_detection() {
        let (controller, layout) = setup(10);
        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        tokio::time::advance(Duration::from_millis(400)).await;
        mode.take_scroll_request();

        controller.go_to_page(5);
        assert_eq!(
            mode.take_scroll_request(),
            Some(ScrollRequest { offset: STRIDE * 4.0 })
        );
        assert_eq!(mode.scroll_top(), STRIDE * 4.0);

        // Settling animation passes through page 3 within the window.
        tokio::time::advance(Duration::from_millis(200)).await;
        let page_three = STRIDE * 2.0 + ROW / 2.0 - 450.0;
        assert_eq!(mode.on_scroll(page_three), None);
        assert_eq!(controller.current_page(), 5);

        // After the window the same position is reported normally.
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(mode.on_scroll(page_three), Some(3));
        assert_eq!(controller.current_page(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_syncs_to_current_page() {
        let (controller, layout) = setup(10);
        controller.set_current_page(3);

        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        assert_eq!(
            mode.take_scroll_request(),
            Some(ScrollRequest { offset: STRIDE * 2.0 })
        );
        assert!(mode.is_suppressed());
        assert!(controller.has_navigator());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_offset_clamped_to_end() {
        let (controller, layout) = setup(3);
        let mode = ContinuousMode::mount(controller.clone(), layout, Viewport::new(1032.0, 2000.0));

        controller.go_to_page(3);
        let request = mode.take_scroll_request().unwrap();
        assert_eq!(request.offset, mode.total_height() - 2000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_width_change_reanchors_current_page() {
        let (controller, layout) = setup(10);
        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        controller.go_to_page(4);
        mode.take_scroll_request();

        mode.set_viewport(Viewport::new(608.0, 900.0));
        assert_eq!(mode.reader_width(), 600.0);
        let expected = 4.0 * 3.0 + 3.0 * (600.0f64 * 1.4142).ceil();
        assert_eq!(mode.take_scroll_request(), Some(ScrollRequest { offset: expected }));

        // Height-only change keeps position.
        mode.set_viewport(Viewport::new(608.0, 700.0));
        assert_eq!(mode.take_scroll_request(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_scales_rows() {
        let (controller, layout) = setup(2);
        let mode = ContinuousMode::mount(controller, layout, Viewport::new(608.0, 900.0));
        let before = mode.rows()[0].size;

        mode.set_viewport(Viewport::new(608.0, 900.0).with_zoom(2.0));
        assert_eq!(mode.reader_width(), 1200.0);
        assert!(mode.rows()[0].size > before * 1.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_clears_navigator_and_stops_reports() {
        let (controller, layout) = setup(10);
        let mode = ContinuousMode::mount(controller.clone(), layout, viewport());
        assert!(controller.has_navigator());

        drop(mode);
        assert!(!controller.has_navigator());
        controller.go_to_page(6);
        assert_eq!(controller.current_page(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measurements_update_rows() {
        let provider = FakeProvider::new(4).with_size(1, PageSize::new(1000.0, 500.0));
        let (controller, layout) = setup_with(provider);
        let mode = ContinuousMode::mount(controller, layout.clone(), viewport());

        let handle = mode.spawn_measurements().unwrap();
        handle.await.unwrap();

        assert_eq!(layout.ratio(1), Some(0.5));
        assert_eq!(mode.rows()[0].size, 512.0);
        assert_eq!(layout.measured_pages(), 3);

        // The shorter first row pulls page 4 into the overscan.
        mode.spawn_measurements().unwrap().await.unwrap();
        assert_eq!(layout.measured_pages(), 4);
        assert!(mode.spawn_measurements().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_measurement_yields_failed_view() {
        let provider = FakeProvider::new(3).failing(2);
        let (controller, layout) = setup_with(provider);
        let mode = ContinuousMode::mount(controller, layout, viewport());
        mode.spawn_measurements().unwrap().await.unwrap();

        let views = mode.page_views();
        let states: Vec<_> = views.iter().map(|v| (v.page, v.state)).collect();
        assert_eq!(
            states,
            vec![
                (1, PageState::Render),
                (2, PageState::Failed),
                (3, PageState::Render),
            ]
        );
    }
}
