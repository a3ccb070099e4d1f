use futures::future::join_all;

use crate::viewer::provider::{RenderedPage, RenderingProvider};

/// What a page slot should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Rasterize the page.
    Render,
    /// Reserve the slot at the page's size without rendering.
    Placeholder,
    /// The page could not be measured or rendered.
    Failed,
}

/// A sized page slot produced by a presentation mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageView {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    pub state: PageState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Rendered(RenderedPage),
    Placeholder { width: f64, height: f64 },
    Failed { width: f64, height: f64, message: String },
}

/// Resolve `views` into content. Only [`PageState::Render`] views reach the
/// provider, concurrently. A page that fails to render becomes
/// [`PageContent::Failed`] without affecting its neighbours.
pub async fn render_views(
    provider: &(dyn RenderingProvider + Send + Sync),
    views: &[PageView],
) -> Vec<(u32, PageContent)> {
    let jobs = views.iter().map(|view| async move {
        let content = match view.state {
            PageState::Placeholder => PageContent::Placeholder {
                width: view.width,
                height: view.height,
            },
            PageState::Failed => PageContent::Failed {
                width: view.width,
                height: view.height,
                message: format!("page {} is unavailable", view.page),
            },
            PageState::Render => {
                let target_width = view.width.round().max(1.0) as u32;
                match provider.render_page(view.page, target_width).await {
                    Ok(rendered) => PageContent::Rendered(rendered),
                    Err(e) => {
                        tracing::warn!("Failed to render page {}: {}", view.page, e);
                        PageContent::Failed {
                            width: view.width,
                            height: view.height,
                            message: e.to_string(),
                        }
                    }
                }
            }
        };
        (view.page, content)
    });

    join_all(jobs).await
}
