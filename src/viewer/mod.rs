//! Page virtualization and navigation.
//!
//! [`NavigationController`] owns the current page. A presentation mode
//! ([`ContinuousMode`] or [`DiscreteMode`]) reports what the viewport shows
//! through `set_current_page` and installs a [`Navigator`] so that
//! `go_to_page` can move the viewport. [`PageLayoutModel`] sizes pages from
//! lazily measured aspect ratios.

pub mod continuous;
pub mod discrete;
pub mod layout;
pub mod liveness;
pub mod navigation;
pub mod provider;
pub mod render;
pub mod session;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use continuous::{ContinuousMode, ScrollRequest, VirtualRow};
pub use discrete::{DiscreteMode, SlideRequest};
pub use layout::{PageLayoutModel, Viewport};
pub use liveness::Liveness;
pub use navigation::{NavigationController, Navigator, ViewerState};
pub use provider::{DocumentBackend, RenderedPage, RenderingProvider};
pub use render::{render_views, PageContent, PageState, PageView};
pub use session::{ActiveMode, DocumentStatus, ViewerSession};

/// Viewer state stays consistent across a panic in a holder, so a poisoned
/// guard is taken over rather than propagated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
