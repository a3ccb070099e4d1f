use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::domain::ViewerMode;
use crate::viewer::lock;

/// Moves the viewport of the active presentation mode to a page.
///
/// Installed by a mode on mount and removed on unmount. Only one is active.
pub trait Navigator: Send + Sync {
    fn scroll_to_page(&self, page: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerState {
    pub mode: ViewerMode,
    /// Always within `1..=num_pages`.
    pub current_page: u32,
    pub num_pages: u32,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            mode: ViewerMode::default(),
            current_page: 1,
            num_pages: 1,
        }
    }
}

struct Inner {
    state: ViewerState,
    navigator: Option<Arc<dyn Navigator>>,
}

/// Single owner of [`ViewerState`].
///
/// `set_current_page` records what the viewport already shows and never
/// moves it; `go_to_page` records and then asks the navigator to move.
/// Keeping the two apart stops a mode's own scroll reports from turning into
/// programmatic scrolls.
pub struct NavigationController {
    inner: Mutex<Inner>,
    updates: watch::Sender<ViewerState>,
}

fn clamp_page(page: u32, num_pages: u32) -> u32 {
    page.clamp(1, num_pages.max(1))
}

impl NavigationController {
    pub fn new() -> Self {
        let state = ViewerState::default();
        let (updates, _) = watch::channel(state);
        Self {
            inner: Mutex::new(Inner {
                state,
                navigator: None,
            }),
            updates,
        }
    }

    pub fn state(&self) -> ViewerState {
        lock(&self.inner).state
    }

    pub fn current_page(&self) -> u32 {
        self.state().current_page
    }

    pub fn num_pages(&self) -> u32 {
        self.state().num_pages
    }

    pub fn mode(&self) -> ViewerMode {
        self.state().mode
    }

    /// Receives every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.updates.subscribe()
    }

    fn update<F: FnOnce(&mut ViewerState)>(&self, f: F) -> (ViewerState, Option<Arc<dyn Navigator>>) {
        let mut inner = lock(&self.inner);
        let before = inner.state;
        f(&mut inner.state);
        let after = inner.state;
        if after != before {
            self.updates.send_replace(after);
        }
        (after, inner.navigator.clone())
    }

    /// Record the document's page count and pull the current page back into
    /// range in the same update.
    pub fn set_num_pages(&self, num_pages: u32) {
        let (state, _) = self.update(|state| {
            state.num_pages = num_pages.max(1);
            state.current_page = clamp_page(state.current_page, state.num_pages);
        });
        tracing::debug!("Document has {} page(s), current page {}", state.num_pages, state.current_page);
    }

    /// Swap modes. The newly mounted mode snaps to the current page itself.
    pub fn set_mode(&self, mode: ViewerMode) {
        self.update(|state| state.mode = mode);
    }

    /// Record the page the viewport currently shows.
    pub fn set_current_page(&self, page: u32) {
        self.update(|state| state.current_page = clamp_page(page, state.num_pages));
    }

    /// Record `page` and move the viewport there if a navigator is installed.
    pub fn go_to_page(&self, page: u32) {
        let (state, navigator) =
            self.update(|state| state.current_page = clamp_page(page, state.num_pages));

        match navigator {
            Some(navigator) => navigator.scroll_to_page(state.current_page),
            None => tracing::debug!("No navigator installed, page {} recorded only", state.current_page),
        }
    }

    pub fn register_navigator(&self, navigator: Option<Arc<dyn Navigator>>) {
        lock(&self.inner).navigator = navigator;
    }

    /// Remove `navigator` if it is still the installed one. A mode unmounting
    /// after its successor mounted leaves the successor alone.
    pub fn unregister_navigator(&self, navigator: &Arc<dyn Navigator>) -> bool {
        let mut inner = lock(&self.inner);
        match &inner.navigator {
            Some(current) if Arc::ptr_eq(current, navigator) => {
                inner.navigator = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_navigator(&self) -> bool {
        lock(&self.inner).navigator.is_some()
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}
