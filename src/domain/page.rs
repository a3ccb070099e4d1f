use serde::{Deserialize, Serialize};

/// Natural page dimensions reported by the rendering provider, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Height over width, or `None` when the size cannot yield a usable ratio.
    pub fn ratio(&self) -> Option<f64> {
        if self.width > 0.0 && self.width.is_finite() && self.height > 0.0 && self.height.is_finite() {
            Some(self.height / self.width)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerMode {
    /// Vertical scroll through every page.
    #[default]
    Continuous,
    /// One page at a time, paged horizontally.
    Discrete,
}

impl ViewerMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewerMode::Continuous => ViewerMode::Discrete,
            ViewerMode::Discrete => ViewerMode::Continuous,
        }
    }
}
