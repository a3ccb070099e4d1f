pub mod context;
pub mod error;

pub use context::ViewerContext;
pub use error::{FolioError, Result};
