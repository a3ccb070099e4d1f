pub mod page;
pub mod record;

pub use page::{PageSize, ViewerMode};
pub use record::{store_now, CacheEntrySummary, CacheRecord};
