use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Persistent store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Store transaction failed: {0}")]
    TransactionFailed(#[from] rusqlite::Error),

    #[error("Failed to fetch {url}: HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cache inconsistent: {0}")]
    CacheInconsistent(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Rendering error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FolioError {
    /// HTTP status carried by a failed fetch, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FolioError::FetchFailed { status, .. } => Some(*status),
            FolioError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
