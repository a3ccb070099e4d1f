//! Configuration management for folio.
//!
//! Configuration is read from `~/.config/folio/config.toml`.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{CacheLimits, MAX_CACHE_BYTES, MAX_CACHE_ENTRIES};
use crate::store::StoreLocation;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub viewer: ViewerConfig,
}

/// Persistent document cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the on-disk store (default: true)
    pub enabled: bool,

    /// Maximum number of cached documents (default: 5)
    pub max_entries: usize,

    /// Maximum total payload size in bytes (default: 300 MiB)
    pub max_bytes: u64,

    /// Database location (default: `<data_dir>/folio/cache.db`)
    pub db_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: MAX_CACHE_ENTRIES,
            max_bytes: MAX_CACHE_BYTES,
            db_path: None,
        }
    }
}

impl CacheConfig {
    pub fn limits(&self) -> CacheLimits {
        CacheLimits {
            max_entries: self.max_entries,
            max_bytes: self.max_bytes,
        }
    }

    /// Where the store lives. Disabled when turned off or when the platform
    /// has no data directory.
    pub fn location(&self) -> StoreLocation {
        if !self.enabled {
            return StoreLocation::Disabled;
        }
        match &self.db_path {
            Some(path) => StoreLocation::Path(path.clone()),
            None => match dirs::data_dir() {
                Some(dir) => StoreLocation::Path(dir.join("folio").join("cache.db")),
                None => StoreLocation::Disabled,
            },
        }
    }
}

/// HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: concat!("folio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Page layout and navigation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Height/width assumed for pages not yet measured (ISO paper)
    pub default_ratio: f64,

    /// Widest a page is laid out before zoom
    pub max_page_width: f64,

    /// Narrowest a page is ever laid out
    pub min_page_width: f64,

    /// Width used before the viewport has been measured
    pub fallback_width: f64,

    /// Horizontal space reserved around a page
    pub horizontal_padding: f64,

    /// Vertical space reserved around a page in discrete mode
    pub vertical_padding: f64,

    /// Gap between pages in continuous mode
    pub page_gap: f64,

    /// Extra rows materialized on each side of the viewport
    pub overscan: usize,

    /// Pages within this distance of the current page are rendered in
    /// discrete mode
    pub near_radius: u32,

    /// How long scroll-driven page detection stays muted after a
    /// programmatic scroll, in milliseconds
    pub suppress_window_ms: u64,

    /// Distance from the top or bottom edge that counts as "at the edge"
    pub edge_tolerance: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_ratio: 1.4142,
            max_page_width: 1024.0,
            min_page_width: 280.0,
            fallback_width: 800.0,
            horizontal_padding: 8.0,
            vertical_padding: 16.0,
            page_gap: 4.0,
            overscan: 2,
            near_radius: 2,
            suppress_window_ms: 350,
            edge_tolerance: 2.0,
        }
    }
}

impl ViewerConfig {
    pub fn suppress_window(&self) -> Duration {
        Duration::from_millis(self.suppress_window_ms)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(config_path)
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/folio/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("folio").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# folio configuration

[cache]
# Keep the last fetched documents on disk and revalidate them in the background
enabled = true

# Least recently read documents are evicted once either limit is exceeded
max_entries = 5
max_bytes = 314572800

# db_path = "/path/to/cache.db"

[fetch]
timeout_secs = 60

[viewer]
# Height/width used until a page has been measured
default_ratio = 1.4142

max_page_width = 1024.0
min_page_width = 280.0

# Gap between pages when scrolling vertically
page_gap = 4.0

# Rows kept rendered above and below the viewport
overscan = 2

# Pages rendered around the current one when paging horizontally
near_radius = 2

# Scroll-driven page tracking pauses this long after a jump (ms)
suppress_window_ms = 350
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.cache.max_bytes, 300 * 1024 * 1024);
        assert_eq!(config.viewer.suppress_window(), Duration::from_millis(350));
        assert_eq!(config.viewer.near_radius, 2);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[cache]
max_entries = 2

[viewer]
overscan = 4
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.cache.max_entries, 2);
        assert_eq!(config.cache.max_bytes, MAX_CACHE_BYTES);
        assert_eq!(config.viewer.overscan, 4);
        assert_eq!(config.viewer.default_ratio, 1.4142);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert!(config.cache.enabled);
        assert_eq!(config.fetch.timeout_secs, 60);
        assert_eq!(config.viewer.page_gap, 4.0);
    }

    #[test]
    fn test_disabled_cache_location() {
        let config: Config = toml::from_str("[cache]\nenabled = false\n").unwrap();
        assert_eq!(config.cache.location(), StoreLocation::Disabled);
    }

    #[test]
    fn test_explicit_db_path() {
        let config: Config = toml::from_str("[cache]\ndb_path = \"/tmp/folio-test.db\"\n").unwrap();
        assert_eq!(
            config.cache.location(),
            StoreLocation::Path(PathBuf::from("/tmp/folio-test.db"))
        );
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio").join("config.toml");

        let config = Config::load_from(path.clone()).unwrap();
        assert!(path.exists());
        assert_eq!(config.cache.max_entries, 5);

        // Second load parses the file that was just written.
        let reloaded = Config::load_from(path).unwrap();
        assert_eq!(reloaded.viewer.overscan, 2);
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_entries = \"many\"\n").unwrap();

        match Config::load_from(path.clone()) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
