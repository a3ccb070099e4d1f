//! # Folio
//!
//! Streaming, caching and paginating core for a PDF viewer.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → DocumentCache ⇄ ByteStore
//!               │
//!               ▼
//!      RenderingProvider → PageLayoutModel → ContinuousMode / DiscreteMode
//!                                                  ⇅
//!                                          NavigationController
//! ```
//!
//! - [`cache`]: byte cache with background revalidation and LRU eviction
//! - [`viewer`]: page virtualization and the single source of truth for the
//!   current page
//!
//! ## Quick Start
//!
//! ```bash
//! # Fetch a document through the cache
//! folio load https://example.com/manual.pdf --out manual.pdf
//!
//! # Inspect the cache
//! folio cache list
//! ```

/// Application context and error handling.
///
/// [`ViewerContext`](app::ViewerContext) wires configuration, store, fetcher
/// and cache together.
pub mod app;

/// Document byte cache.
///
/// - [`DocumentCache`](cache::DocumentCache): cache-first loads with
///   background revalidation
/// - [`plan_eviction`](cache::plan_eviction): least recently read first,
///   bounded by entry count and total bytes
pub mod cache;

/// Command-line interface for the maintenance binary.
///
/// - `load <url> [--out FILE]` - Load a document through the cache
/// - `cache list [--json]` - List cached documents
/// - `cache remove <url>` - Remove one document
/// - `cache clear` - Remove every document
/// - `cache trim` - Enforce the configured limits
pub mod cli;

/// Configuration loaded from `~/.config/folio/config.toml`.
pub mod config;

/// Core data types: cache records and page geometry.
pub mod domain;

/// HTTP fetching with conditional requests.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for document fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Persistent byte store.
///
/// - [`ByteStore`](store::ByteStore): trait defining storage operations
/// - [`SqliteByteStore`](store::SqliteByteStore): SQLite implementation
/// - [`StoreConnector`](store::StoreConnector): lazily opened, memoized store
pub mod store;

pub mod viewer;

#[cfg(test)]
pub(crate) mod testing;
