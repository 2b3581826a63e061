//! # Mokuroku - Anime & manga catalog aggregation library
//!
//! Mokuroku pulls catalog data from several inconsistent upstream HTTP APIs
//! (a primary anime catalog, a GraphQL metadata service, a secondary info
//! API and a comics catalog), normalizes everything into one canonical item
//! shape and serves stable, paginated, searchable result sets. It features
//! a cached rate-limited fetch layer, cross-source title matching with
//! fuzzy scoring, an in-memory search index and a merge/fill/dedupe feed
//! pipeline.
//!
//! ## Features
//!
//! - **Rate-Limited Fetching**: Sliding-window admission control in front of
//!   the catalog upstream, with success/failure response caching on
//!   independent TTLs
//! - **Duck-Typed Normalization**: Ordered candidate-key tables turn any
//!   known payload shape into a [`CatalogItem`](types::CatalogItem)
//! - **Cover Quality Selection**: Placeholder detection, size extraction and
//!   CDN upgrades pick the best image among up to ten candidate fields
//! - **Cross-Source Matching**: Season/noise-stripped query candidates
//!   reconcile local titles against the metadata service
//! - **Search Index**: A budgeted alphabet crawl feeding typo-tolerant
//!   local search, built at most once concurrently
//! - **Feed Pipeline**: Merge, fill, dedupe and deterministic ranking so
//!   pages stay stable across requests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mokuroku::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> mokuroku::Result<()> {
//!     let hub = Hub::new(Config::from_env());
//!
//!     // Paginated feed
//!     let page = hub
//!         .anime_feed(&FeedRequest::from(FeedKind::Ongoing))
//!         .await?;
//!     println!("{} ongoing titles", page.items.len());
//!
//!     // Combined remote + index search
//!     let found = hub.search("one piece").await?;
//!     println!("{} results", found.results.len());
//!
//!     // Rate-limit state for backoff UI
//!     let snapshot = hub.rate_limit_snapshot();
//!     println!("{}/{} used", snapshot.used, snapshot.limit);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`hub`]: The facade wiring everything together
//! - [`net`]: Fetch context, response cache, admission control, JSON helpers
//! - [`sources`]: One client per upstream API
//! - [`normalize`] / [`cover`] / [`title`]: Payload extraction and cleanup
//! - [`index`]: Search index builder and fuzzy lookup
//! - [`feed`]: Merge/fill/rank/paginate pipeline
//! - [`error`]: Error handling
//!
//! ## Error Model
//!
//! Expected upstream failures travel as [`net::FetchOutcome`] values; they
//! are cached briefly and merged around, never thrown. [`enum@Error`] is
//! reserved for missing configuration and failures with no fallback; see
//! [`error`] for the taxonomy.

pub mod config;
pub mod cover;
pub mod error;
pub mod feed;
pub mod hub;
pub mod index;
pub mod net;
pub mod normalize;
pub mod sources;
pub mod title;
pub mod types;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use mokuroku::prelude::*;
///
/// // Now you have access to:
/// // - Hub, Config
/// // - CatalogItem, FeedKind, FeedRequest, FeedPage
/// // - CatalogItemsExt (merge_with / fill_from)
/// // - FetchContext, FetchOutcome, CacheOptions
/// ```
pub mod prelude {
    pub use crate::{
        config::Config,
        feed::CatalogItemsExt,
        hub::Hub,
        net::{CacheOptions, FetchContext, FetchOutcome},
        types::{CatalogItem, FeedKind, FeedPage, FeedRequest, FeedRequestBuilder},
    };
}

// Re-export main types at crate root for direct access
pub use config::Config;
pub use error::{Error, Result};
pub use hub::Hub;
pub use net::{FetchContext, FetchOutcome};
pub use types::{CatalogItem, FeedKind, FeedPage, FeedRequest};
