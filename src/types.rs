//! Core data types for catalog items, feeds and status reporting.
//!
//! This module defines the fundamental data structures used throughout
//! mokuroku:
//!
//! - [`CatalogItem`] - Canonical representation of an anime or manga entry
//! - [`ChapterItem`] / [`ChapterPages`] - Comics chapter listing and reader data
//! - [`FeedKind`] / [`FeedRequest`] / [`FeedPage`] - Paginated feed plumbing
//! - [`RateLimitMeta`] / [`RateLimitSnapshot`] - Admission-control reporting
//! - [`IndexStatus`] / [`SearchOutcome`] - Search index introspection
//!
//! # Examples
//!
//! ```rust
//! use mokuroku::types::*;
//!
//! let item = CatalogItem {
//!     slug: "one-piece".to_string(),
//!     title: "One Piece".to_string(),
//!     cover: "https://example.com/cover.jpg".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(item.slug, "one-piece");
//! ```

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Canonical representation of a catalog entry, independent of which
/// upstream shape it came from.
///
/// `slug` is the identity: feeds dedupe on it, merges key on it, and when an
/// upstream provides none it is derived deterministically from the title so
/// that repeated runs agree.
///
/// Anime entries populate `episode`/`release_day`; comics entries populate
/// `status`/`rating`/`genres`. Everything except `slug`, `title` and `cover`
/// is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Stable identity, unique within a result set.
    pub slug: String,

    /// Display title.
    pub title: String,

    /// Best-quality cover/poster URL known for this entry.
    pub cover: String,

    /// Wide banner image, when a metadata source supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,

    /// Media kind (TV, Movie, OVA, Manga, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Publication status (Ongoing, Completed, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Latest episode or chapter marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,

    /// Weekly release day, for ongoing series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_day: Option<String>,

    /// Upstream rating string, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,

    /// Synopsis/description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,

    /// Genre tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
}

/// A single comics chapter reference from a detail listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterItem {
    /// Identifier the reader endpoint accepts (usually a path segment).
    pub id: String,
    /// Chapter title.
    pub title: String,
    /// Chapter number as the upstream reported it.
    pub chapter: String,
    /// Slug used to fetch pages; equal to `id` for segment-derived chapters.
    pub slug: String,
    /// Release date string, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

/// Page image URLs for one comics chapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChapterPages {
    pub images: Vec<String>,
    pub title: String,
    pub chapter: String,
}

/// Which feed a caller wants.
///
/// `Ongoing`/`Completed` map to the anime catalog's listing endpoints;
/// `Popular`/`Latest` exist on both the anime catalog and the comics ranking
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Ongoing,
    Completed,
    Popular,
    Latest,
}

impl FeedKind {
    /// Stable lowercase name, used in cache keys and fallback-score hashing.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Ongoing => "ongoing",
            FeedKind::Completed => "completed",
            FeedKind::Popular => "popular",
            FeedKind::Latest => "latest",
        }
    }
}

impl std::str::FromStr for FeedKind {
    type Err = crate::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ongoing" => Ok(FeedKind::Ongoing),
            "completed" => Ok(FeedKind::Completed),
            "popular" => Ok(FeedKind::Popular),
            "latest" => Ok(FeedKind::Latest),
            other => Err(crate::Error::parse(format!("unknown feed kind: {other}"))),
        }
    }
}

/// Parameters for requesting a feed page.
///
/// Uses the builder pattern (via `derive_builder`) for fluent construction:
///
/// ```rust
/// use mokuroku::types::{FeedKind, FeedRequestBuilder};
///
/// let request = FeedRequestBuilder::default()
///     .kind(FeedKind::Popular)
///     .page(2usize)
///     .per_page(24usize)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.page, 2);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct FeedRequest {
    pub kind: FeedKind,
    #[builder(default = "1")]
    pub page: usize,
    #[builder(default = "24")]
    pub per_page: usize,
}

impl FeedRequest {
    /// Page clamped to at least 1 and per-page clamped to 6..=36, matching
    /// what the pipeline is willing to serve.
    pub fn normalized(&self) -> (usize, usize) {
        (self.page.max(1), self.per_page.clamp(6, 36))
    }
}

impl From<FeedKind> for FeedRequest {
    /// First page with default sizing.
    fn from(kind: FeedKind) -> Self {
        FeedRequest {
            kind,
            page: 1,
            per_page: 24,
        }
    }
}

/// One page of a paginated feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<CatalogItem>,
    pub has_next_page: bool,
}

/// Rate-limit accounting attached to a fetch outcome, suitable for
/// forwarding as response headers so clients can render backoff UI.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitMeta {
    /// How long this request waited for an admission slot.
    pub wait_ms: u64,
    /// Admissions used within the current window, this one included.
    pub used: usize,
    /// Window capacity.
    pub limit: usize,
    /// Window length.
    pub window_ms: u64,
}

/// Point-in-time view of the admission window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub enabled: bool,
    pub used: usize,
    pub limit: usize,
    pub window_ms: u64,
    /// Epoch milliseconds when the oldest admission leaves the window.
    pub reset_at: u64,
    pub reset_in_ms: u64,
}

/// Introspection data for the search index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Number of indexed items.
    pub size: usize,
    /// Epoch milliseconds of the last completed build; 0 when never built.
    pub built_at: u64,
    /// Whether a build is currently in flight.
    pub building: bool,
    /// Whether index building is enabled at all.
    pub enabled: bool,
}

/// Search results plus the index state they were produced under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<CatalogItem>,
    pub index: IndexStatus,
}

/// Home-page section composition: two filled sections plus advisory
/// warnings for sources that failed along the way.
#[derive(Debug, Clone, Default)]
pub struct HomeSections {
    pub ongoing: Vec<CatalogItem>,
    pub completed: Vec<CatalogItem>,
    /// Human-readable notes about partial failures; empty on a clean run.
    pub warnings: Vec<String>,
}
