//! The aggregation facade.
//!
//! [`Hub`] wires the fetch context, the four upstream clients and the search
//! index together and exposes the operations a frontend consumes: paginated
//! feeds, combined search, home-section composition, detail passthroughs and
//! the rate-limit snapshot.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mokuroku::config::Config;
//! use mokuroku::hub::Hub;
//! use mokuroku::types::{FeedKind, FeedRequest};
//!
//! # async fn example() -> mokuroku::Result<()> {
//! let hub = Hub::new(Config::from_env());
//!
//! let page = hub.anime_feed(&FeedRequest::from(FeedKind::Ongoing)).await?;
//! println!("{} items", page.items.len());
//!
//! let outcome = hub.search("one piece").await?;
//! println!("{} results", outcome.results.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::feed;
use crate::index::SearchIndex;
use crate::net::{FetchContext, FetchOutcome};
use crate::normalize;
use crate::sources::infoapi::InfoDetails;
use crate::sources::metadata::MetadataApi;
use crate::sources::{AnimeApi, ComicsApi, InfoApi};
use crate::title;
use crate::types::{
    CatalogItem, ChapterItem, ChapterPages, FeedPage, FeedRequest, HomeSections,
    RateLimitSnapshot, SearchOutcome,
};

/// How many items each home section is padded to.
const SECTION_MIN_ITEMS: usize = 10;

/// How many section heads get metadata-service cover art.
const ENHANCE_LIMIT: usize = 24;

/// Worker-pool width for cover enhancement.
const ENHANCE_CONCURRENCY: usize = 6;

/// Remote result count below which a search will briefly wait on an
/// in-flight index build.
const THIN_RESULTS: usize = 6;

/// Aggregation facade over all upstream sources.
///
/// Construct one per process: the fetch context it owns carries the shared
/// response cache and rate-limit window, and splitting those across
/// instances would break admission accounting.
pub struct Hub {
    ctx: Arc<FetchContext>,
    anime: AnimeApi,
    comics: ComicsApi,
    metadata: MetadataApi,
    info: InfoApi,
    index: SearchIndex,
}

impl Hub {
    pub fn new(config: Config) -> Self {
        Self::with_context(Arc::new(FetchContext::new(config)))
    }

    /// Builds a hub over an existing context (tests inject stub transports
    /// this way).
    pub fn with_context(ctx: Arc<FetchContext>) -> Self {
        Self {
            anime: AnimeApi::new(ctx.clone()),
            comics: ComicsApi::new(ctx.clone()),
            metadata: MetadataApi::new(ctx.clone()),
            info: InfoApi::new(ctx.clone()),
            index: SearchIndex::new(ctx.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &Arc<FetchContext> {
        &self.ctx
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataApi {
        &self.metadata
    }

    /// One page of an anime feed.
    ///
    /// The upstream paginates these endpoints itself, so the page passes
    /// through as served; `per_page` matters for the comics feed, which is
    /// sliced locally.
    pub async fn anime_feed(&self, request: &FeedRequest) -> Result<FeedPage> {
        let (page, _) = request.normalized();
        self.anime.feed(request.kind, page).await
    }

    /// One page of the ranked comics feed.
    ///
    /// Ranks the entire unlimited listing (cached for an hour under one
    /// semantic key) and slices the requested page out of it.
    pub async fn manga_feed(&self, request: &FeedRequest) -> Result<FeedPage> {
        let (page, per_page) = request.normalized();
        let payload = self.comics.unlimited().await?.into_result()?;
        let raw = normalize::extract_list(&payload, normalize::COMIC_LIST_PATHS);
        let ranked = feed::rank_comics(&raw, request.kind);
        Ok(feed::paginate(&ranked, page, per_page))
    }

    /// Comics library page, optionally filtered by leading letter.
    pub async fn library(
        &self,
        page: usize,
        per_page: usize,
        letter: Option<&str>,
    ) -> Result<FeedPage> {
        self.comics.library(page, per_page, letter).await
    }

    /// Combined search: remote queries merged with fuzzy index hits.
    ///
    /// Remote results lead. When the index is enabled but stale, a build is
    /// kicked off in the background; a search with thin remote results will
    /// wait briefly on an in-flight build before falling back to whatever
    /// the index currently holds.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let raw = query.trim();
        let normalized = title::normalize(raw);
        if normalized.is_empty() {
            return Ok(SearchOutcome {
                results: Vec::new(),
                index: self.index.status(),
            });
        }

        let index_config = self.ctx.config().index.clone();
        let fresh = self.index.is_fresh();
        if index_config.enabled && !fresh && !self.index.is_building() {
            self.index.ensure_in_background();
        }

        let queries =
            title::build_remote_queries(raw, &normalized, index_config.max_remote_queries);
        let remote_lists =
            futures::future::join_all(queries.iter().map(|term| self.anime.search(term))).await;

        let mut remote_iter = remote_lists.into_iter();
        let first = match remote_iter.next() {
            Some(result) => result?,
            None => Vec::new(),
        };
        let rest: Vec<CatalogItem> = remote_iter
            .filter_map(|result| result.ok())
            .flatten()
            .collect();
        let remote = feed::merge_by_slug(first, rest);

        if !fresh || !index_config.enabled {
            if self.index.is_building() && remote.len() < THIN_RESULTS {
                self.index.wait_for_build(index_config.build_wait).await;
            }
            let fuzzy = self.index.search(&normalized);
            return Ok(SearchOutcome {
                results: feed::merge_by_slug(remote, fuzzy),
                index: self.index.status(),
            });
        }

        Ok(SearchOutcome {
            results: feed::merge_by_slug(remote, self.index.search(&normalized)),
            index: self.index.status(),
        })
    }

    /// Home composition: ongoing and completed sections, cross-filled and
    /// cover-enhanced.
    ///
    /// Partial failure never empties the page: a failed source contributes
    /// a warning string and the other keeps going, and trending metadata
    /// pads whatever is still short.
    pub async fn home_sections(&self) -> HomeSections {
        let (ongoing_result, completed_result) = tokio::join!(
            self.anime.feed(crate::types::FeedKind::Ongoing, 1),
            self.anime.feed(crate::types::FeedKind::Completed, 1)
        );

        let mut warnings = Vec::new();
        let mut ongoing = match ongoing_result {
            Ok(page) => page.items,
            Err(err) => {
                warn!(error = %err, "ongoing section failed");
                warnings.push(format!("Failed to load ongoing: {err}"));
                Vec::new()
            }
        };
        let mut completed = match completed_result {
            Ok(page) => page.items,
            Err(err) => {
                warn!(error = %err, "completed section failed");
                warnings.push(format!("Failed to load completed: {err}"));
                Vec::new()
            }
        };

        if !ongoing.is_empty() {
            ongoing = self
                .metadata
                .enhance_covers(ongoing, ENHANCE_LIMIT, ENHANCE_CONCURRENCY)
                .await;
        }
        if !completed.is_empty() {
            completed = self
                .metadata
                .enhance_covers(completed, ENHANCE_LIMIT, ENHANCE_CONCURRENCY)
                .await;
        }

        let mut ongoing_filled = feed::fill_section(ongoing.clone(), &completed, SECTION_MIN_ITEMS);
        let mut completed_filled =
            feed::fill_section(completed, &ongoing, SECTION_MIN_ITEMS);

        if ongoing_filled.len() < SECTION_MIN_ITEMS || completed_filled.len() < SECTION_MIN_ITEMS {
            let trending: Vec<CatalogItem> = self
                .metadata
                .trending(SECTION_MIN_ITEMS)
                .await
                .iter()
                .map(MetadataApi::media_to_item)
                .collect();
            ongoing_filled = feed::fill_section(ongoing_filled, &trending, SECTION_MIN_ITEMS);
            completed_filled = feed::fill_section(completed_filled, &trending, SECTION_MIN_ITEMS);
        }

        HomeSections {
            ongoing: ongoing_filled,
            completed: completed_filled,
            warnings,
        }
    }

    /// Current admission-window state, for backoff UI.
    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.ctx.rate_limit_snapshot()
    }

    /// Anime detail payload (raw; shapes vary per upstream).
    pub async fn anime_detail(&self, slug: &str) -> Result<FetchOutcome<Value>> {
        self.anime.detail(slug).await
    }

    /// Episode payload passthrough.
    pub async fn episode(&self, slug: &str) -> Result<FetchOutcome<Value>> {
        self.anime.episode(slug).await
    }

    /// Whether an episode slug resolves upstream.
    pub async fn episode_exists(&self, slug: &str) -> Result<bool> {
        self.anime.episode_exists(slug).await
    }

    /// Comics search with advanced-search fallback.
    pub async fn comics_search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>> {
        self.comics.search(query, limit).await
    }

    pub async fn comic_detail(&self, slug: &str) -> Result<Option<CatalogItem>> {
        self.comics.detail(slug).await
    }

    pub async fn comic_chapters(&self, slug: &str) -> Result<Vec<ChapterItem>> {
        self.comics.chapters(slug).await
    }

    pub async fn comic_chapter_pages(&self, segment: &str) -> Result<ChapterPages> {
        self.comics.chapter_pages(segment).await
    }

    /// Cross-references a title against the secondary info API.
    pub async fn info_lookup(&self, title: &str) -> Option<InfoDetails> {
        self.info.lookup_by_title(title).await
    }
}
