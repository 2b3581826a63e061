//! Primary anime catalog REST API client.
//!
//! Paginated feed listings, alphabetical listings (feeding the search
//! index), remote search, detail-by-slug and episode lookups. Every call
//! goes through the shared [`FetchContext`] with semantic cache keys, so
//! repeated page loads within the TTL cost nothing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::error::Result;
use crate::net::{CacheOptions, FetchContext, FetchOutcome, RequestOptions};
use crate::normalize;
use crate::types::{CatalogItem, FeedKind, FeedPage};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Anime catalog client.
pub struct AnimeApi {
    ctx: Arc<FetchContext>,
}

impl AnimeApi {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    fn base(&self) -> Result<String> {
        self.ctx.config().anime_base()
    }

    fn endpoint(kind: FeedKind) -> &'static str {
        match kind {
            FeedKind::Ongoing => "/ongoing",
            FeedKind::Completed => "/completed",
            FeedKind::Popular => "/popular",
            FeedKind::Latest => "/latest",
        }
    }

    /// One upstream feed page, normalized.
    ///
    /// `has_next_page` trusts the pagination envelope when it signals a next
    /// page and otherwise assumes a non-empty page has more behind it; the
    /// first empty page settles the question.
    pub async fn feed(&self, kind: FeedKind, page: usize) -> Result<FeedPage> {
        let base = self.base()?;
        let endpoint = Self::endpoint(kind);
        let url = format!("{base}{endpoint}?page={}", urlencoding::encode(&page.to_string()));
        let cache = CacheOptions::keyed(format!("feed:{endpoint}:{page}"))
            .with_ttl(Duration::from_secs(300))
            .with_error_ttl(Duration::from_secs(30));

        let payload = self.ctx.get_json::<Value>(&url, cache).await.into_result()?;

        let list = normalize::extract_list(&payload, normalize::ANIME_LIST_PATHS);
        let items: Vec<CatalogItem> = list.iter().map(normalize::anime_item).collect();
        let pagination = normalize::extract_pagination(&payload);
        let has_next_page = pagination.says_next(page) == Some(true) || !items.is_empty();

        Ok(FeedPage {
            items,
            has_next_page,
        })
    }

    /// Raw alphabetical listing page; the search index builder walks these.
    ///
    /// Returned as a [`FetchOutcome`] so callers also get the rate-limit
    /// accounting to surface.
    pub async fn animelist(&self, letter: &str, page: usize) -> Result<FetchOutcome<Value>> {
        let base = self.base()?;
        let url = format!(
            "{base}/animelist?letter={}&page={}",
            urlencoding::encode(letter),
            urlencoding::encode(&page.to_string())
        );
        let cache = CacheOptions::keyed(format!("animelist:{letter}:{page}"))
            .with_ttl(Duration::from_secs(300))
            .with_error_ttl(Duration::from_secs(30));
        Ok(self.ctx.get_json::<Value>(&url, cache).await)
    }

    /// Items from one alphabetical listing page; empty on upstream failure.
    pub async fn animelist_items(&self, letter: &str, page: usize) -> Result<Vec<CatalogItem>> {
        let outcome = self.animelist(letter, page).await?;
        let items = match outcome.data() {
            Some(payload) => normalize::extract_list(&payload, normalize::ANIME_LIST_PATHS)
                .iter()
                .map(normalize::anime_item)
                .collect(),
            None => Vec::new(),
        };
        Ok(items)
    }

    /// Remote title search; degrades to an empty list on upstream failure.
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!("{base}/search/{}", urlencoding::encode(query));
        let cache = CacheOptions::default()
            .with_ttl(Duration::from_secs(600))
            .with_error_ttl(Duration::from_secs(30));

        match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => {
                Ok(normalize::extract_list(&data, normalize::ANIME_LIST_PATHS)
                    .iter()
                    .map(normalize::anime_item)
                    .collect())
            }
            FetchOutcome::Failure { error, .. } => {
                warn!(%query, %error, "remote search failed");
                Ok(Vec::new())
            }
        }
    }

    /// Detail payload for one entry, unnormalized (detail shapes vary too
    /// much to flatten here; callers pick what they need).
    pub async fn detail(&self, slug: &str) -> Result<FetchOutcome<Value>> {
        let base = self.base()?;
        let url = format!("{base}/detail/{}", urlencoding::encode(slug));
        Ok(self.ctx.get_json::<Value>(&url, CacheOptions::default()).await)
    }

    /// Episode payload passthrough with browser-ish headers.
    ///
    /// Short TTLs: stream URLs rotate quickly and failures should retry
    /// fast.
    pub async fn episode(&self, slug: &str) -> Result<FetchOutcome<Value>> {
        let base = self.base()?;
        let url = format!("{base}/episode/{}", urlencoding::encode(slug));
        let cache = CacheOptions::keyed(format!("episode:{slug}"))
            .with_ttl(Duration::from_secs(60))
            .with_error_ttl(Duration::from_secs(10));
        let request = self.browser_request(&base);
        Ok(self.ctx.fetch_json::<Value>(&url, request, cache).await)
    }

    /// Whether an episode exists: any successful payload counts.
    pub async fn episode_exists(&self, slug: &str) -> Result<bool> {
        let base = self.base()?;
        let url = format!("{base}/episode/{}", urlencoding::encode(slug));
        let cache = CacheOptions::keyed(format!("episode-exists:{slug}"))
            .with_ttl(Duration::from_secs(60))
            .with_error_ttl(Duration::from_secs(10));
        let request = self.browser_request(&base);
        Ok(self.ctx.fetch_json::<Value>(&url, request, cache).await.is_ok())
    }

    // Some upstreams refuse plain-client requests for episode data; send the
    // header set a browser would.
    fn browser_request(&self, base: &str) -> RequestOptions {
        let config = self.ctx.config();
        let origin = config
            .origin
            .clone()
            .or_else(|| {
                Url::parse(base)
                    .ok()
                    .map(|url| url.origin().ascii_serialization())
            })
            .unwrap_or_else(|| base.to_string());
        let referer = config.referer.clone().unwrap_or_else(|| format!("{origin}/"));
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        RequestOptions::get()
            .with_header("User-Agent", user_agent)
            .with_header("Accept", "application/json,text/plain,*/*")
            .with_header("Accept-Language", "en-US,en;q=0.9")
            .with_header("Referer", referer)
            .with_header("Origin", origin)
    }
}
