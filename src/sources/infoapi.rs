//! Secondary info API client: search-then-info two-step lookup.
//!
//! Used to cross-reference a catalog title with a provider that exposes
//! richer episode data. Optional: when no base URL is configured every
//! lookup quietly answers `None`.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::net::{CacheOptions, FetchContext};
use crate::title;

#[derive(Debug, Clone, Deserialize)]
pub struct InfoSearchResult {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoSearchResponse {
    #[serde(default)]
    results: Vec<InfoSearchResult>,
}

/// Episode reference within an info payload.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodeRef {
    pub id: String,
    pub number: f64,
    pub title: Option<String>,
}

/// Full info payload for one matched entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDetails {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "alID")]
    pub al_id: Option<i64>,
    #[serde(rename = "malID")]
    pub mal_id: Option<i64>,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub season: Option<String>,
    pub total_episodes: Option<u32>,
    #[serde(default)]
    pub episodes: Vec<EpisodeRef>,
}

/// Secondary info API client.
pub struct InfoApi {
    ctx: Arc<FetchContext>,
}

impl InfoApi {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    /// Two-step lookup: provider search, best-match on title, then the info
    /// call for the matched id. `None` when unconfigured, unmatched, or on
    /// any upstream failure.
    pub async fn lookup_by_title(&self, search_title: &str) -> Option<InfoDetails> {
        let config = self.ctx.config();
        let base = config.info_api_base.as_deref()?.trim_end_matches('/');
        let provider = config.info_provider.clone();

        let search_url = format!(
            "{base}/anime/{provider}/{}",
            urlencoding::encode(search_title)
        );
        let search_cache = CacheOptions::keyed(format!("info-search:{provider}:{search_title}"))
            .with_ttl(Duration::from_secs(3600));
        let search = self
            .ctx
            .get_json::<InfoSearchResponse>(&search_url, search_cache)
            .await
            .data()?;

        if search.results.is_empty() {
            return None;
        }
        let titles: Vec<String> = search.results.iter().map(|r| r.title.clone()).collect();
        let matched = &search.results[title::best_match_index(search_title, &titles)?];
        if matched.id.is_empty() {
            return None;
        }
        debug!(%search_title, matched_id = %matched.id, "info api match");

        let info_url = format!(
            "{base}/anime/{provider}/info/{}",
            urlencoding::encode(&matched.id)
        );
        let info_cache = CacheOptions::keyed(format!("info-detail:{provider}:{}", matched.id))
            .with_ttl(Duration::from_secs(3600));
        self.ctx
            .get_json::<InfoDetails>(&info_url, info_cache)
            .await
            .data()
    }
}
