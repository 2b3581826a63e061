//! GraphQL metadata service client and cross-source title matcher.
//!
//! The metadata service is the richest source of cover art and series
//! metadata, but it only speaks canonical titles. Local catalog titles are
//! full of season markers and release noise, so matching goes through an
//! ordered list of cleaned-up query candidates and stops at the first one
//! that returns anything (see [`crate::title::build_search_candidates`]).
//!
//! Results change slowly; every call is cached for hours to a day with the
//! literal query embedded in the cache key.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::net::{CacheOptions, FetchContext, FetchOutcome};
use crate::title;
use crate::types::CatalogItem;

/// Fields requested for every media lookup. Kept as one block so search,
/// by-id and trending return identical shapes.
const MEDIA_FIELDS: &str = "
  id
  idMal
  title {
    romaji
    english
    native
    userPreferred
  }
  bannerImage
  coverImage {
    extraLarge
    large
  }
  description
  seasonYear
  format
";

/// Title variants as the metadata service reports them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
    pub user_preferred: Option<String>,
}

/// Cover art variants by size.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCover {
    pub extra_large: Option<String>,
    pub large: Option<String>,
}

/// One media record from the metadata service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMedia {
    pub id: i64,
    pub id_mal: Option<i64>,
    #[serde(default)]
    pub title: MediaTitle,
    pub banner_image: Option<String>,
    #[serde(default)]
    pub cover_image: MediaCover,
    pub description: Option<String>,
    pub season_year: Option<i32>,
    pub format: Option<String>,
}

impl MetadataMedia {
    /// Display title in preference order.
    pub fn preferred_title(&self) -> String {
        self.title
            .user_preferred
            .clone()
            .or_else(|| self.title.english.clone())
            .or_else(|| self.title.romaji.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "Page")]
    page: Option<GraphQlPage>,
    #[serde(rename = "Media")]
    media: Option<MetadataMedia>,
}

#[derive(Debug, Deserialize)]
struct GraphQlPage {
    media: Option<Vec<MetadataMedia>>,
}

/// Metadata service client.
pub struct MetadataApi {
    ctx: Arc<FetchContext>,
}

impl MetadataApi {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    fn endpoint(&self) -> String {
        self.ctx.config().metadata_endpoint.clone()
    }

    /// Single search query against the service; best match or `None`.
    async fn search_once(&self, query_text: &str) -> Option<MetadataMedia> {
        let query = format!(
            "query ($search: String) {{\n  Page(perPage: 5) {{\n    media(search: $search, type: ANIME) {{\n{MEDIA_FIELDS}\n    }}\n  }}\n}}"
        );
        let body = json!({ "query": query, "variables": { "search": query_text } });
        let cache = CacheOptions::keyed(format!("metadata:search:v3:{query_text}"))
            .with_ttl(Duration::from_secs(24 * 60 * 60));

        let response = self
            .ctx
            .post_json::<GraphQlResponse>(&self.endpoint(), body, cache)
            .await
            .data()?;

        let media = response.data?.page?.media?;
        pick_best_match(query_text, media)
    }

    /// Reconciles a local title (and optional slug) against the service.
    ///
    /// Queries candidates most-specific-first and short-circuits at the
    /// first hit; callers that need nothing matched treat `None` as "keep
    /// local data".
    pub async fn match_by_title(&self, title: &str, slug: Option<&str>) -> Option<MetadataMedia> {
        if title.is_empty() {
            return None;
        }
        for candidate in title::build_search_candidates(title, slug) {
            if let Some(media) = self.search_once(&candidate).await {
                debug!(%title, %candidate, media_id = media.id, "metadata match");
                return Some(media);
            }
        }
        None
    }

    /// Lookup by the service's own id.
    pub async fn by_id(&self, id: i64) -> Option<MetadataMedia> {
        let query =
            format!("query ($id: Int) {{\n  Media(id: $id, type: ANIME) {{\n{MEDIA_FIELDS}\n  }}\n}}");
        let body = json!({ "query": query, "variables": { "id": id } });
        let cache = CacheOptions::keyed(format!("metadata:id:{id}"))
            .with_ttl(Duration::from_secs(24 * 60 * 60));

        let response = self
            .ctx
            .post_json::<GraphQlResponse>(&self.endpoint(), body, cache)
            .await
            .data()?;
        response.data?.media
    }

    /// Currently-trending media, most-trending first.
    pub async fn trending(&self, limit: usize) -> Vec<MetadataMedia> {
        let query = format!(
            "query ($perPage: Int) {{\n  Page(perPage: $perPage, sort: TRENDING_DESC) {{\n    media(type: ANIME) {{\n{MEDIA_FIELDS}\n    }}\n  }}\n}}"
        );
        let body = json!({ "query": query, "variables": { "perPage": limit } });
        let cache = CacheOptions::keyed(format!("metadata:trending:{limit}"))
            .with_ttl(Duration::from_secs(12 * 60 * 60));

        let outcome = self
            .ctx
            .post_json::<GraphQlResponse>(&self.endpoint(), body, cache)
            .await;

        match outcome {
            FetchOutcome::Success { data, .. } => data
                .data
                .and_then(|d| d.page)
                .and_then(|p| p.media)
                .unwrap_or_default(),
            FetchOutcome::Failure { .. } => Vec::new(),
        }
    }

    /// Replaces posters/banners on the head of `items` with metadata-service
    /// art where a title match exists.
    ///
    /// Runs at most `concurrency` lookups at a time; the fan-out is bounded
    /// so a long list cannot flood the rate-limited upstreams. Items past
    /// `limit` pass through untouched, as does any item whose lookup fails.
    pub async fn enhance_covers(
        &self,
        items: Vec<CatalogItem>,
        limit: usize,
        concurrency: usize,
    ) -> Vec<CatalogItem> {
        if items.is_empty() {
            return items;
        }
        let cut = limit.min(items.len());
        let tail = items[cut..].to_vec();
        let head = items[..cut].to_vec();

        let mut enhanced: Vec<CatalogItem> = stream::iter(head)
            .map(|item| async move {
                match self.match_by_title(&item.title, Some(&item.slug)).await {
                    Some(media) => {
                        let cover = media
                            .cover_image
                            .extra_large
                            .clone()
                            .or_else(|| media.cover_image.large.clone())
                            .unwrap_or_else(|| item.cover.clone());
                        let banner = media.banner_image.clone().or_else(|| item.banner.clone());
                        CatalogItem {
                            cover,
                            banner,
                            ..item
                        }
                    }
                    None => item,
                }
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        enhanced.extend(tail);
        enhanced
    }

    /// Canonical item from a metadata record (used to pad feeds from
    /// trending data).
    pub fn media_to_item(media: &MetadataMedia) -> CatalogItem {
        let title = media.preferred_title();
        CatalogItem {
            slug: title::to_slug(&title),
            title,
            cover: media
                .cover_image
                .extra_large
                .clone()
                .or_else(|| media.cover_image.large.clone())
                .unwrap_or_default(),
            banner: media.banner_image.clone(),
            kind: media.format.clone(),
            status: None,
            episode: None,
            release_day: None,
            rating: None,
            synopsis: media.description.clone(),
            genres: Vec::new(),
        }
    }
}

/// Best match within one result page.
fn pick_best_match(query: &str, media: Vec<MetadataMedia>) -> Option<MetadataMedia> {
    let titles: Vec<String> = media.iter().map(MetadataMedia::preferred_title).collect();
    let index = title::best_match_index(query, &titles)?;
    media.into_iter().nth(index)
}
