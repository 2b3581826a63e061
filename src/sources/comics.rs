//! Comics catalog REST API client.
//!
//! Rankings, search (with an advanced-search fallback), the unlimited
//! listing the feed pipeline ranks over, library paging by letter, detail,
//! chapter listings and chapter pages.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::net::json;
use crate::net::{CacheOptions, FetchContext, FetchOutcome};
use crate::normalize;
use crate::types::{CatalogItem, ChapterItem, ChapterPages, FeedPage};

/// Comics catalog client.
pub struct ComicsApi {
    ctx: Arc<FetchContext>,
}

impl ComicsApi {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self { ctx }
    }

    fn base(&self) -> Result<String> {
        self.ctx.config().comics_base()
    }

    /// Popular ranking head; manhwa/manhua filtered out, empty on failure.
    pub async fn popular(&self, limit: usize) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!("{base}/popular");
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(3600));
        Ok(self.list_items(&url, cache, limit).await)
    }

    /// Latest-updates head; same shape as [`ComicsApi::popular`].
    pub async fn latest(&self, limit: usize) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!("{base}/latest?page=1");
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(600));
        Ok(self.list_items(&url, cache, limit).await)
    }

    async fn list_items(&self, url: &str, cache: CacheOptions, limit: usize) -> Vec<CatalogItem> {
        match self.ctx.get_json::<Value>(url, cache).await {
            FetchOutcome::Success { data, .. } => {
                let comics = normalize::extract_list(&data, normalize::COMIC_LIST_PATHS);
                let filtered: Vec<&Value> = comics
                    .iter()
                    .filter(|item| normalize::is_comic_manga(item))
                    .collect();
                debug!(total = comics.len(), kept = filtered.len(), "comics list filtered");
                filtered
                    .into_iter()
                    .take(limit)
                    .map(normalize::comic_item)
                    .collect()
            }
            FetchOutcome::Failure { error, .. } => {
                warn!(%url, %error, "comics list fetch failed");
                Vec::new()
            }
        }
    }

    /// Title search, falling back to advanced search when the plain search
    /// fails or comes back empty.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!("{base}/search?q={}", urlencoding::encode(query));
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(600));

        let comics = match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => {
                normalize::extract_list(&data, normalize::COMIC_LIST_PATHS)
            }
            FetchOutcome::Failure { .. } => Vec::new(),
        };

        if comics.is_empty() {
            return self.advanced_search(query, limit).await;
        }

        Ok(comics
            .iter()
            .filter(|item| normalize::is_comic_manga(item))
            .take(limit)
            .map(normalize::comic_item)
            .collect())
    }

    /// Secondary search endpoint with explicit type filtering.
    pub async fn advanced_search(&self, query: &str, limit: usize) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!(
            "{base}/advanced-search?q={}&type=manga&limit={limit}",
            urlencoding::encode(query)
        );
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(600));

        match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => {
                Ok(normalize::extract_list(&data, normalize::COMIC_LIST_PATHS)
                    .iter()
                    .take(limit)
                    .map(normalize::comic_item)
                    .collect())
            }
            FetchOutcome::Failure { error, .. } => {
                warn!(%query, %error, "advanced search failed");
                Ok(Vec::new())
            }
        }
    }

    /// The full unlimited listing, raw.
    ///
    /// The feed pipeline scores over the raw entries (ranking fields are not
    /// part of the canonical shape), so this returns the payload unparsed
    /// under a semantic cache key shared by every ranking request.
    pub async fn unlimited(&self) -> Result<FetchOutcome<Value>> {
        let base = self.base()?;
        let url = format!("{base}/unlimited");
        let cache = CacheOptions::keyed("comics-unlimited")
            .with_ttl(Duration::from_secs(3600))
            .with_error_ttl(Duration::from_secs(60));
        Ok(self.ctx.get_json::<Value>(&url, cache).await)
    }

    /// Deep-crawl listing with crawl bounds; empty on failure.
    pub async fn unlimited_crawl(&self, kind: &str, max_pages: usize) -> Result<Vec<CatalogItem>> {
        let base = self.base()?;
        let url = format!(
            "{base}/unlimited?type={}&max_pages={max_pages}",
            urlencoding::encode(kind)
        );
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(3600));

        match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => {
                Ok(normalize::extract_list(&data, normalize::COMIC_LIST_PATHS)
                    .iter()
                    .map(normalize::comic_item)
                    .collect())
            }
            FetchOutcome::Failure { error, .. } => {
                warn!(%error, "unlimited crawl failed");
                Ok(Vec::new())
            }
        }
    }

    /// Library page: the unlimited listing filtered by leading letter and
    /// sliced in memory.
    ///
    /// `letter` is `"0-9"` or a single letter; `None` lists everything.
    pub async fn library(
        &self,
        page: usize,
        per_page: usize,
        letter: Option<&str>,
    ) -> Result<FeedPage> {
        let payload = self.unlimited().await?.into_result()?;
        let mut comics = normalize::extract_list(&payload, normalize::COMIC_LIST_PATHS);

        comics.retain(|item| {
            let title = normalize::pick_title(item).to_lowercase();
            let chapter = normalize::first_string(item, &["chapter"])
                .unwrap_or_default()
                .to_lowercase();
            !title.contains("apk") && !chapter.contains("download")
        });

        if let Some(letter) = letter {
            if letter == "0-9" {
                comics.retain(|item| {
                    normalize::pick_title(item)
                        .chars()
                        .next()
                        .map(|c| c.is_ascii_digit())
                        .unwrap_or(false)
                });
            } else {
                let prefix = letter.to_uppercase();
                comics.retain(|item| {
                    normalize::pick_title(item).to_uppercase().starts_with(&prefix)
                });
            }
        }

        let total = comics.len();
        let page = page.max(1);
        let start = (page - 1) * per_page;
        let end = (start + per_page).min(total);
        let has_next_page = start + per_page < total;
        let items = if start < total {
            comics[start..end].iter().map(normalize::comic_item).collect()
        } else {
            Vec::new()
        };

        Ok(FeedPage {
            items,
            has_next_page,
        })
    }

    /// Detail for one comic; `None` when the upstream failed or sent
    /// nothing usable.
    pub async fn detail(&self, slug: &str) -> Result<Option<CatalogItem>> {
        let base = self.base()?;
        let url = format!("{base}/comic/{}", urlencoding::encode(slug));
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(3600));

        let payload = match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => data,
            FetchOutcome::Failure { error, .. } => {
                warn!(%slug, %error, "comic detail fetch failed");
                return Ok(None);
            }
        };

        let node = json::extract_path(&payload, "comic")
            .or_else(|| json::extract_path(&payload, "data"))
            .unwrap_or(payload);
        if node.is_null() {
            return Ok(None);
        }

        let mut item = normalize::comic_item(&node);
        // Detail responses rarely echo the slug; the caller's is the truth.
        item.slug = slug.to_string();
        Ok(Some(item))
    }

    /// Chapter listing for one comic, latest first.
    pub async fn chapters(&self, slug: &str) -> Result<Vec<ChapterItem>> {
        let base = self.base()?;
        let url = format!("{base}/comic/{}", urlencoding::encode(slug));
        let cache = CacheOptions::keyed(format!("comic-chapters:{slug}"))
            .with_ttl(Duration::from_secs(600));

        let payload = match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => data,
            FetchOutcome::Failure { error, .. } => {
                warn!(%slug, %error, "chapter listing fetch failed");
                return Ok(Vec::new());
            }
        };

        let chapters = json::first_array(
            &payload,
            &["chapters", "comic.chapters", "data.chapters"],
        );

        let mut parsed: Vec<ChapterItem> = chapters
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let segment = raw
                    .get("link")
                    .and_then(Value::as_str)
                    .map(normalize::link_path)
                    .filter(|segment| !segment.is_empty())
                    .or_else(|| {
                        raw.get("slug")
                            .and_then(Value::as_str)
                            .map(|s| s.to_string())
                    })
                    .unwrap_or_else(|| format!("chapter-{index}"));

                let chapter = normalize::first_string(raw, &["chapter"])
                    .unwrap_or_else(|| (index + 1).to_string());
                let title = normalize::first_string(raw, &["title"])
                    .unwrap_or_else(|| format!("Chapter {chapter}"));

                ChapterItem {
                    id: segment.clone(),
                    title,
                    chapter,
                    slug: segment,
                    release_date: normalize::first_string(raw, &["date", "releaseDate"]),
                }
            })
            .collect();

        parsed.reverse();
        Ok(parsed)
    }

    /// Page images for one chapter; empty pages on failure.
    pub async fn chapter_pages(&self, segment: &str) -> Result<ChapterPages> {
        let base = self.base()?;
        let url = format!("{base}/chapter/{segment}");
        let cache = CacheOptions::default().with_ttl(Duration::from_secs(3600));

        let payload = match self.ctx.get_json::<Value>(&url, cache).await {
            FetchOutcome::Success { data, .. } => data,
            FetchOutcome::Failure { error, .. } => {
                warn!(%segment, %error, "chapter pages fetch failed");
                return Ok(ChapterPages::default());
            }
        };

        let images = payload
            .get("images")
            .and_then(Value::as_array)
            .map(|array| {
                array
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ChapterPages {
            images,
            title: normalize::first_string(&payload, &["title", "comic_title"])
                .unwrap_or_default(),
            chapter: normalize::first_string(&payload, &["chapter", "chapter_number"])
                .unwrap_or_default(),
        })
    }
}
