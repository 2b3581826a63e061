//! Normalizers that pull canonical items out of arbitrarily-shaped upstream
//! JSON.
//!
//! Every upstream wraps the same information differently: the list lives
//! under `animes`, `result.animes` or `data.ongoing.animeList`; the cover
//! hides behind any of ten field names. Rather than branchy per-source
//! parsing, each field has an ordered candidate table evaluated
//! first-match-wins, so supporting a new payload shape means adding a table
//! entry. Nothing in here panics on missing fields.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::cover;
use crate::net::json;
use crate::title;
use crate::types::CatalogItem;

/// Cover field candidates, best-known-first.
pub const COVER_KEYS: &[&str] = &[
    "coverImage",
    "cover_image",
    "poster",
    "posterImage",
    "image",
    "image_url",
    "coverUrl",
    "cover_url",
    "thumbnail",
    "cover",
];

/// Poster candidates for anime-shaped payloads.
pub const POSTER_KEYS: &[&str] = &["poster", "image", "thumbnail", "cover", "posterImage"];

const TITLE_KEYS: &[&str] = &["title", "name", "animeTitle"];
const SLUG_KEYS: &[&str] = &["slug", "animeId", "id"];
const LINK_KEYS: &[&str] = &["link", "url", "detailUrl", "href"];
const EPISODE_KEYS: &[&str] = &["episode", "episodes", "latestEpisode"];
const KIND_KEYS: &[&str] = &["type", "format"];
const RELEASE_DAY_KEYS: &[&str] = &["release_day", "releaseDay", "day"];
const BANNER_KEYS: &[&str] = &["banner", "bannerImage", "background", "backdrop"];
const SYNOPSIS_KEYS: &[&str] = &["synopsis", "description", "desc"];

/// Path segments that are routing boilerplate, never a slug.
const BOILERPLATE_SEGMENTS: &[&str] = &["manga", "detail-komik"];

/// Envelope paths that may hold an anime list, in priority order.
pub const ANIME_LIST_PATHS: &[&str] = &[
    "animes",
    "animeList",
    "result.animes",
    "result.animeList",
    "data.animes",
    "data.animeList",
    "data.ongoing.animeList",
    "data.completed.animeList",
    "ongoing.animeList",
    "completed.animeList",
];

/// Envelope paths that may hold a comics list, in priority order.
pub const COMIC_LIST_PATHS: &[&str] =
    &["comics", "results", "data.comics", "data.results", "data"];

static HOST_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^/]+/").expect("host prefix pattern"));

/// First non-empty string among `keys`; numbers are stringified.
pub fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| item.get(key))
        .find_map(string_or_number)
}

fn string_or_number(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Display title; `"Untitled"` when every candidate is absent.
pub fn pick_title(item: &Value) -> String {
    first_string(item, TITLE_KEYS).unwrap_or_else(|| "Untitled".to_string())
}

/// Stable identity for an item.
///
/// Tries explicit slug fields, then the last meaningful path segment of any
/// link field, then a slug derived from the title.
pub fn pick_slug(item: &Value, title: &str) -> String {
    if let Some(slug) = first_string(item, SLUG_KEYS) {
        return slug;
    }

    for key in LINK_KEYS {
        if let Some(link) = item.get(key).and_then(Value::as_str) {
            if let Some(segment) = last_path_segment(link) {
                return segment;
            }
        }
    }

    title::to_slug(title)
}

fn last_path_segment(link: &str) -> Option<String> {
    let without_query = link.split('?').next().unwrap_or(link);
    let cleaned = HOST_PREFIX.replace(without_query, "");
    let cleaned = cleaned.trim_matches('/');
    cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !BOILERPLATE_SEGMENTS.contains(segment))
        .next_back()
        .map(|segment| segment.to_string())
}

/// The path portion of a link, host and surrounding slashes stripped.
///
/// Comics chapter ids are whole path segments
/// (`manga/virus-girlfriend/chapter-1`), not just the tail.
pub fn link_path(link: &str) -> String {
    let cleaned = HOST_PREFIX.replace(link, "");
    cleaned.trim_matches('/').to_string()
}

pub fn pick_episode(item: &Value) -> Option<String> {
    first_string(item, EPISODE_KEYS)
}

pub fn pick_kind(item: &Value) -> Option<String> {
    first_string(item, KIND_KEYS)
}

pub fn pick_release_day(item: &Value) -> Option<String> {
    first_string(item, RELEASE_DAY_KEYS)
}

pub fn pick_banner(item: &Value) -> Option<String> {
    first_string(item, BANNER_KEYS)
}

pub fn pick_synopsis(item: &Value) -> Option<String> {
    first_string(item, SYNOPSIS_KEYS)
}

/// Genres arrive either as strings or as objects carrying a `name`.
pub fn pick_genres(item: &Value) -> Vec<String> {
    let Some(genres) = item.get("genres").and_then(Value::as_array) else {
        return Vec::new();
    };
    genres
        .iter()
        .filter_map(|genre| match genre {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(_) => genre
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.to_string()),
            _ => None,
        })
        .collect()
}

/// All cover candidates an item offers, table order preserved.
pub fn cover_candidates(item: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| item.get(key))
        .filter_map(|value| value.as_str())
        .filter(|url| !url.is_empty())
        .map(|url| url.to_string())
        .collect()
}

/// Walks the envelope paths and returns the first list found.
pub fn extract_list(payload: &Value, paths: &[&str]) -> Vec<Value> {
    json::first_array(payload, paths)
}

/// Pagination hints from the usual envelope spot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub has_next_page: Option<bool>,
    pub has_next: Option<bool>,
    pub next_page: Option<u64>,
}

pub fn extract_pagination(payload: &Value) -> Pagination {
    let node = json::extract_path(payload, "pagination")
        .or_else(|| json::extract_path(payload, "data.pagination"));
    let Some(node) = node else {
        return Pagination::default();
    };
    Pagination {
        has_next_page: node.get("hasNextPage").and_then(Value::as_bool),
        has_next: node.get("hasNext").and_then(Value::as_bool),
        next_page: node.get("nextPage").and_then(Value::as_u64),
    }
}

impl Pagination {
    /// Whether a next page exists relative to `page`, when the envelope says
    /// anything at all.
    pub fn says_next(&self, page: usize) -> Option<bool> {
        if self.has_next_page == Some(true) || self.has_next == Some(true) {
            return Some(true);
        }
        if let Some(next) = self.next_page {
            return Some(next as usize > page);
        }
        if self.has_next_page == Some(false) || self.has_next == Some(false) {
            return Some(false);
        }
        None
    }
}

/// Canonical item from an anime-shaped payload entry.
pub fn anime_item(raw: &Value) -> CatalogItem {
    let title = pick_title(raw);
    let slug = pick_slug(raw, &title);
    CatalogItem {
        slug,
        title,
        cover: cover::select_best_cover(cover_candidates(raw, POSTER_KEYS)),
        banner: pick_banner(raw),
        kind: pick_kind(raw),
        status: first_string(raw, &["status"]),
        episode: pick_episode(raw),
        release_day: pick_release_day(raw),
        rating: None,
        synopsis: pick_synopsis(raw),
        genres: pick_genres(raw),
    }
}

/// Canonical item from a comics-shaped payload entry.
pub fn comic_item(raw: &Value) -> CatalogItem {
    let title = pick_title(raw);
    let slug = pick_slug(raw, &title);
    let status = json::extract_path(raw, "metadata.status")
        .as_ref()
        .and_then(string_or_number)
        .or_else(|| first_string(raw, &["status"]));
    let kind = json::extract_path(raw, "metadata.type")
        .as_ref()
        .and_then(string_or_number)
        .or_else(|| pick_kind(raw))
        .or_else(|| Some("Manga".to_string()));
    CatalogItem {
        slug,
        title,
        cover: cover::select_best_cover(cover_candidates(raw, COVER_KEYS)),
        banner: None,
        kind,
        status,
        episode: first_string(raw, &["chapter", "latestChapter", "lastChapter"]),
        release_day: None,
        rating: first_string(raw, &["rating", "score"]),
        synopsis: pick_synopsis(raw),
        genres: pick_genres(raw),
    }
}

/// Keeps manga, drops manhwa/manhua by type or title marker.
pub fn is_comic_manga(raw: &Value) -> bool {
    let kind = first_string(raw, &["type"]).unwrap_or_default().to_lowercase();
    let title = pick_title(raw).to_lowercase();
    if kind.contains("manhwa") || kind.contains("manhua") {
        return false;
    }
    if title.contains("manhwa") || title.contains("manhua") {
        return false;
    }
    true
}
