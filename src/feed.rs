//! Feed merge, fill, ranking and pagination.
//!
//! Feeds are assembled from several inconsistent upstreams, so every page
//! the library serves goes through the same pipeline: garbage filtering,
//! slug-keyed dedupe, scoring with a deterministic fallback, a cover-quality
//! gate and slice pagination. The invariants callers rely on:
//!
//! - [`merge_by_slug`] never drops or reorders primary items
//! - [`fill_section`] pads but never truncates or reorders
//! - ranking is stable across requests even for items with no real signal
//!   (the fallback score is a hash, not a random)

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::cover;
use crate::normalize;
use crate::title;
use crate::types::{CatalogItem, FeedKind, FeedPage};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(\.\d+)?)").expect("number pattern"));

/// Fields that may carry a "how recently updated" signal, best first.
const LATEST_NUMERIC_FIELDS: &[&str] = &[
    "latestChapter",
    "lastChapter",
    "chapter",
    "latest",
    "update",
    "updated",
];
const LATEST_DATE_FIELDS: &[&str] =
    &["releaseDate", "lastReleaseDate", "latestReleaseDate", "date"];

/// Fields that may carry a popularity signal, best first.
const POPULAR_FIELDS: &[&str] = &[
    "views",
    "view",
    "viewer",
    "rating",
    "score",
    "follower",
    "followers",
    "favorite",
    "favorites",
    "likes",
    "popularity",
];

/// Dedupes on slug: primary order wins, unseen secondary items append.
///
/// Every primary item appears in the output exactly once.
pub fn merge_by_slug(primary: Vec<CatalogItem>, secondary: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::with_capacity(primary.len() + secondary.len());

    for item in primary.into_iter().chain(secondary) {
        if seen.insert(item.slug.clone()) {
            merged.push(item);
        }
    }

    merged
}

/// Pads `primary` up to `min_count` with not-yet-seen fallback items.
///
/// Primary keeps its order and is never truncated, even above `min_count`.
pub fn fill_section(
    primary: Vec<CatalogItem>,
    fallback: &[CatalogItem],
    min_count: usize,
) -> Vec<CatalogItem> {
    if primary.len() >= min_count {
        return primary;
    }
    let mut seen: std::collections::HashSet<String> =
        primary.iter().map(|item| item.slug.clone()).collect();
    let mut filled = primary;

    for item in fallback {
        if filled.len() >= min_count {
            break;
        }
        if seen.insert(item.slug.clone()) {
            filled.push(item.clone());
        }
    }

    filled
}

/// Slice pagination over a pre-sorted, pre-deduped list.
pub fn paginate(items: &[CatalogItem], page: usize, per_page: usize) -> FeedPage {
    let total = items.len();
    let page = page.max(1);
    let start = ((page - 1) * per_page).min(total);
    let end = (start + per_page).min(total);
    FeedPage {
        items: items[start..end].to_vec(),
        has_next_page: start + per_page < total,
    }
}

/// Ranks raw comics entries for a feed: garbage out, dedupe, score, sort,
/// cover gate.
///
/// Entries with no usable ranking signal get a deterministic fallback score
/// hashed from the feed kind and identity, so their relative order holds
/// across requests. The cover gate drops likely-bad covers afterwards,
/// unless that would empty the feed, in which case the ungated list is
/// served.
pub fn rank_comics(raw_entries: &[Value], kind: FeedKind) -> Vec<CatalogItem> {
    let mut deduped: Vec<(f64, CatalogItem)> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw in raw_entries {
        if is_garbage(raw) {
            continue;
        }
        let item = normalize::comic_item(raw);
        let key = if item.slug.is_empty() {
            title::normalize(&item.title)
        } else {
            item.slug.clone()
        };
        if key.is_empty() || !seen.insert(key) {
            continue;
        }

        let signal = match kind {
            FeedKind::Latest => latest_score(raw),
            _ => popular_score(raw),
        };
        let score = if signal > 0.0 {
            signal
        } else {
            let identity = if item.slug.is_empty() {
                item.title.clone()
            } else {
                item.slug.clone()
            };
            f64::from(stable_hash(&format!("{}:{}", kind.as_str(), identity)))
        };
        deduped.push((score, item));
    }

    deduped.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let ranked: Vec<CatalogItem> = deduped.into_iter().map(|(_, item)| item).collect();

    let gated: Vec<CatalogItem> = ranked
        .iter()
        .filter(|item| !cover::is_likely_bad(&item.cover))
        .cloned()
        .collect();
    if gated.is_empty() {
        ranked
    } else {
        gated
    }
}

// Spam listings advertise themselves in the title or chapter text.
fn is_garbage(raw: &Value) -> bool {
    let title = normalize::pick_title(raw);
    let chapter = normalize::first_string(raw, &["chapter"]).unwrap_or_default();
    let combined = format!("{title} {chapter}").to_lowercase();
    combined.contains("apk") || combined.contains("download")
}

/// Best recency signal an entry offers, numeric fields first, then parsed
/// dates as epoch milliseconds.
fn latest_score(raw: &Value) -> f64 {
    let numeric = LATEST_NUMERIC_FIELDS
        .iter()
        .filter_map(|field| raw.get(field))
        .map(numeric_from)
        .fold(0.0, f64::max);
    let dated = LATEST_DATE_FIELDS
        .iter()
        .filter_map(|field| raw.get(field))
        .map(date_from)
        .fold(0.0, f64::max);
    numeric.max(dated)
}

/// Best popularity signal an entry offers.
fn popular_score(raw: &Value) -> f64 {
    POPULAR_FIELDS
        .iter()
        .filter_map(|field| raw.get(field))
        .map(numeric_from)
        .fold(0.0, f64::max)
}

// Numbers pass through; strings contribute their first decimal run, with
// comma decimal separators tolerated.
fn numeric_from(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned = s.replace(',', ".");
            NUMBER
                .captures(&cleaned)
                .and_then(|captures| captures[1].parse::<f64>().ok())
                .unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

// Date strings become epoch milliseconds; unparseable input scores zero.
fn date_from(value: &Value) -> f64 {
    let Some(text) = value.as_str() else {
        return 0.0;
    };
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(text) {
        return parsed.timestamp_millis() as f64;
    }
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc2822(text) {
        return parsed.timestamp_millis() as f64;
    }
    if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return parsed.and_utc().timestamp_millis() as f64;
    }
    if let Ok(parsed) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return parsed
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis() as f64)
            .unwrap_or(0.0);
    }
    0.0
}

/// 32-bit string hash with the classic `h*31 + c` shape, over UTF-16 code
/// units, absolute value. Stable for a given input across processes.
pub fn stable_hash(value: &str) -> u32 {
    let mut h: i32 = 0;
    for unit in value.encode_utf16() {
        h = h
            .wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(i32::from(unit));
    }
    h.unsigned_abs()
}

/// Chainable pipeline operations on item lists.
///
/// # Examples
///
/// ```rust
/// use mokuroku::feed::CatalogItemsExt;
/// use mokuroku::types::CatalogItem;
///
/// let primary = vec![CatalogItem { slug: "a".into(), ..Default::default() }];
/// let extra = vec![
///     CatalogItem { slug: "a".into(), ..Default::default() },
///     CatalogItem { slug: "b".into(), ..Default::default() },
/// ];
///
/// let merged = primary.merge_with(extra);
/// assert_eq!(merged.len(), 2);
/// ```
pub trait CatalogItemsExt {
    /// [`merge_by_slug`] with `self` as primary.
    fn merge_with(self, secondary: Vec<CatalogItem>) -> Vec<CatalogItem>;

    /// [`fill_section`] with `self` as primary.
    fn fill_from(self, fallback: &[CatalogItem], min_count: usize) -> Vec<CatalogItem>;
}

impl CatalogItemsExt for Vec<CatalogItem> {
    fn merge_with(self, secondary: Vec<CatalogItem>) -> Vec<CatalogItem> {
        merge_by_slug(self, secondary)
    }

    fn fill_from(self, fallback: &[CatalogItem], min_count: usize) -> Vec<CatalogItem> {
        fill_section(self, fallback, min_count)
    }
}
