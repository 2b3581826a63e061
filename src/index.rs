//! In-memory search index: alphabet crawl, TTL freshness, fuzzy lookup.
//!
//! The catalog upstream has no typo-tolerant search, so the index crawls its
//! alphabetical listing (27 buckets: `0-9`, `A`..`Z`) into memory and serves
//! fuzzy matches locally. Builds are expensive (hundreds of rate-limited
//! requests), which drives the whole design:
//!
//! - a build runs at most once at a time; concurrent callers share the same
//!   in-flight handle instead of triggering a second crawl
//! - a completed build stays fresh for a TTL and is replaced wholesale, not
//!   merged
//! - budgets (pages per bucket, total requests, total items) bound the crawl
//!   no matter what the upstream claims to have
//! - the whole feature is off unless enabled; disabled, the index stays
//!   empty and search degrades to remote-only
//!
//! Fuzzy matching sits behind [`FuzzyIndex`] so the scoring backend can be
//! swapped without touching the builder.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::net::FetchContext;
use crate::sources::AnimeApi;
use crate::title;
use crate::types::{CatalogItem, IndexStatus};

/// Alphabet buckets the crawl walks, in order.
const LETTERS: [&str; 27] = [
    "0-9", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
    "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// How many matches a single query variant may contribute.
const PER_VARIANT_LIMIT: usize = 60;

/// Overall result cap for one fuzzy search.
const RESULT_LIMIT: usize = 48;

/// Matches above this score are discarded (0.0 is exact).
const SCORE_THRESHOLD: f64 = 0.32;

/// Fuzzy-searchable snapshot of the indexed items.
///
/// Title matches dominate, slug matches count at a discount, mirroring a
/// weighted two-field configuration. Scores are distances: 0.0 is an exact
/// normalized match, anything above [`SCORE_THRESHOLD`] is noise.
pub struct FuzzyIndex {
    entries: Vec<FuzzyEntry>,
}

struct FuzzyEntry {
    item: CatalogItem,
    title_norm: String,
    slug_norm: String,
}

impl FuzzyIndex {
    pub fn build(items: &[CatalogItem]) -> Self {
        let entries = items
            .iter()
            .map(|item| FuzzyEntry {
                title_norm: title::normalize(&item.title),
                slug_norm: title::normalize(&item.slug.replace('-', " ")),
                item: item.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Scored matches for one term, ascending, capped at `limit`.
    pub fn search(&self, term: &str, limit: usize) -> Vec<(CatalogItem, f64)> {
        let term = title::normalize(term);
        if term.len() < 2 {
            return Vec::new();
        }

        let mut scored: Vec<(CatalogItem, f64)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let title_score = field_score(&term, &entry.title_norm);
                let slug_score = field_score(&term, &entry.slug_norm) * 1.2;
                let score = title_score.min(slug_score);
                (score <= SCORE_THRESHOLD).then(|| (entry.item.clone(), score))
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }
}

// Distance in [0, 1]: exact 0, substring small and shrinking with coverage,
// otherwise Jaro-Winkler distance.
fn field_score(term: &str, field: &str) -> f64 {
    if field.is_empty() {
        return 1.0;
    }
    if field == term {
        return 0.0;
    }
    if field.contains(term) {
        return 0.1 * (1.0 - term.len() as f64 / field.len() as f64);
    }
    1.0 - strsim::jaro_winkler(term, field)
}

struct IndexState {
    items: Vec<CatalogItem>,
    fuzzy: Option<FuzzyIndex>,
    built_instant: Option<Instant>,
    built_at_epoch_ms: u64,
}

type BuildHandle = Shared<BoxFuture<'static, Vec<CatalogItem>>>;

/// The search index: crawl state, freshness and the single in-flight build.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SearchIndex {
    ctx: Arc<FetchContext>,
    state: Arc<Mutex<IndexState>>,
    building: Arc<Mutex<Option<BuildHandle>>>,
}

impl SearchIndex {
    pub fn new(ctx: Arc<FetchContext>) -> Self {
        Self {
            ctx,
            state: Arc::new(Mutex::new(IndexState {
                items: Vec::new(),
                fuzzy: None,
                built_instant: None,
                built_at_epoch_ms: 0,
            })),
            building: Arc::new(Mutex::new(None)),
        }
    }

    fn config(&self) -> IndexConfig {
        self.ctx.config().index.clone()
    }

    /// Whether the current items were built within the TTL.
    pub fn is_fresh(&self) -> bool {
        let config = self.config();
        let state = self.state.lock();
        !state.items.is_empty()
            && state
                .built_instant
                .map(|at| at.elapsed() < config.ttl)
                .unwrap_or(false)
    }

    pub fn is_building(&self) -> bool {
        self.building.lock().is_some()
    }

    /// Ensures the index exists, building it if stale.
    ///
    /// Idempotent and safe to call concurrently: a fresh index returns
    /// immediately, a build in flight is awaited rather than duplicated, and
    /// a build started here keeps running on a background task even if this
    /// caller is dropped.
    pub async fn ensure(&self) -> Vec<CatalogItem> {
        let config = self.config();
        if !config.enabled {
            return self.state.lock().items.clone();
        }
        if self.is_fresh() {
            return self.state.lock().items.clone();
        }

        let handle = {
            let mut building = self.building.lock();
            if let Some(handle) = building.clone() {
                handle
            } else {
                let handle = self.spawn_build();
                *building = Some(handle.clone());
                handle
            }
        };

        handle.await
    }

    /// Kicks off [`SearchIndex::ensure`] without waiting on it.
    pub fn ensure_in_background(&self) {
        let index = self.clone();
        tokio::spawn(async move {
            index.ensure().await;
        });
    }

    /// Waits up to `duration` for an in-flight build; returns immediately
    /// when none is running. The build itself keeps going either way.
    pub async fn wait_for_build(&self, duration: Duration) {
        let handle = self.building.lock().as_ref().cloned();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(duration, handle).await;
        }
    }

    fn spawn_build(&self) -> BuildHandle {
        let ctx = self.ctx.clone();
        let state = self.state.clone();
        let building = self.building.clone();
        let config = self.config();

        let handle: BuildHandle = async move {
            let items = build_items(ctx, &config).await;
            {
                let mut state = state.lock();
                state.fuzzy = Some(FuzzyIndex::build(&items));
                state.items = items.clone();
                state.built_instant = Some(Instant::now());
                state.built_at_epoch_ms = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis() as u64;
            }
            *building.lock() = None;
            items
        }
        .boxed()
        .shared();

        // Drive the build to completion even if every waiter gives up.
        tokio::spawn(handle.clone());
        handle
    }

    /// Fuzzy search over the index.
    ///
    /// The query is expanded into close variants, per-variant match sets are
    /// unioned keeping each slug's best score, and the union is returned
    /// ascending by score. Empty until a build has completed.
    pub fn search(&self, query: &str) -> Vec<CatalogItem> {
        let state = self.state.lock();
        let Some(fuzzy) = &state.fuzzy else {
            return Vec::new();
        };

        let normalized = title::normalize(query);
        let mut best: HashMap<String, (CatalogItem, f64)> = HashMap::new();
        for variant in title::expand_query_variants(&normalized) {
            for (item, score) in fuzzy.search(&variant, PER_VARIANT_LIMIT) {
                let improves = match best.get(&item.slug) {
                    Some((_, previous)) => score < *previous,
                    None => true,
                };
                if improves {
                    best.insert(item.slug.clone(), (item, score));
                }
            }
        }

        let mut merged: Vec<(CatalogItem, f64)> = best.into_values().collect();
        merged.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(RESULT_LIMIT);
        merged.into_iter().map(|(item, _)| item).collect()
    }

    pub fn status(&self) -> IndexStatus {
        let state = self.state.lock();
        IndexStatus {
            size: state.items.len(),
            built_at: state.built_at_epoch_ms,
            building: self.is_building(),
            enabled: self.ctx.config().index.enabled,
        }
    }
}

/// The crawl itself: walk every bucket page by page until the bucket runs
/// dry or a budget trips, de-duplicating by slug as items accumulate.
async fn build_items(ctx: Arc<FetchContext>, config: &IndexConfig) -> Vec<CatalogItem> {
    let api = AnimeApi::new(ctx);
    let mut items: Vec<CatalogItem> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut request_count = 0usize;

    info!("search index build started");

    for letter in LETTERS {
        for page in 1..=config.max_pages_per_letter {
            if request_count >= config.max_requests {
                break;
            }
            if items.len() >= config.max_items {
                break;
            }

            let page_items = match api.animelist_items(letter, page).await {
                Ok(page_items) => page_items,
                Err(err) => {
                    warn!(%letter, page, error = %err, "index crawl aborted");
                    return items;
                }
            };
            request_count += 1;

            if page_items.is_empty() {
                break;
            }

            for item in page_items {
                if seen.insert(item.slug.clone()) {
                    items.push(item);
                }
            }

            if config.request_delay > Duration::ZERO {
                tokio::time::sleep(config.request_delay).await;
            }
        }
    }

    debug!(
        items = items.len(),
        requests = request_count,
        "search index build finished"
    );
    items
}
