//! Configuration for upstream endpoints, caching, rate limiting and the
//! search index.
//!
//! A [`Config`] is built once at process start and handed to
//! [`FetchContext`](crate::net::FetchContext) / [`Hub`](crate::hub::Hub).
//! Every knob has a sensible default; the builder and [`Config::from_env`]
//! are the two supported ways to override them.
//!
//! # Examples
//!
//! ```rust
//! use mokuroku::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::default()
//!     .anime_api_base(Some("https://api.example.com/anime".to_string()))
//!     .comics_api_base(Some("https://api.example.com/comic".to_string()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.rate_limit.limit, 70);
//! ```

use std::env;
use std::time::Duration;

use derive_builder::Builder;

use crate::error::{Error, Result};

/// Response-cache settings.
///
/// Success and failure entries expire independently; failures expire fast so
/// a struggling upstream gets retried soon without being hammered.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the response cache is consulted at all.
    pub enabled: bool,
    /// Time-to-live for successful responses.
    pub ttl: Duration,
    /// Time-to-live for failure entries.
    pub error_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(5 * 60),
            error_ttl: Duration::from_secs(20),
        }
    }
}

/// Sliding-window admission settings for the rate-limited upstream.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether admission control is applied.
    pub enabled: bool,
    /// Maximum admissions per window.
    pub limit: usize,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 70,
            window: Duration::from_secs(60),
        }
    }
}

/// Search-index build budgets and freshness settings.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Whether the in-memory index is built at all. Off by default; search
    /// degrades to remote-only when disabled.
    pub enabled: bool,
    /// How long a completed build stays fresh.
    pub ttl: Duration,
    /// Page cap per alphabet bucket.
    pub max_pages_per_letter: usize,
    /// Global item cap across all buckets.
    pub max_items: usize,
    /// Global request budget for one build.
    pub max_requests: usize,
    /// Polite delay between successive page requests.
    pub request_delay: Duration,
    /// How long a foreground search is willing to wait on an in-flight build.
    pub build_wait: Duration,
    /// Upper bound on remote query variants per search.
    pub max_remote_queries: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_secs(6 * 60 * 60),
            max_pages_per_letter: 200,
            max_items: 60_000,
            max_requests: 1500,
            request_delay: Duration::from_millis(300),
            build_wait: Duration::from_millis(1200),
            max_remote_queries: 3,
        }
    }
}

/// Top-level configuration.
///
/// Base URLs are optional: an operation needing an unset base fails with
/// [`Error::Config`] rather than guessing. The anime catalog base doubles as
/// the rate-limited upstream prefix.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), default)]
pub struct Config {
    /// Primary anime catalog REST API base URL.
    pub anime_api_base: Option<String>,
    /// Comics catalog REST API base URL.
    pub comics_api_base: Option<String>,
    /// GraphQL metadata endpoint.
    pub metadata_endpoint: String,
    /// Secondary info API base URL (search-then-info lookups).
    pub info_api_base: Option<String>,
    /// Provider segment for the secondary info API.
    pub info_provider: String,
    /// User-Agent sent on episode lookups; a browser-ish default otherwise.
    pub user_agent: Option<String>,
    /// Referer override for episode lookups.
    pub referer: Option<String>,
    /// Origin override for episode lookups.
    pub origin: Option<String>,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub index: IndexConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anime_api_base: None,
            comics_api_base: None,
            metadata_endpoint: "https://graphql.anilist.co".to_string(),
            info_api_base: None,
            info_provider: "hianime".to_string(),
            user_agent: None,
            referer: None,
            origin: None,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `MOKUROKU_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.anime_api_base = env_string("MOKUROKU_ANIME_API_URL");
        config.comics_api_base = env_string("MOKUROKU_COMIC_API_URL");
        if let Some(endpoint) = env_string("MOKUROKU_METADATA_URL") {
            config.metadata_endpoint = endpoint;
        }
        config.info_api_base = env_string("MOKUROKU_INFO_API_URL");
        if let Some(provider) = env_string("MOKUROKU_INFO_PROVIDER") {
            config.info_provider = provider;
        }
        config.user_agent = env_string("MOKUROKU_API_USER_AGENT");
        config.referer = env_string("MOKUROKU_API_REFERER");
        config.origin = env_string("MOKUROKU_API_ORIGIN");

        config.cache.enabled = env_flag("MOKUROKU_CACHE_ENABLED", true);
        config.cache.ttl = env_millis("MOKUROKU_CACHE_TTL_MS", config.cache.ttl);
        config.cache.error_ttl = env_millis("MOKUROKU_CACHE_ERROR_TTL_MS", config.cache.error_ttl);

        config.rate_limit.enabled = env_flag("MOKUROKU_RATE_LIMIT_ENABLED", true);
        config.rate_limit.limit = env_usize("MOKUROKU_RATE_LIMIT_PER_MIN", config.rate_limit.limit);

        config.index.enabled = env_flag("MOKUROKU_INDEX_ENABLED", false);
        config.index.ttl = env_millis("MOKUROKU_INDEX_TTL_MS", config.index.ttl);
        config.index.max_pages_per_letter = env_usize(
            "MOKUROKU_INDEX_MAX_PAGES_PER_LETTER",
            config.index.max_pages_per_letter,
        );
        config.index.max_items = env_usize("MOKUROKU_INDEX_MAX_ITEMS", config.index.max_items);
        config.index.max_requests =
            env_usize("MOKUROKU_INDEX_MAX_REQUESTS", config.index.max_requests);
        config.index.request_delay =
            env_millis("MOKUROKU_INDEX_DELAY_MS", config.index.request_delay);
        config.index.build_wait = env_millis("MOKUROKU_INDEX_WAIT_MS", config.index.build_wait);
        config.index.max_remote_queries = env_usize(
            "MOKUROKU_SEARCH_MAX_REMOTE_QUERIES",
            config.index.max_remote_queries,
        );

        config
    }

    /// The anime catalog base with trailing slashes trimmed.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when no base is configured.
    pub fn anime_base(&self) -> Result<String> {
        self.anime_api_base
            .as_deref()
            .map(|base| base.trim_end_matches('/').to_string())
            .ok_or_else(|| Error::config("missing anime catalog API base URL"))
    }

    /// The comics catalog base with trailing slashes trimmed.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when no base is configured.
    pub fn comics_base(&self) -> Result<String> {
        self.comics_api_base
            .as_deref()
            .map(|base| base.trim_end_matches('/').to_string())
            .ok_or_else(|| Error::config("missing comics catalog API base URL"))
    }

    /// The URL prefix that admission control applies to, when rate limiting
    /// is enabled and an anime base is configured.
    pub fn rate_limited_base(&self) -> Option<String> {
        if !self.rate_limit.enabled {
            return None;
        }
        self.anime_api_base
            .as_deref()
            .map(|base| base.trim_end_matches('/').to_string())
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

// "false" disables, anything else (including unset) keeps the default.
fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) if value.eq_ignore_ascii_case("false") => false,
        Ok(value) if value.eq_ignore_ascii_case("true") => true,
        _ => default,
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or(default)
}
