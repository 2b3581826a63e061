//! Network utilities: the shared HTTP client, the rate-limited fetch façade
//! and JSON helpers.
//!
//! This module provides the networking infrastructure for mokuroku:
//!
//! - **HTTP Client**: A global, configured client with connection pooling
//! - **Fetch Façade**: [`FetchContext`], combining a response cache and a
//!   sliding-window admission controller in front of every upstream call
//! - **Outcome Values**: [`FetchOutcome`], carrying expected upstream
//!   failures as data rather than errors
//! - **JSON Helpers**: dot-path extraction utilities in [`json`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use mokuroku::config::Config;
//! use mokuroku::net::{CacheOptions, FetchContext};
//!
//! # async fn example() {
//! let ctx = FetchContext::new(Config::from_env());
//! let outcome = ctx
//!     .get_json::<serde_json::Value>("https://api.example.com/ongoing?page=1", CacheOptions::default())
//!     .await;
//! if let Some(payload) = outcome.data() {
//!     println!("got {payload}");
//! }
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::{RateLimitMeta, RateLimitSnapshot};

pub mod cache;
pub mod json;

use cache::FetchCache;

/// Global HTTP client instance with optimized configuration.
///
/// Configured with a 30-second timeout, connection pooling and compression
/// support; created lazily on first use and reused across all operations.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("mokuroku/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// A fully-described outbound request, independent of the HTTP library.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

/// Minimal response surface the fetch façade needs.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Executes HTTP requests.
///
/// The default implementation goes through the shared lazy client; tests
/// substitute stubs to count calls and script responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> crate::Result<HttpResponse>;
}

/// Production transport backed by the shared reqwest client.
#[derive(Debug, Default)]
pub struct ReqwestTransport;

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> crate::Result<HttpResponse> {
        let mut builder = CLIENT.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Per-request options: method, headers and an optional JSON body.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    /// Plain GET with no extra headers.
    pub fn get() -> Self {
        Self::default()
    }

    /// POST with a JSON body.
    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    /// Adds a header, keeping any already set.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Cache behaviour for one fetch: key override and TTL overrides.
///
/// The default key is `"{METHOD}:{url}"`; callers override it to group
/// semantically equivalent requests (for example keying a paginated endpoint
/// by logical page instead of literal URL).
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    pub key: Option<String>,
    pub ttl: Option<Duration>,
    pub error_ttl: Option<Duration>,
}

impl CacheOptions {
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_error_ttl(mut self, error_ttl: Duration) -> Self {
        self.error_ttl = Some(error_ttl);
        self
    }
}

/// Result of a fetch: either parsed data or an upstream failure, both
/// carrying rate-limit accounting when admission control was involved.
///
/// Expected failure modes (non-2xx, transport error, bad JSON) are values of
/// this type, never `Err`; callers decide whether to degrade, merge around
/// the failure, or escalate via [`FetchOutcome::into_result`].
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    Success {
        data: T,
        meta: Option<RateLimitMeta>,
    },
    Failure {
        error: String,
        meta: Option<RateLimitMeta>,
    },
}

impl<T> FetchOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// The payload, discarding metadata; `None` on failure.
    pub fn data(self) -> Option<T> {
        match self {
            FetchOutcome::Success { data, .. } => Some(data),
            FetchOutcome::Failure { .. } => None,
        }
    }

    /// The failure message, when there is one.
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success { .. } => None,
            FetchOutcome::Failure { error, .. } => Some(error),
        }
    }

    /// Rate-limit accounting, when admission control was involved.
    pub fn meta(&self) -> Option<RateLimitMeta> {
        match self {
            FetchOutcome::Success { meta, .. } | FetchOutcome::Failure { meta, .. } => *meta,
        }
    }

    /// Escalates a failure into [`Error::Upstream`](crate::Error::Upstream).
    ///
    /// For call sites that depend on this single upstream and have no way to
    /// degrade.
    pub fn into_result(self) -> crate::Result<T> {
        match self {
            FetchOutcome::Success { data, .. } => Ok(data),
            FetchOutcome::Failure { error, .. } => Err(crate::Error::upstream(error)),
        }
    }
}

/// Sliding-window admission controller.
///
/// Keeps the admission timestamps of the trailing window; a request is
/// admitted once fewer than `limit` timestamps remain inside the window,
/// sleeping cooperatively until the oldest one ages out otherwise.
struct SlidingWindowLimiter {
    timestamps: Mutex<Vec<Instant>>,
    limit: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    fn new(limit: usize, window: Duration) -> Self {
        Self {
            timestamps: Mutex::new(Vec::new()),
            limit,
            window,
        }
    }

    /// Waits for an admission slot, recording the admission.
    ///
    /// The check loops rather than sleeping once: bursts drain the window in
    /// FIFO order, each sleeper re-checking as the oldest timestamp expires.
    async fn acquire(&self) -> RateLimitMeta {
        let window_ms = self.window.as_millis() as u64;
        if self.limit == 0 {
            return RateLimitMeta {
                wait_ms: 0,
                used: 0,
                limit: self.limit,
                window_ms,
            };
        }

        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock();
                let now = Instant::now();
                timestamps.retain(|ts| now.duration_since(*ts) < self.window);
                if timestamps.len() < self.limit {
                    timestamps.push(now);
                    return RateLimitMeta {
                        wait_ms: waited.as_millis() as u64,
                        used: timestamps.len(),
                        limit: self.limit,
                        window_ms,
                    };
                }
                let oldest = timestamps[0];
                let remaining = self.window.saturating_sub(now.duration_since(oldest));
                (remaining + Duration::from_millis(5)).max(Duration::from_millis(50))
            };

            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    fn snapshot(&self, enabled: bool) -> RateLimitSnapshot {
        let mut timestamps = self.timestamps.lock();
        let now = Instant::now();
        timestamps.retain(|ts| now.duration_since(*ts) < self.window);
        let used = timestamps.len();
        let reset_in = timestamps
            .first()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(self.window);
        let epoch_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        RateLimitSnapshot {
            enabled,
            used,
            limit: self.limit,
            window_ms: self.window.as_millis() as u64,
            reset_at: (epoch_now + reset_in).as_millis() as u64,
            reset_in_ms: reset_in.as_millis() as u64,
        }
    }
}

/// Cached, rate-limited JSON fetch façade.
///
/// Owns the response cache and the admission window; constructed once at
/// process start and shared by `Arc` with every call site so the window
/// state is genuinely process-wide.
///
/// Same-key concurrent misses are NOT coalesced: two simultaneous misses on
/// one key will both hit the network and the second write wins. The short
/// TTLs bound the cost of that race.
pub struct FetchContext {
    transport: Arc<dyn Transport>,
    cache: FetchCache,
    limiter: SlidingWindowLimiter,
    config: Config,
}

impl FetchContext {
    /// Creates a context backed by the shared reqwest client.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport))
    }

    /// Creates a context with a custom transport (used by tests).
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let cache = FetchCache::new(config.cache.enabled);
        let limiter =
            SlidingWindowLimiter::new(config.rate_limit.limit, config.rate_limit.window);
        Self {
            transport,
            cache,
            limiter,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// GET + JSON decode with default request options.
    pub async fn get_json<T>(&self, url: &str, cache: CacheOptions) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        self.fetch_json(url, RequestOptions::get(), cache).await
    }

    /// POST a JSON body (GraphQL style) + JSON decode.
    pub async fn post_json<T>(&self, url: &str, body: Value, cache: CacheOptions) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        self.fetch_json(url, RequestOptions::post_json(body), cache)
            .await
    }

    /// Fetches `url` and decodes the JSON response, consulting the cache
    /// first and acquiring an admission slot when the URL belongs to the
    /// rate-limited upstream.
    ///
    /// Cache hits return immediately without consuming an admission slot.
    /// Non-2xx responses and transport/parse errors come back as
    /// [`FetchOutcome::Failure`] and are cached under the (short) error TTL.
    pub async fn fetch_json<T>(
        &self,
        url: &str,
        request: RequestOptions,
        cache_options: CacheOptions,
    ) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        let key = cache_options
            .key
            .clone()
            .unwrap_or_else(|| format!("{}:{}", request.method, url));
        let ttl = cache_options.ttl.unwrap_or(self.config.cache.ttl);
        let error_ttl = cache_options.error_ttl.unwrap_or(self.config.cache.error_ttl);

        if let Some(cached) = self.cache.get(&key) {
            debug!(key = %key, "fetch cache hit");
            return outcome_from_cached(cached, None);
        }

        let meta = if self.should_rate_limit(url) {
            let meta = self.limiter.acquire().await;
            if meta.wait_ms > 0 {
                debug!(url = %url, wait_ms = meta.wait_ms, "rate limit wait");
            }
            Some(meta)
        } else {
            None
        };

        let http_request = HttpRequest {
            method: request.method,
            url: url.to_string(),
            headers: request.headers,
            body: request.body,
        };

        match self.transport.execute(&http_request).await {
            Ok(response) if (200..300).contains(&response.status) => {
                match serde_json::from_slice::<Value>(&response.body) {
                    Ok(value) => {
                        self.cache.put(&key, Ok(value.clone()), ttl);
                        outcome_from_value(value, meta)
                    }
                    Err(err) => {
                        let error = format!("Invalid JSON: {err}");
                        warn!(url = %url, %error, "fetch parse failure");
                        self.cache.put(&key, Err(error.clone()), error_ttl);
                        FetchOutcome::Failure { error, meta }
                    }
                }
            }
            Ok(response) => {
                let error = format!("Request failed with {}", response.status);
                warn!(url = %url, status = response.status, "fetch upstream failure");
                self.cache.put(&key, Err(error.clone()), error_ttl);
                FetchOutcome::Failure { error, meta }
            }
            Err(err) => {
                let error = err.to_string();
                warn!(url = %url, %error, "fetch transport failure");
                self.cache.put(&key, Err(error.clone()), error_ttl);
                FetchOutcome::Failure { error, meta }
            }
        }
    }

    /// Current state of the admission window.
    pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
        self.limiter.snapshot(self.config.rate_limit.enabled)
    }

    fn should_rate_limit(&self, url: &str) -> bool {
        match self.config.rate_limited_base() {
            Some(base) => url.starts_with(&base),
            None => false,
        }
    }
}

fn outcome_from_cached<T>(cached: cache::CachedValue, meta: Option<RateLimitMeta>) -> FetchOutcome<T>
where
    T: DeserializeOwned,
{
    match cached {
        Ok(value) => outcome_from_value(value, meta),
        Err(error) => FetchOutcome::Failure { error, meta },
    }
}

fn outcome_from_value<T>(value: Value, meta: Option<RateLimitMeta>) -> FetchOutcome<T>
where
    T: DeserializeOwned,
{
    match serde_json::from_value::<T>(value) {
        Ok(data) => FetchOutcome::Success { data, meta },
        Err(err) => FetchOutcome::Failure {
            error: format!("Unexpected payload shape: {err}"),
            meta,
        },
    }
}
