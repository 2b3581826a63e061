//! Response cache with independent success and failure lifetimes.
//!
//! Stores the parsed JSON body (or the failure message) for each cache key.
//! Failures are kept on a much shorter TTL than successes so a struggling
//! upstream gets retried quickly without being hammered in the meantime.
//!
//! Entries are overwritten on every fresh fetch and expire lazily: the
//! freshness check happens on read, there is no background sweeper.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

/// What a cache entry holds: a parsed success body or a failure message.
pub type CachedValue = Result<Value, String>;

struct CacheEntry {
    value: CachedValue,
    expires_at: Instant,
}

/// Keyed store of fetch results.
///
/// Thread-safe; the mutex is only held for map access, never across awaits.
pub struct FetchCache {
    enabled: bool,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl FetchCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if present and unexpired.
    ///
    /// Expired entries are dropped on the spot.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        if !self.enabled {
            return None;
        }
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }
        entries.remove(key);
        None
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub fn put(&self, key: &str, value: CachedValue, ttl: Duration) {
        if !self.enabled {
            return;
        }
        self.entries.lock().insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Number of live-or-expired entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
