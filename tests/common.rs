//! Common test utilities and fixtures
//!
//! Shared functionality used across all test modules.
// Scripted transport + config/item helpers - all must be public

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;

use mokuroku::config::Config;
use mokuroku::net::{HttpRequest, HttpResponse, Transport};
use mokuroku::types::CatalogItem;

#[allow(dead_code)]
pub const ANIME_BASE: &str = "https://anime.test/api";
#[allow(dead_code)]
pub const COMICS_BASE: &str = "https://comics.test/api";
#[allow(dead_code)]
pub const METADATA_BASE: &str = "https://metadata.test/graphql";
#[allow(dead_code)]
pub const INFO_BASE: &str = "https://info.test/api";

/// A scripted response for one route pattern.
#[derive(Clone)]
#[allow(dead_code)]
pub enum StubResponse {
    /// 200 with this JSON body.
    Json(Value),
    /// Given status with this raw body.
    Status(u16, String),
    /// Transport-level failure (connection refused, etc).
    Error(String),
}

/// Call-counting transport with substring-matched routes.
///
/// The first route whose pattern occurs in the request URL (or, for POSTs,
/// in the serialized body) wins; register specific patterns before generic
/// ones. Unmatched requests answer 404.
pub struct StubTransport {
    routes: Mutex<Vec<(String, StubResponse)>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn route(self: &Arc<Self>, pattern: &str, response: StubResponse) -> Arc<Self> {
        self.routes
            .lock()
            .push((pattern.to_string(), response));
        self.clone()
    }

    pub fn route_json(self: &Arc<Self>, pattern: &str, body: Value) -> Arc<Self> {
        self.route(pattern, StubResponse::Json(body))
    }

    /// Total requests executed.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Requests whose URL+body contained `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|recorded| recorded.contains(pattern))
            .count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, request: &HttpRequest) -> mokuroku::Result<HttpResponse> {
        let body_text = request
            .body
            .as_ref()
            .map(|body| body.to_string())
            .unwrap_or_default();
        let haystack = format!("{} {}", request.url, body_text);
        self.calls.lock().push(haystack.clone());

        let routes = self.routes.lock().clone();
        for (pattern, response) in routes {
            if haystack.contains(&pattern) {
                return match response {
                    StubResponse::Json(value) => Ok(HttpResponse {
                        status: 200,
                        body: Bytes::from(value.to_string()),
                    }),
                    StubResponse::Status(status, body) => Ok(HttpResponse {
                        status,
                        body: Bytes::from(body),
                    }),
                    StubResponse::Error(message) => Err(mokuroku::Error::Other(message)),
                };
            }
        }

        Ok(HttpResponse {
            status: 404,
            body: Bytes::from("{}"),
        })
    }
}

/// Config pointing every upstream at the stub bases.
#[allow(dead_code)]
pub fn stub_config() -> Config {
    let mut config = Config::default();
    config.anime_api_base = Some(ANIME_BASE.to_string());
    config.comics_api_base = Some(COMICS_BASE.to_string());
    config.metadata_endpoint = METADATA_BASE.to_string();
    config.info_api_base = Some(INFO_BASE.to_string());
    config
}

/// Minimal catalog item with the given slug.
#[allow(dead_code)]
pub fn item(slug: &str) -> CatalogItem {
    CatalogItem {
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        cover: format!("https://img.test/{slug}-large-800x1200.jpg"),
        ..Default::default()
    }
}
