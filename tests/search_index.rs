//! Search index tests: the alphabet crawl, build sharing, freshness and
//! fuzzy lookup, all against a scripted transport.

use std::sync::Arc;

use serde_json::json;

use mokuroku::index::SearchIndex;
use mokuroku::net::FetchContext;
use mokuroku::Config;

mod common;
use common::{stub_config, StubTransport};

fn index_config() -> Config {
    let mut config = stub_config();
    config.index.enabled = true;
    config
}

fn crawlable_transport() -> Arc<StubTransport> {
    // Bucket 0-9 has two pages (the second empty), bucket A has one entry
    // under a different envelope; every other bucket 404s, which reads as an
    // empty page.
    StubTransport::new()
        .route_json(
            "letter=0-9&page=1",
            json!({"animes": [
                {"slug": "86", "title": "86", "poster": "https://img.test/86.jpg"},
                {"slug": "86", "title": "86", "poster": "https://img.test/86.jpg"},
                {"slug": "91-days", "title": "91 Days", "poster": "https://img.test/91.jpg"}
            ]}),
        )
        .route_json("letter=0-9&page=2", json!({"animes": []}))
        .route_json(
            "letter=A&page=1",
            json!({"result": {"animes": [
                {"slug": "attack-on-titan", "title": "Attack on Titan", "poster": "https://img.test/aot.jpg"}
            ]}}),
        )
        .route_json("letter=A&page=2", json!({"animes": []}))
}

fn index_over(transport: Arc<StubTransport>, config: Config) -> SearchIndex {
    SearchIndex::new(Arc::new(FetchContext::with_transport(config, transport)))
}

#[tokio::test(start_paused = true)]
async fn build_crawls_buckets_and_dedupes_by_slug() {
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), index_config());

    let items = index.ensure().await;

    let slugs: Vec<&str> = items.iter().map(|i| i.slug.as_str()).collect();
    assert_eq!(slugs, vec!["86", "91-days", "attack-on-titan"]);

    let status = index.status();
    assert_eq!(status.size, 3);
    assert!(status.built_at > 0);
    assert!(!status.building);
    assert!(status.enabled);
}

#[tokio::test(start_paused = true)]
async fn fresh_index_skips_rebuilding() {
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), index_config());

    index.ensure().await;
    let calls_after_build = transport.total_calls();

    index.ensure().await;
    assert_eq!(transport.total_calls(), calls_after_build);
    assert!(index.is_fresh());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_share_one_build() {
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), index_config());

    let (a, b) = tokio::join!(index.ensure(), index.ensure());
    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 3);

    // One crawl's worth of requests, not two.
    let single_build_calls = transport.total_calls();
    let fresh_transport = crawlable_transport();
    let fresh_index = index_over(fresh_transport.clone(), index_config());
    fresh_index.ensure().await;
    assert_eq!(single_build_calls, fresh_transport.total_calls());
}

#[tokio::test(start_paused = true)]
async fn disabled_index_is_a_noop() {
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), stub_config());

    let items = index.ensure().await;
    assert!(items.is_empty());
    assert_eq!(transport.total_calls(), 0);

    let status = index.status();
    assert!(!status.enabled);
    assert_eq!(status.built_at, 0);
}

#[tokio::test(start_paused = true)]
async fn request_budget_bounds_the_crawl() {
    let mut config = index_config();
    config.index.max_requests = 1;
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), config);

    let items = index.ensure().await;
    assert_eq!(transport.total_calls(), 1);
    assert_eq!(items.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn item_cap_bounds_the_crawl() {
    let mut config = index_config();
    config.index.max_items = 2;
    let transport = crawlable_transport();
    let index = index_over(transport.clone(), config);

    let items = index.ensure().await;
    assert_eq!(items.len(), 2);
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn exact_normalized_query_ranks_first() {
    let index = index_over(crawlable_transport(), index_config());
    index.ensure().await;

    let results = index.search("Attack on Titan");
    assert!(!results.is_empty());
    assert_eq!(results[0].slug, "attack-on-titan");
}

#[tokio::test(start_paused = true)]
async fn fuzzy_search_tolerates_typos() {
    let index = index_over(crawlable_transport(), index_config());
    index.ensure().await;

    let results = index.search("attck on titan");
    assert!(results.iter().any(|item| item.slug == "attack-on-titan"));
}

#[tokio::test(start_paused = true)]
async fn search_before_any_build_is_empty() {
    let index = index_over(crawlable_transport(), index_config());
    assert!(index.search("attack on titan").is_empty());
}
