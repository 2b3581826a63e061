//! Integration tests
//!
//! End-to-end flows against scripted upstreams: cross-source matching,
//! the two-step info lookup, comics detail/reader flows and the episode
//! passthroughs.

use std::sync::Arc;

use serde_json::json;

use mokuroku::hub::Hub;
use mokuroku::net::FetchContext;
use mokuroku::sources::MetadataApi;
use mokuroku::Config;

mod common;
use common::{stub_config, StubResponse, StubTransport};

fn context_over(transport: Arc<StubTransport>, config: Config) -> Arc<FetchContext> {
    Arc::new(FetchContext::with_transport(config, transport))
}

#[tokio::test(start_paused = true)]
async fn matcher_short_circuits_on_first_hit() {
    let transport = StubTransport::new()
        .route_json(
            "\"search\":\"Boku no Hero Academia Season 7\"",
            json!({"data": {"Page": {"media": []}}}),
        )
        .route_json(
            "\"search\":\"Boku no Hero Academia\"",
            json!({"data": {"Page": {"media": [
                {"id": 1, "title": {"userPreferred": "Boku no Hero Academia"},
                 "coverImage": {"extraLarge": "https://img.test/bnha.jpg"}}
            ]}}}),
        );
    let metadata = MetadataApi::new(context_over(transport.clone(), stub_config()));

    let media = metadata
        .match_by_title("Boku no Hero Academia Season 7", None)
        .await
        .expect("match found");

    assert_eq!(media.id, 1);
    // The raw title missed, the season-stripped candidate hit, and no
    // further candidates were queried.
    assert_eq!(transport.calls_matching("metadata.test"), 2);
}

#[tokio::test(start_paused = true)]
async fn matcher_prefers_exact_title_within_a_result_page() {
    let transport = StubTransport::new().route_json(
        "metadata.test",
        json!({"data": {"Page": {"media": [
            {"id": 10, "title": {"userPreferred": "One Piece Film Red"}},
            {"id": 11, "title": {"userPreferred": "One Piece"}},
            {"id": 12, "title": {"userPreferred": "One Piece Stampede"}}
        ]}}}),
    );
    let metadata = MetadataApi::new(context_over(transport, stub_config()));

    let media = metadata.match_by_title("One Piece", None).await.unwrap();
    assert_eq!(media.id, 11);
}

#[tokio::test(start_paused = true)]
async fn matcher_results_are_cached_per_query() {
    let transport = StubTransport::new().route_json(
        "metadata.test",
        json!({"data": {"Page": {"media": [
            {"id": 5, "title": {"userPreferred": "Frieren"}}
        ]}}}),
    );
    let metadata = MetadataApi::new(context_over(transport.clone(), stub_config()));

    let first = metadata.match_by_title("Frieren", None).await.unwrap();
    let second = metadata.match_by_title("Frieren", None).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(transport.calls_matching("metadata.test"), 1);
}

#[tokio::test(start_paused = true)]
async fn metadata_lookup_by_id() {
    let transport = StubTransport::new().route_json(
        "\"id\":154587",
        json!({"data": {"Media": {
            "id": 154587,
            "idMal": 52991,
            "title": {"userPreferred": "Sousou no Frieren"},
            "seasonYear": 2023
        }}}),
    );
    let metadata = MetadataApi::new(context_over(transport, stub_config()));

    let media = metadata.by_id(154587).await.unwrap();
    assert_eq!(media.id_mal, Some(52991));
    assert_eq!(media.season_year, Some(2023));
}

#[tokio::test(start_paused = true)]
async fn info_lookup_is_a_two_step_search_then_info() {
    let transport = StubTransport::new()
        .route_json(
            "info.test/api/anime/hianime/info/frieren-18542",
            json!({
                "id": "frieren-18542",
                "title": "Frieren: Beyond Journey's End",
                "alID": 154587,
                "totalEpisodes": 28,
                "episodes": [
                    {"id": "frieren-18542?ep=1", "number": 1.0, "title": "The Journey's End"}
                ]
            }),
        )
        .route_json(
            "info.test/api/anime/hianime/",
            json!({"results": [
                {"id": "frieren-movie-999", "title": "Frieren the Movie"},
                {"id": "frieren-18542", "title": "Frieren: Beyond Journey's End"}
            ]}),
        );
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let info = hub
        .info_lookup("Frieren: Beyond Journey's End")
        .await
        .expect("info found");

    assert_eq!(info.id, "frieren-18542");
    assert_eq!(info.al_id, Some(154587));
    assert_eq!(info.episodes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn info_lookup_without_base_is_none() {
    let mut config = stub_config();
    config.info_api_base = None;
    let hub = Hub::with_context(context_over(StubTransport::new(), config));

    assert!(hub.info_lookup("anything").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn comics_search_falls_back_to_advanced_search() {
    let transport = StubTransport::new()
        .route_json(
            "advanced-search",
            json!({"comics": [{"title": "Found Via Advanced", "slug": "found-via-advanced"}]}),
        )
        .route("search?q=", StubResponse::Status(500, "down".to_string()));
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let results = hub.comics_search("found", 20).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].slug, "found-via-advanced");
}

#[tokio::test(start_paused = true)]
async fn comic_detail_and_chapters_flow() {
    let transport = StubTransport::new().route_json(
        "comic/virus-girlfriend",
        json!({"comic": {
            "title": "Virus Girlfriend",
            "image": "https://img.test/vg-800x1200.jpg",
            "synopsis": "A girlfriend, but a virus.",
            "genres": [{"name": "Action"}, "Romance"],
            "chapters": [
                {"title": "Chapter 1", "chapter": "1", "link": "https://site.test/manga/virus-girlfriend/chapter-1/"},
                {"title": "Chapter 2", "chapter": "2", "link": "/manga/virus-girlfriend/chapter-2/", "date": "2024-05-01"}
            ]
        }}),
    );
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let detail = hub.comic_detail("virus-girlfriend").await.unwrap().unwrap();
    assert_eq!(detail.slug, "virus-girlfriend");
    assert_eq!(detail.genres, vec!["Action".to_string(), "Romance".to_string()]);

    let chapters = hub.comic_chapters("virus-girlfriend").await.unwrap();
    assert_eq!(chapters.len(), 2);
    // Latest first; ids are whole path segments for the reader endpoint.
    assert_eq!(chapters[0].chapter, "2");
    assert_eq!(chapters[0].id, "manga/virus-girlfriend/chapter-2");
    assert_eq!(chapters[0].release_date.as_deref(), Some("2024-05-01"));
    assert_eq!(chapters[1].id, "manga/virus-girlfriend/chapter-1");
}

#[tokio::test(start_paused = true)]
async fn chapter_pages_flow() {
    let transport = StubTransport::new().route_json(
        "chapter/manga/virus-girlfriend/chapter-2",
        json!({"images": ["https://img.test/p1.jpg", "https://img.test/p2.jpg"],
               "comic_title": "Virus Girlfriend", "chapter_number": "2"}),
    );
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let pages = hub
        .comic_chapter_pages("manga/virus-girlfriend/chapter-2")
        .await
        .unwrap();
    assert_eq!(pages.images.len(), 2);
    assert_eq!(pages.title, "Virus Girlfriend");
    assert_eq!(pages.chapter, "2");
}

#[tokio::test(start_paused = true)]
async fn chapter_pages_failure_degrades_to_empty() {
    let hub = Hub::with_context(context_over(StubTransport::new(), stub_config()));

    let pages = hub.comic_chapter_pages("manga/unknown/chapter-9").await.unwrap();
    assert!(pages.images.is_empty());
}

#[tokio::test(start_paused = true)]
async fn library_filters_by_letter_and_slices() {
    let transport = StubTransport::new().route_json(
        "unlimited",
        json!({"comics": [
            {"title": "Akira", "slug": "akira"},
            {"title": "Berserk", "slug": "berserk"},
            {"title": "Astra", "slug": "astra"},
            {"title": "20th Century Boys", "slug": "20th-century-boys"},
            {"title": "Area 51 APK", "slug": "spam"}
        ]}),
    );
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let page = hub.library(1, 6, Some("A")).await.unwrap();
    let slugs: Vec<&str> = page.items.iter().map(|i| i.slug.as_str()).collect();
    // Letter filter keeps A-titles; the spam entry never surfaces.
    assert_eq!(slugs, vec!["akira", "astra"]);
    assert!(!page.has_next_page);

    let page = hub.library(1, 6, Some("0-9")).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].slug, "20th-century-boys");

    let page = hub.library(2, 2, None).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_next_page);
}

#[tokio::test(start_paused = true)]
async fn episode_lookup_and_existence_probe() {
    let transport = StubTransport::new().route_json(
        "episode/one-piece-episode-1",
        json!({"stream_url": "https://cdn.test/op1.m3u8"}),
    );
    let hub = Hub::with_context(context_over(transport.clone(), stub_config()));

    let outcome = hub.episode("one-piece-episode-1").await.unwrap();
    assert!(outcome.is_ok());

    assert!(hub.episode_exists("one-piece-episode-1").await.unwrap());
    assert!(!hub.episode_exists("missing-episode").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn hub_snapshot_reflects_traffic() {
    let transport = StubTransport::new().route_json("/ongoing", json!({"animes": []}));
    let hub = Hub::with_context(context_over(transport, stub_config()));

    let before = hub.rate_limit_snapshot();
    assert_eq!(before.used, 0);

    let _ = hub
        .anime_feed(&mokuroku::types::FeedRequest::from(mokuroku::types::FeedKind::Ongoing))
        .await;

    let after = hub.rate_limit_snapshot();
    assert_eq!(after.used, 1);
    assert_eq!(after.limit, 70);
}
