use mokuroku::prelude::*;
use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;
    use mokuroku::cover;
    use mokuroku::feed::{self, CatalogItemsExt};
    use mokuroku::normalize;
    use mokuroku::title;
    use mokuroku::types::FeedRequestBuilder;

    fn item(slug: &str) -> CatalogItem {
        CatalogItem {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            ..Default::default()
        }
    }

    #[test]
    fn test_slug_derivation_is_deterministic() {
        assert_eq!(title::to_slug("One Piece"), "one-piece");
        assert_eq!(title::to_slug("One Piece"), title::to_slug("One Piece"));
        assert_eq!(title::to_slug("Dr. STONE: New World!!"), "dr-stone-new-world");
        assert_eq!(title::to_slug("  86  "), "86");
        assert_eq!(title::to_slug(""), "");
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(title::normalize("Re:ZERO -Starting Life-"), "re zero starting life");
        assert_eq!(title::normalize("   A   B "), "a b");
        assert_eq!(title::normalize_title_key("The Rising of the Shield Hero"), "rising shield hero");
    }

    #[test]
    fn test_humanize_slug_drops_episode_suffix() {
        assert_eq!(title::humanize_slug("one-piece-episode-1071"), "one piece");
        assert_eq!(title::humanize_slug("spy-x-family"), "spy x family");
    }

    #[test]
    fn test_season_and_noise_stripping() {
        assert_eq!(title::strip_season_tokens("Mob Psycho 100 Season 3"), "Mob Psycho 100");
        assert_eq!(title::strip_season_tokens("Overlord s4"), "Overlord");
        assert_eq!(title::strip_season_tokens("Attack on Titan 2nd Season"), "Attack on Titan");
        assert_eq!(
            title::strip_noise_tokens("Frieren (TV) [Sub Indo] Episode"),
            "Frieren"
        );
    }

    #[test]
    fn test_search_candidates_ordered_and_deduped() {
        let candidates = title::build_search_candidates(
            "Jujutsu Kaisen Season 2 (Sub)",
            Some("jujutsu-kaisen-s2-episode-5"),
        );

        // Raw title always leads; no candidate repeats.
        assert_eq!(candidates[0], "Jujutsu Kaisen Season 2 (Sub)");
        let mut deduped = candidates.clone();
        deduped.dedup();
        assert_eq!(candidates.len(), deduped.len());
        assert!(candidates.iter().any(|c| c == "Jujutsu Kaisen"));
        // Slug-derived form arrives after the title-derived forms.
        let slug_pos = candidates.iter().position(|c| c == "jujutsu kaisen s2");
        assert!(slug_pos.is_some());
    }

    #[test]
    fn test_query_variant_expansion_swaps_season_forms() {
        let variants = title::expand_query_variants("mob psycho season 3");
        assert!(variants.contains(&"mob psycho season 3".to_string()));
        assert!(variants.contains(&"mob psycho s3".to_string()));

        let variants = title::expand_query_variants("overlord s4");
        assert!(variants.contains(&"overlord season 4".to_string()));
    }

    #[test]
    fn test_best_match_prefers_exact_then_word_overlap() {
        let titles = vec![
            "One Piece Film Red".to_string(),
            "One Piece".to_string(),
            "Two Piece".to_string(),
        ];
        assert_eq!(title::best_match_index("one piece", &titles), Some(1));

        // No exact match: word-containment score, earliest wins ties.
        let titles = vec!["Alpha Beta".to_string(), "Beta Alpha".to_string()];
        assert_eq!(title::best_match_index("alpha beta", &titles), Some(0));

        assert_eq!(title::best_match_index("anything", &[]), None);
    }

    #[test]
    fn test_likely_bad_cover_detection() {
        assert!(cover::is_likely_bad(""));
        assert!(cover::is_likely_bad("https://x/lazy.jpg"));
        assert!(cover::is_likely_bad("https://x/placeholder.png"));
        assert!(cover::is_likely_bad("https://x/assets/noimage.png"));
        assert!(cover::is_likely_bad("https://x/cover.svg"));
        assert!(cover::is_likely_bad("https://x/thumb-100x100.jpg"));
        assert!(cover::is_likely_bad("https://x/img-150x150.webp"));
        assert!(!cover::is_likely_bad("https://x/large-800x1200.jpg"));
        assert!(!cover::is_likely_bad("https://x/cover.jpg"));
    }

    #[test]
    fn test_cover_size_extraction() {
        assert_eq!(cover::extract_size("https://x/a-800x1200.jpg"), Some((800, 1200)));
        assert_eq!(cover::extract_size("https://x/a.jpg"), None);
    }

    #[test]
    fn test_cover_upgrade_rewrites() {
        assert_eq!(
            cover::upgrade_url("https://thumbnail.komiku.org/a.jpg"),
            "https://img.komiku.org/a.jpg"
        );
        assert_eq!(
            cover::upgrade_url("https://x/a.jpg?resize=165,225"),
            "https://x/a.jpg"
        );
        assert_eq!(cover::upgrade_url("https://x/a.jpg"), "https://x/a.jpg");
    }

    #[test]
    fn test_select_best_cover_prefers_large_non_bad() {
        let best = cover::select_best_cover([
            "http://x/thumb-100x100.jpg",
            "http://x/large-800x1200.jpg",
        ]);
        assert_eq!(best, "http://x/large-800x1200.jpg");
    }

    #[test]
    fn test_select_best_cover_never_empty() {
        assert_eq!(cover::select_best_cover(Vec::<String>::new()), cover::PLACEHOLDER_COVER);
        assert_eq!(cover::select_best_cover(["", ""]), cover::PLACEHOLDER_COVER);

        // All-bad candidate sets still return something non-empty.
        let best = cover::select_best_cover(["https://x/lazy.jpg"]);
        assert!(!best.is_empty());
    }

    #[test]
    fn test_select_best_cover_avoids_bad_when_alternative_exists() {
        let best = cover::select_best_cover([
            "https://x/lazy.jpg",
            "https://x/cover.jpg",
            "https://x/placeholder.png",
        ]);
        assert_eq!(best, "https://x/cover.jpg");
    }

    #[test]
    fn test_merge_by_slug_properties() {
        let primary = vec![item("a"), item("b")];
        let secondary = vec![item("b"), item("c")];
        let merged = primary.clone().merge_with(secondary);

        // No duplicate slugs, primary order preserved, all primary present.
        let slugs: Vec<&str> = merged.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);
        for p in &primary {
            assert!(merged.iter().any(|m| m.slug == p.slug));
        }
    }

    #[test]
    fn test_fill_section_example_scenario() {
        let primary = vec![item("a"), item("b")];
        let fallback = vec![item("b"), item("c"), item("d")];
        let filled = feed::fill_section(primary, &fallback, 4);
        let slugs: Vec<&str> = filled.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_fill_section_never_truncates_or_reorders() {
        let primary = vec![item("a"), item("b"), item("c")];
        let fallback = vec![item("d")];

        // Already at min: unchanged.
        let filled = primary.clone().fill_from(&fallback, 2);
        assert_eq!(filled.len(), 3);
        let slugs: Vec<&str> = filled.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);

        // Fallback exhausted below min: length is primary + unique fallback.
        let filled = primary.fill_from(&fallback, 10);
        assert_eq!(filled.len(), 4);
    }

    #[test]
    fn test_paginate_slicing_and_has_next() {
        let items: Vec<CatalogItem> = (0..25).map(|i| item(&format!("s{i}"))).collect();

        let page1 = feed::paginate(&items, 1, 10);
        assert_eq!(page1.items.len(), 10);
        assert!(page1.has_next_page);

        let page3 = feed::paginate(&items, 3, 10);
        assert_eq!(page3.items.len(), 5);
        assert!(!page3.has_next_page);

        let past_end = feed::paginate(&items, 9, 10);
        assert!(past_end.items.is_empty());
        assert!(!past_end.has_next_page);
    }

    #[test]
    fn test_stable_hash_is_deterministic() {
        let a = feed::stable_hash("popular:one-piece");
        let b = feed::stable_hash("popular:one-piece");
        assert_eq!(a, b);
        assert_ne!(feed::stable_hash("popular:one-piece"), feed::stable_hash("latest:one-piece"));
    }

    #[test]
    fn test_feed_request_clamps() {
        let request = FeedRequestBuilder::default()
            .kind(FeedKind::Popular)
            .page(0usize)
            .per_page(500usize)
            .build()
            .unwrap();
        assert_eq!(request.normalized(), (1, 36));

        let request = FeedRequest::from(FeedKind::Latest);
        assert_eq!(request.normalized(), (1, 24));
    }

    #[test]
    fn test_feed_kind_parsing() {
        assert_eq!("ongoing".parse::<FeedKind>().unwrap(), FeedKind::Ongoing);
        assert_eq!("POPULAR".parse::<FeedKind>().unwrap(), FeedKind::Popular);
        assert!("weekly".parse::<FeedKind>().is_err());
    }

    #[test]
    fn test_anime_item_normalization() {
        let raw = json!({
            "title": "Frieren",
            "slug": "frieren",
            "poster": "https://x/frieren.jpg",
            "episode": 28,
            "type": "TV",
            "release_day": "Friday"
        });
        let parsed = normalize::anime_item(&raw);
        assert_eq!(parsed.slug, "frieren");
        assert_eq!(parsed.title, "Frieren");
        assert_eq!(parsed.cover, "https://x/frieren.jpg");
        assert_eq!(parsed.episode.as_deref(), Some("28"));
        assert_eq!(parsed.release_day.as_deref(), Some("Friday"));
    }

    #[test]
    fn test_slug_from_link_skips_boilerplate_segments() {
        let raw = json!({
            "title": "Virus Girlfriend",
            "link": "https://site.test/manga/virus-girlfriend/"
        });
        let parsed = normalize::comic_item(&raw);
        assert_eq!(parsed.slug, "virus-girlfriend");

        let raw = json!({
            "title": "Some Comic",
            "detailUrl": "/detail-komik/some-comic"
        });
        let parsed = normalize::comic_item(&raw);
        assert_eq!(parsed.slug, "some-comic");
    }

    #[test]
    fn test_missing_fields_fall_back_safely() {
        let parsed = normalize::comic_item(&json!({}));
        assert_eq!(parsed.title, "Untitled");
        assert_eq!(parsed.slug, "untitled");
        assert_eq!(parsed.cover, cover::PLACEHOLDER_COVER);
        assert_eq!(parsed.kind.as_deref(), Some("Manga"));
    }

    #[test]
    fn test_genres_accept_strings_and_objects() {
        let raw = json!({
            "title": "X",
            "genres": ["Action", {"name": "Comedy", "slug": "comedy"}, 42]
        });
        let parsed = normalize::comic_item(&raw);
        assert_eq!(parsed.genres, vec!["Action".to_string(), "Comedy".to_string()]);
    }

    #[test]
    fn test_list_extraction_first_present_wins() {
        let payload = json!({
            "animes": [],
            "result": {"animes": [{"slug": "hidden"}]}
        });
        // An empty but present array short-circuits the chain.
        assert!(normalize::extract_list(&payload, normalize::ANIME_LIST_PATHS).is_empty());

        let payload = json!({
            "data": {"ongoing": {"animeList": [{"slug": "a"}, {"slug": "b"}]}}
        });
        assert_eq!(normalize::extract_list(&payload, normalize::ANIME_LIST_PATHS).len(), 2);
    }

    #[test]
    fn test_manhwa_filtering() {
        assert!(normalize::is_comic_manga(&json!({"title": "Blue Lock", "type": "Manga"})));
        assert!(!normalize::is_comic_manga(&json!({"title": "Solo Max", "type": "Manhwa"})));
        assert!(!normalize::is_comic_manga(&json!({"title": "Tower Manhua Edition"})));
    }

    #[test]
    fn test_rank_comics_scoring_and_garbage() {
        let raw = vec![
            json!({"title": "Low Views", "slug": "low", "views": 10, "image": "https://x/low.jpg"}),
            json!({"title": "High Views", "slug": "high", "views": "1500 views", "image": "https://x/high.jpg"}),
            json!({"title": "Free APK Download", "slug": "spam", "views": 999999}),
            json!({"title": "High Views", "slug": "high", "views": 5}),
        ];
        let ranked = feed::rank_comics(&raw, FeedKind::Popular);
        let slugs: Vec<&str> = ranked.iter().map(|i| i.slug.as_str()).collect();

        // Spam dropped, duplicate slug dropped (first wins), numeric-from-string parsed.
        assert_eq!(slugs, vec!["high", "low"]);
    }

    #[test]
    fn test_rank_comics_fallback_score_is_stable() {
        let raw = vec![
            json!({"title": "Alpha", "slug": "alpha", "image": "https://x/alpha.jpg"}),
            json!({"title": "Beta", "slug": "beta", "image": "https://x/beta.jpg"}),
            json!({"title": "Gamma", "slug": "gamma", "image": "https://x/gamma.jpg"}),
        ];
        let first = feed::rank_comics(&raw, FeedKind::Popular);
        let second = feed::rank_comics(&raw, FeedKind::Popular);
        let order_a: Vec<&str> = first.iter().map(|i| i.slug.as_str()).collect();
        let order_b: Vec<&str> = second.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn test_rank_comics_cover_gate_falls_back() {
        // Every cover is bad: the gate must not empty the feed.
        let raw = vec![
            json!({"title": "A", "slug": "a", "image": "https://x/lazy.jpg", "views": 5}),
            json!({"title": "B", "slug": "b", "image": "https://x/placeholder.jpg", "views": 3}),
        ];
        let ranked = feed::rank_comics(&raw, FeedKind::Popular);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_latest_ranking_uses_dates() {
        let raw = vec![
            json!({"title": "Old", "slug": "old", "releaseDate": "2020-01-01", "image": "https://x/old.jpg"}),
            json!({"title": "New", "slug": "new", "releaseDate": "2024-06-01", "image": "https://x/new.jpg"}),
        ];
        let ranked = feed::rank_comics(&raw, FeedKind::Latest);
        assert_eq!(ranked[0].slug, "new");
    }

    #[test]
    fn test_error_display() {
        let error = mokuroku::Error::config("missing base");
        assert!(format!("{error}").contains("missing base"));

        let error = mokuroku::Error::upstream("Request failed with 502");
        assert!(format!("{error}").contains("502"));
    }
}
