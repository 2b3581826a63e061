//! Title normalization, slug derivation and query variant expansion.
//!
//! Catalog titles arrive dirty: season markers, fansub noise, bracketed
//! notes, inconsistent punctuation. Matching the same series across sources
//! means aggressively cleaning titles and trying several spellings of a
//! query. Everything here is pure string work, shared by the cross-source
//! matcher, the search index and the feed pipeline.

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens that carry no identity for title comparison.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "and", "to", "in", "no", "ni", "ga", "wo", "wa", "de", "la", "le",
    "el",
];

static SEASON_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bseason\s*\d+\b|\bs\d+\b|\bpart\s*\d+\b|\bcour\s*\d+\b|\b(?:2nd|3rd|4th|5th)\s*season\b|\b(?:second|third|fourth|fifth)\s*season\b",
    )
    .expect("season token pattern")
});

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((.*?)\)|\[(.*?)\]").expect("bracket pattern"));

static SUB_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:sub|dub|indo|indonesia|subtitle|subbed|dubbed)\b").expect("sub noise")
});

static FORMAT_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:tv|movie|ova|ona|special|episode|episodes|eps)\b").expect("format noise")
});

static BARE_SEASON_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:season|part|cour)\b").expect("season words"));

static QUERY_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:sub|dub|subbed|season|part|movie)\b").expect("query noise")
});

static SEASON_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bseason\s+(\d+)\b").expect("season number"));

static SHORT_SEASON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bs(\d+)\b").expect("short season"));

static EPISODE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-episode-\d+$").expect("episode suffix"));

/// Lowercases, replaces everything but ASCII alphanumerics with spaces and
/// collapses whitespace.
pub fn normalize(value: &str) -> String {
    let lowered = value.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// [`normalize`] plus stopword removal; the comparison key for dedupe.
pub fn normalize_title_key(value: &str) -> String {
    normalize(value)
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic slug from a title: lowercase, alphanumeric runs joined by
/// hyphens. The same title always yields the same slug.
pub fn to_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Turns a slug back into a searchable phrase: the trailing
/// `-episode-N` marker is dropped, hyphens become spaces.
pub fn humanize_slug(slug: &str) -> String {
    EPISODE_SUFFIX.replace(slug, "").replace('-', " ")
}

/// Removes season markers: `season 2`, `s2`, `part 3`, `cour 2`, ordinal
/// forms (`2nd season`, `third season`).
pub fn strip_season_tokens(value: &str) -> String {
    collapse_whitespace(&SEASON_TOKENS.replace_all(value, " "))
}

/// Removes release noise: bracketed text, sub/dub markers, format words and
/// bare season vocabulary.
pub fn strip_noise_tokens(value: &str) -> String {
    let without_brackets = BRACKETED.replace_all(value, " ");
    let without_sub = SUB_NOISE.replace_all(&without_brackets, " ");
    let without_format = FORMAT_NOISE.replace_all(&without_sub, " ");
    let without_season_words = BARE_SEASON_WORDS.replace_all(&without_format, " ");
    collapse_whitespace(&without_season_words)
}

fn strip_punctuation(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the ordered, de-duplicated list of query candidates for matching
/// a local title against an external metadata catalog.
///
/// Starts with the raw title and works towards ever more stripped variants;
/// a slug, when supplied, contributes humanized forms at the end. Callers
/// query candidates in order and stop at the first hit, so the order here is
/// most-specific first.
pub fn build_search_candidates(title: &str, slug: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut add = |value: String| {
        let trimmed = value.trim().to_string();
        if !trimmed.is_empty() && !candidates.contains(&trimmed) {
            candidates.push(trimmed);
        }
    };

    add(title.to_string());
    add(strip_season_tokens(title));
    add(strip_noise_tokens(title));
    add(strip_noise_tokens(&strip_season_tokens(title)));

    let unpunctuated = strip_punctuation(title);
    add(unpunctuated.clone());
    add(strip_season_tokens(&unpunctuated));
    add(strip_noise_tokens(&unpunctuated));
    add(strip_noise_tokens(&strip_season_tokens(&unpunctuated)));

    if let Some(slug) = slug {
        let base = humanize_slug(slug);
        add(base.clone());
        add(strip_season_tokens(&base));
        add(strip_noise_tokens(&base));
    }

    candidates
}

/// Expands a (normalized) search query into close variants: noise words
/// dropped, `season N` and `sN` swapped for each other.
pub fn expand_query_variants(query: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    if query.is_empty() {
        return variants;
    }
    let mut add = |value: String| {
        if !value.is_empty() && !variants.contains(&value) {
            variants.push(value);
        }
    };

    add(query.to_string());

    let cleaned = collapse_whitespace(&QUERY_NOISE.replace_all(query, " "));
    if cleaned != query {
        add(cleaned);
    }

    if let Some(captures) = SEASON_NUMBER.captures(query) {
        let season = &captures[1];
        add(
            SEASON_NUMBER
                .replace(query, format!("s{season}"))
                .to_string(),
        );
    }

    if let Some(captures) = SHORT_SEASON.captures(query) {
        let season = &captures[1];
        add(
            SHORT_SEASON
                .replace(query, format!("season {season}"))
                .to_string(),
        );
    }

    variants
}

/// Index of the best title match for `query` within `titles`.
///
/// Exact normalized equality wins immediately; otherwise the score is the
/// number of query words contained in the candidate title, strict-greater
/// wins and ties keep the earliest candidate. Returns `Some(0)` for a
/// non-empty list even when nothing scores, since the first result is the
/// upstream's own best guess.
pub fn best_match_index(query: &str, titles: &[String]) -> Option<usize> {
    if titles.is_empty() {
        return None;
    }
    let norm_query = normalize(query);
    let mut best = 0usize;
    let mut best_score: i64 = -1;

    for (index, candidate) in titles.iter().enumerate() {
        let norm_title = normalize(candidate);
        if norm_title.is_empty() {
            continue;
        }
        if norm_title == norm_query {
            return Some(index);
        }
        let score = norm_query
            .split_whitespace()
            .filter(|word| norm_title.contains(*word))
            .count() as i64;
        if score > best_score {
            best_score = score;
            best = index;
        }
    }

    Some(best)
}

/// Remote query shortlist for a search: raw input, normalized form,
/// slug-ified form and the expanded variants (plus their slug forms), capped
/// at `max` entries.
pub fn build_remote_queries(raw: &str, normalized: &str, max: usize) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let mut add = |value: String| {
        if !value.is_empty() && !queries.contains(&value) {
            queries.push(value);
        }
    };

    add(raw.trim().to_string());
    add(normalized.to_string());
    add(normalized.replace(' ', "-"));

    for variant in expand_query_variants(normalized) {
        add(variant.clone());
        add(variant.replace(' ', "-"));
    }

    queries.truncate(max);
    queries
}
