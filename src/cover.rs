//! Cover image quality heuristics.
//!
//! Upstream payloads offer anywhere between zero and ten image fields per
//! item, many of them lazy-load placeholders, thumbnails or resized copies.
//! This module decides which candidate URL is worth showing: placeholder
//! detection, keyword quality hints, pixel-size extraction and a pairwise
//! comparator folded over the full candidate set.

use once_cell::sync::Lazy;
use regex::Regex;

/// Asset path served when no usable cover exists.
pub const PLACEHOLDER_COVER: &str = "/placeholder-cover.svg";

static PIXEL_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,4})x(\d{2,4})").expect("pixel size pattern"));

static SMALL_FIXED_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2,3}x\d{2,3}\b").expect("small size pattern"));

static SIZE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d{2,3}x\d{2,3}\.").expect("size suffix pattern"));

/// Whether a URL smells like a placeholder, lazy-load stand-in or
/// deliberately small rendition.
pub fn is_likely_bad(url: &str) -> bool {
    if url.is_empty() {
        return true;
    }
    let lowered = url.to_lowercase();
    if lowered.contains("lazy.jpg")
        || lowered.contains("placeholder")
        || lowered.contains("noimage")
        || lowered.contains("default")
        || lowered.contains("blank")
        || lowered.ends_with(".svg")
    {
        return true;
    }
    if SMALL_FIXED_SIZE.is_match(&lowered) {
        return true;
    }
    if SIZE_SUFFIX.is_match(&lowered) {
        return true;
    }
    false
}

/// Keyword-based quality hint: thumbnails score down, full-size markers up.
pub fn quality_hint(url: &str) -> i32 {
    let lowered = url.to_lowercase();
    let mut score = 0;
    if lowered.contains("thumbnail") || lowered.contains("thumb") || lowered.contains("small") {
        score -= 2;
    }
    if lowered.contains("large") || lowered.contains("original") || lowered.contains("full") {
        score += 1;
    }
    score
}

/// First `WIDTHxHEIGHT` token in the URL, when present.
pub fn extract_size(url: &str) -> Option<(u32, u32)> {
    let captures = PIXEL_SIZE.captures(url)?;
    let width = captures[1].parse::<u32>().ok()?;
    let height = captures[2].parse::<u32>().ok()?;
    Some((width, height))
}

/// Rewrites known low-resolution URL forms into their full-size
/// counterparts: the thumbnail CDN subdomain is swapped for the image CDN,
/// and resize query parameters are stripped.
pub fn upgrade_url(url: &str) -> String {
    let mut next = url.to_string();
    if next.contains("thumbnail.komiku.org") {
        next = next.replace("thumbnail.komiku.org", "img.komiku.org");
    }
    if next.contains("?resize=") {
        next = next.split('?').next().unwrap_or(&next).to_string();
    }
    next
}

/// Pairwise comparator: keeps whichever of `current`/`candidate` looks
/// better.
///
/// Non-bad beats bad; then the keyword hint; then the larger extracted
/// pixel area when both are known; a known size beats an unknown one; on a
/// full tie the incumbent stays.
pub fn pick_better(current: &str, candidate: &str) -> String {
    let current_bad = is_likely_bad(current);
    let candidate_bad = is_likely_bad(candidate);
    if current_bad && !candidate_bad {
        return candidate.to_string();
    }
    if !current_bad && candidate_bad {
        return current.to_string();
    }

    let current_hint = quality_hint(current);
    let candidate_hint = quality_hint(candidate);
    if current_hint != candidate_hint {
        return if candidate_hint > current_hint {
            candidate.to_string()
        } else {
            current.to_string()
        };
    }

    let current_size = extract_size(current);
    let candidate_size = extract_size(candidate);
    match (current_size, candidate_size) {
        (Some((cw, ch)), Some((nw, nh))) => {
            if u64::from(nw) * u64::from(nh) > u64::from(cw) * u64::from(ch) {
                candidate.to_string()
            } else {
                current.to_string()
            }
        }
        (None, Some(_)) => candidate.to_string(),
        _ => {
            if current.is_empty() {
                candidate.to_string()
            } else {
                current.to_string()
            }
        }
    }
}

/// Folds the candidate URLs (each alongside its upgraded variant) through
/// [`pick_better`] and returns the winner, or the placeholder asset when
/// nothing non-empty was offered.
///
/// Never returns an empty string.
pub fn select_best_cover<I, S>(raw_candidates: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut candidates: Vec<String> = Vec::new();
    for raw in raw_candidates {
        let url = raw.as_ref();
        if url.is_empty() {
            continue;
        }
        if !candidates.iter().any(|c| c.as_str() == url) {
            candidates.push(url.to_string());
        }
        let upgraded = upgrade_url(url);
        if !candidates.contains(&upgraded) {
            candidates.push(upgraded);
        }
    }

    let mut best = String::new();
    for candidate in &candidates {
        if best.is_empty() {
            best = candidate.clone();
            continue;
        }
        best = pick_better(&best, candidate);
    }

    if best.is_empty() {
        PLACEHOLDER_COVER.to_string()
    } else {
        best
    }
}
