//! Candidate search engine: tiered matching with numeric and drift guards.
//!
//! Tier 1 is an exact AND match over tokens (and their spelling variants);
//! tier 2 is overlap scoring with a minimum-score floor. Both tiers enforce
//! the strict-integer rule — every standalone integer in the query must be
//! an exact element of the integers embedded in a surviving name — because
//! substring containment alone would happily let "10" match "100 RPM".
//! Two guard filters keep ranked results from drifting: the critical-token
//! filter and the 85% score cutoff.

use crate::store::{InventoryItem, InventoryStore};
use crate::token::{self, query_tokens};

/// Query stopwords ignored when deriving critical tokens.
const CRITICAL_STOPWORDS: &[&str] = &[
    "s", "parts", "part", "item", "items", "the", "a", "an", "of", "in", "is", "are", "do",
    "you", "have", "looking", "for", "please", "show", "me", "where", "stock", "check", "find",
    "search", "list", "all",
];

/// A scored search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub name: String,
    pub quantity: u32,
    pub location: String,
    /// Present only for ranked-tier results; tier-1 exact matches are
    /// treated as implicitly maximal.
    pub score: Option<u32>,
}

impl MatchCandidate {
    fn exact(item: InventoryItem) -> Self {
        Self {
            name: item.name,
            quantity: item.quantity,
            location: item.location,
            score: None,
        }
    }

    fn ranked(item: InventoryItem, score: u32) -> Self {
        Self {
            name: item.name,
            quantity: item.quantity,
            location: item.location,
            score: Some(score),
        }
    }
}

/// Tier 1: exact AND match with strict integer enforcement.
pub fn exact_search(store: &dyn InventoryStore, phrase: &str) -> Vec<MatchCandidate> {
    let normalized = token::normalize(phrase);
    let tokens = query_tokens(&normalized);
    let hits = store
        .search_by_tokens(&tokens)
        .into_iter()
        .map(MatchCandidate::exact)
        .collect();
    strict_integer_filter(hits, &normalized)
}

/// Tier 2: ranked overlap with floor, strict integers, and both guard
/// filters, ordered best first (score, then closeness to the query).
pub fn ranked_search(
    store: &dyn InventoryStore,
    phrase: &str,
    cutoff_ratio: f32,
) -> Vec<MatchCandidate> {
    let normalized = token::normalize(phrase);
    let tokens = query_tokens(&normalized);
    let floor = if tokens.len() >= 2 { 2 } else { 1 };

    let hits: Vec<MatchCandidate> = store
        .ranked_search(&tokens)
        .into_iter()
        .filter(|(_, score)| *score >= floor)
        .map(|(item, score)| MatchCandidate::ranked(item, score))
        .collect();

    let hits = strict_integer_filter(hits, &normalized);
    let hits = critical_token_filter(hits, &normalized);
    let mut hits = score_cutoff_filter(hits, cutoff_ratio);

    // Closest surface form first among equal scores (stable sort).
    hits.sort_by(|a, b| {
        let ra = similarity_ratio(&normalized, &a.name.to_lowercase());
        let rb = similarity_ratio(&normalized, &b.name.to_lowercase());
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}

/// Tier 1, then tier 2 when tier 1 comes up empty.
pub fn resolve(
    store: &dyn InventoryStore,
    phrase: &str,
    cutoff_ratio: f32,
) -> Vec<MatchCandidate> {
    let exact = exact_search(store, phrase);
    if !exact.is_empty() {
        // The critical-token filter is a no-op on AND matches but is part
        // of the post-tier guard contract, so it runs here too.
        return critical_token_filter(exact, &token::normalize(phrase));
    }
    ranked_search(store, phrase, cutoff_ratio)
}

/// Every standalone integer in the query must be an exact element of the
/// integers extracted from a candidate's name.
pub fn strict_integer_filter(
    results: Vec<MatchCandidate>,
    query: &str,
) -> Vec<MatchCandidate> {
    let required = token::standalone_integers(query);
    if required.is_empty() {
        return results;
    }
    results
        .into_iter()
        .filter(|r| {
            let present = token::name_integers(&r.name);
            required.is_subset(&present)
        })
        .collect()
}

/// Query tokens confirmed present in the top result become critical; any
/// other result missing one of them is dropped. Keeps "Metal Gearbox" out
/// of a "Plastic Gearbox" result set just because "Gearbox" matched.
pub fn critical_token_filter(
    results: Vec<MatchCandidate>,
    query: &str,
) -> Vec<MatchCandidate> {
    let Some(top) = results.first() else {
        return results;
    };
    let top_name = top.name.to_lowercase();

    let critical: Vec<String> = query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| ".,?!".contains(c)).to_string())
        .filter(|w| !w.is_empty() && !CRITICAL_STOPWORDS.contains(&w.as_str()))
        .filter(|w| top_name.contains(w.as_str()))
        .collect();

    if critical.is_empty() {
        return results;
    }

    results
        .into_iter()
        .filter(|r| {
            let name = r.name.to_lowercase();
            critical.iter().all(|t| name.contains(t.as_str()))
        })
        .collect()
}

/// Drop ranked results scoring below `ratio` of the top score.
pub fn score_cutoff_filter(results: Vec<MatchCandidate>, ratio: f32) -> Vec<MatchCandidate> {
    let Some(top_score) = results.first().and_then(|r| r.score) else {
        return results;
    };
    let cutoff = top_score as f32 * ratio;
    results
        .into_iter()
        .filter(|r| r.score.is_some_and(|s| s as f32 >= cutoff))
        .collect()
}

/// Normalized similarity in `0.0..=1.0` (1.0 = identical), from edit
/// distance over characters.
pub fn similarity_ratio(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / max_len as f32
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
