//! Result summarizer: candidate sets to replies and follow-up context.
//!
//! A resolved candidate set becomes one of four shapes: "too many, narrow
//! down" (>20), a variations question listing distinguishing specs (6–20),
//! a direct answer (exactly 1), or a location-grouped listing (2–5, or any
//! count when the user explicitly asked for the full list). The first two
//! shapes park a [`PendingContext`] so the next utterance can refine.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::PendingContext;
use crate::intent::Intent;
use crate::search::MatchCandidate;

/// Phrases that bypass summarization thresholds.
const FORCE_LIST_TRIGGERS: &[&str] = &[
    "list all",
    "list everything",
    "show all",
    "show me all",
    "give me all",
    "tell me all",
];

/// Number + unit specs as stored names spell them: "12V", "7 AH",
/// "1point3 AH", "1000 RPM".
static RE_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:[.,]|\s*point\s*)?\d*)\s*(RPM|KV|V|W|A|AH|MAH|MM|CM|M|KG|G|OHM|OHMS)\b")
        .unwrap()
});

static RE_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*point\s*(\d+)").unwrap());
static RE_CROSS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)cross").unwrap());
static RE_DASH_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)dash").unwrap());

/// What a turn does to the session's pending context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEffect {
    /// Leave any pending context untouched.
    Keep,
    /// Drop the pending context.
    Clear,
    /// Replace the pending context.
    Set(PendingContext),
}

/// A rendered reply plus its context effect.
#[derive(Debug, Clone)]
pub struct Summary {
    pub reply: String,
    pub effect: ContextEffect,
}

/// Whether the utterance explicitly asks for the full list.
pub fn force_list_requested(raw_text: &str) -> bool {
    let lower = raw_text.to_lowercase();
    FORCE_LIST_TRIGGERS.iter().any(|t| lower.contains(t))
}

/// Undo stored-name spelling artifacts for user-facing text:
/// "Flecross" → "Flex", "13point5" → "13.5", "9dash12" → "9 to 12".
pub fn display_name(name: &str) -> String {
    let name = RE_CROSS.replace_all(name, "x");
    let name = RE_POINT.replace_all(&name, "$1.$2");
    let name = RE_DASH_WORD.replace_all(&name, " to ");
    let name = name.replace('-', " to ").replace('_', " ");
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct specs across item names, normalized ("1point3 AH" → "1.3 AH"),
/// sorted.
pub fn extract_specs<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut specs = BTreeSet::new();
    for name in names {
        let normalized = name.replace(['-', '_'], " ");
        for cap in RE_SPEC.captures_iter(&normalized) {
            let value = cap[1]
                .to_lowercase()
                .replace("point", ".")
                .replace(',', ".")
                .replace(' ', "");
            specs.insert(format!("{} {}", value, cap[2].to_uppercase()));
        }
    }
    specs.into_iter().collect()
}

/// Summarize a lookup result set (check-stock / check-location).
pub fn summarize(
    intent: Intent,
    item_phrase: &str,
    raw_text: &str,
    results: Vec<MatchCandidate>,
    quantity: u32,
) -> Summary {
    let force = force_list_requested(raw_text);
    let found_any = !results.is_empty();

    // Zero-quantity items are hidden from lookups, but "found yet out of
    // stock" reads differently from "not found at all".
    let in_stock: Vec<MatchCandidate> =
        results.into_iter().filter(|r| r.quantity > 0).collect();

    if in_stock.is_empty() {
        let reply = if found_any {
            format!(
                "I found matches for {}, but they are currently out of stock.",
                display_name(item_phrase)
            )
        } else if intent == Intent::CheckLocation {
            format!("I don't know where {item_phrase} is stored.")
        } else {
            format!("I could not find anything matching {item_phrase}.")
        };
        return Summary {
            reply,
            effect: ContextEffect::Keep,
        };
    }

    let count = in_stock.len();
    if count > 20 && !force {
        return Summary {
            reply: format!(
                "I found {count} matches. That's too many to list. Please be more specific."
            ),
            effect: ContextEffect::Set(PendingContext {
                parent_item: item_phrase.to_string(),
                intent,
                quantity,
                awaiting_spec: true,
            }),
        };
    }

    if count > 5 && !force {
        let variations = variation_list(&in_stock);
        return Summary {
            reply: format!(
                "I found {count} matches. Variations include {variations}. Which one do you want?"
            ),
            effect: ContextEffect::Set(PendingContext {
                parent_item: item_phrase.to_string(),
                intent,
                quantity,
                awaiting_spec: true,
            }),
        };
    }

    if count == 1 {
        let only = &in_stock[0];
        let name = display_name(&only.name);
        let reply = match intent {
            Intent::CheckStock => {
                if only.quantity == 1 {
                    format!("There is 1 {} stored in {}.", name, only.location)
                } else {
                    format!(
                        "There are {} {}s stored in {}.",
                        only.quantity, name, only.location
                    )
                }
            }
            _ => format!(
                "{} {} of {} is located at {}.",
                only.quantity,
                unit_word(only.quantity),
                name,
                only.location
            ),
        };
        // Remember the resolved item so "and how many are there" works
        // without re-disambiguation.
        return Summary {
            reply,
            effect: ContextEffect::Set(PendingContext {
                parent_item: only.name.clone(),
                intent,
                quantity,
                awaiting_spec: false,
            }),
        };
    }

    Summary {
        reply: format!("I found {count} matches. {}", grouped_by_location(&in_stock)),
        effect: ContextEffect::Clear,
    }
}

/// Disambiguation summary for update intents: name variations rather than
/// specs, preserving the captured quantity for the eventual update.
pub fn update_disambiguation(
    intent: Intent,
    item_phrase: &str,
    results: &[MatchCandidate],
    quantity: u32,
) -> Summary {
    let count = results.len();
    let effect = ContextEffect::Set(PendingContext {
        parent_item: item_phrase.to_string(),
        intent,
        quantity,
        awaiting_spec: true,
    });

    if count > 20 {
        return Summary {
            reply: format!(
                "I found {count} matches for {}. Please be more specific.",
                display_name(item_phrase)
            ),
            effect,
        };
    }

    let variations: Vec<String> = results
        .iter()
        .map(|r| display_name(&r.name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(20)
        .collect();
    Summary {
        reply: format!(
            "I found {count} matches. Variations include {}. Which one did you mean?",
            variations.join(", ")
        ),
        effect,
    }
}

/// Distinguishing variations: specs when any exist, cleaned names
/// otherwise. Short specs sort first so the question stays speakable.
fn variation_list(results: &[MatchCandidate]) -> String {
    let specs = extract_specs(results.iter().map(|r| r.name.as_str()));
    let variations: Vec<String> = if specs.is_empty() {
        results
            .iter()
            .map(|r| display_name(&r.name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(20)
            .collect()
    } else {
        let mut sorted = specs;
        sorted.sort_by_key(|s| (s.len(), s.clone()));
        sorted.into_iter().take(15).collect()
    };
    variations.join(", ")
}

/// Render "N units of X, M units of Y are all located at L" across
/// locations, in first-appearance order.
fn grouped_by_location(results: &[MatchCandidate]) -> String {
    let mut groups: Vec<(String, Vec<(String, u32)>)> = Vec::new();
    for r in results {
        let entry = (display_name(&r.name), r.quantity);
        match groups.iter_mut().find(|(loc, _)| *loc == r.location) {
            Some((_, items)) => items.push(entry),
            None => groups.push((r.location.clone(), vec![entry])),
        }
    }

    let details: Vec<String> = groups
        .iter()
        .map(|(loc, items)| {
            let parts: Vec<String> = items
                .iter()
                .map(|(name, qty)| format!("{} {} of {}", qty, unit_word(*qty), name))
                .collect();
            if parts.len() > 1 {
                let head = parts[..parts.len() - 1].join(", ");
                format!(
                    "{} and {} are all located at {}",
                    head,
                    parts[parts.len() - 1],
                    loc
                )
            } else {
                format!("{} is located at {}", parts[0], loc)
            }
        })
        .collect();
    details.join(". ")
}

fn unit_word(quantity: u32) -> &'static str {
    if quantity == 1 { "unit" } else { "units" }
}
