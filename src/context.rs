//! Disambiguation context: carrying an unresolved query across turns.
//!
//! When a search comes back too broad, the engine parks the original item
//! phrase and intent in a [`PendingContext`] and asks the user to narrow.
//! The next utterance is cleaned and used to *filter the parent's result
//! set* — not to re-search the whole inventory — with relaxed unit-aware
//! matching ("volt" matches a trailing lone "v"). A refinement is accepted
//! only when it demonstrably narrows: at least one surviving result, and at
//! least one of the new tokens present in a survivor. Rejected refinements
//! leave the context untouched so the user can try again.
//!
//! The context lives in an explicit [`Session`] value passed into each
//! turn; there is no process-global state, so callers may hold one session
//! per conversation.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::alias::AliasTable;
use crate::entity;
use crate::intent::Intent;
use crate::search::MatchCandidate;

/// Conversational filler stripped from follow-up utterances. Digits and
/// unit words must survive this list.
const FILLERS: &[&str] = &[
    "isnt", "isn't", "there", "a", "an", "the", "do", "you", "have", "available", "check",
    "stock", "of", "where", "is", "one", "which", "want", "looking", "for", "please", "show",
    "me", "i", "can", "find", "search", "they", "we",
];

static RE_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static RE_LONE_V: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d*v\b").unwrap());
static RE_LONE_A: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d*a\b").unwrap());

/// A parked query awaiting a clarifying follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingContext {
    /// The original (too broad) item phrase.
    pub parent_item: String,
    /// Intent of the original turn, preserved across the clarification.
    pub intent: Intent,
    /// Quantity captured on the original turn (for update intents).
    pub quantity: u32,
    /// True when the engine asked for a distinguishing specification.
    pub awaiting_spec: bool,
}

/// Per-conversation state. Exactly one pending context at a time; a new
/// ambiguous result always overwrites the previous one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub pending: Option<PendingContext>,
}

impl Session {
    /// A fresh session with no pending context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any pending context.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Whether a clarification question is outstanding.
    pub fn is_awaiting_spec(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| p.awaiting_spec)
    }
}

/// A unit word and the relaxed signal that counts as its presence in an
/// item name. New units extend this table, not the refinement control flow.
pub struct UnitRule {
    pub words: &'static [&'static str],
    signal: fn(&str) -> bool,
}

/// The relaxed unit heuristics: spoken unit words matched against the
/// terse spellings stored names actually use.
pub static UNIT_RULES: &[UnitRule] = &[
    UnitRule {
        words: &["volt", "volts"],
        signal: |name| RE_LONE_V.is_match(name),
    },
    UnitRule {
        words: &["rpm"],
        signal: |name| name.contains("rpm") || name.contains("r p m"),
    },
    UnitRule {
        words: &["amp", "amps", "ampere"],
        signal: |name| name.contains("amp") || RE_LONE_A.is_match(name),
    },
];

/// An accepted refinement: the narrowed results and the merged query
/// phrase, ready to proceed as if it had been typed directly.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub results: Vec<MatchCandidate>,
    pub merged_item: String,
}

/// Clean a follow-up utterance for refinement: lead-in stripping, alias
/// rewrite, magnitude expansion, common ASR fixes, filler removal, and
/// plural normalization of unit words.
pub fn clean_followup(text: &str, aliases: &AliasTable) -> String {
    let phrase = entity::clean_entity_phrase(text);
    let phrase = aliases.rewrite(&phrase);

    let phrase = phrase
        .to_lowercase()
        .replace("thousand", "1000")
        .replace("hundred", "00")
        .replace("rqm", "rpm"); // frequent ASR mishearing

    let stripped = RE_PUNCT.replace_all(&phrase, "");
    let kept: Vec<&str> = stripped
        .split_whitespace()
        .filter(|w| !FILLERS.contains(w))
        .collect();

    kept.join(" ")
        .replace("volts", "volt")
        .replace("amps", "amp")
        .replace("metres", "meter")
        .replace("meters", "meter")
}

/// Filter the parent's result set by the cleaned follow-up tokens.
///
/// Returns `None` when the refinement is rejected — no meaningful tokens,
/// no survivors, or none of the *new* tokens present in any survivor (a
/// garbage follow-up must not silently fall back to the full parent list).
pub fn refine(
    pending: &PendingContext,
    parent_results: &[MatchCandidate],
    clean_input: &str,
) -> Option<Refinement> {
    let ref_tokens: BTreeSet<&str> = clean_input
        .split_whitespace()
        .filter(|t| (t.len() > 1 || t.chars().all(|c| c.is_ascii_digit())) && !t.is_empty())
        .filter(|t| !FILLERS.contains(t))
        .collect();
    if ref_tokens.is_empty() {
        return None;
    }

    let survivors: Vec<MatchCandidate> = parent_results
        .iter()
        .filter(|r| {
            let name = r.name.to_lowercase();
            let name_clean = RE_PUNCT.replace_all(&name, "").into_owned();
            ref_tokens
                .iter()
                .all(|&t| token_present(t, &name, &name_clean))
        })
        .cloned()
        .collect();
    if survivors.is_empty() {
        return None;
    }

    // A refinement must be demonstrably about the new tokens, not just the
    // parent's. Check the tokens unique to the follow-up where possible.
    let input_tokens: BTreeSet<&str> = clean_input.split_whitespace().collect();
    let parent_lower = pending.parent_item.to_lowercase();
    let parent_tokens: BTreeSet<&str> = parent_lower.split_whitespace().collect();
    let unique: BTreeSet<&str> = input_tokens.difference(&parent_tokens).copied().collect();
    let to_check = if unique.is_empty() { &input_tokens } else { &unique };

    let grounded = survivors.iter().any(|r| {
        let name = r.name.to_lowercase();
        to_check.iter().any(|t| name.contains(t))
    });
    if !grounded {
        return None;
    }

    Some(Refinement {
        merged_item: format!("{} {}", pending.parent_item, clean_input),
        results: survivors,
    })
}

/// Whether a refinement token counts as present in an item name, via
/// direct substring, digit containment, or a unit rule.
fn token_present(token: &str, name: &str, name_clean: &str) -> bool {
    if name_clean.contains(token) {
        return true;
    }
    if token.chars().all(|c| c.is_ascii_digit()) && name.contains(token) {
        return true;
    }
    UNIT_RULES
        .iter()
        .any(|rule| rule.words.contains(&token) && (rule.signal)(name_clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> MatchCandidate {
        MatchCandidate {
            name: name.into(),
            quantity: 3,
            location: "Shelf A".into(),
            score: None,
        }
    }

    fn pending(parent: &str) -> PendingContext {
        PendingContext {
            parent_item: parent.into(),
            intent: Intent::CheckStock,
            quantity: 1,
            awaiting_spec: true,
        }
    }

    #[test]
    fn followup_cleaning_keeps_digits_and_units() {
        let aliases = AliasTable::default_lab();
        assert_eq!(clean_followup("isn't there a 9 volt one?", &aliases), "9 volt");
        assert_eq!(clean_followup("the twelve thousand RQM", &aliases), "twelve 1000 rpm");
    }

    #[test]
    fn followup_cleaning_normalizes_plural_units() {
        let aliases = AliasTable::default_lab();
        assert_eq!(clean_followup("24 volts", &aliases), "24 volt");
    }

    #[test]
    fn volt_refinement_accepted_via_unit_rule() {
        let parents = vec![
            candidate("Adaptor 9V DC"),
            candidate("Adaptor 12V DC"),
            candidate("Adaptor USB"),
        ];
        let refinement = refine(&pending("adaptor"), &parents, "9 volt").unwrap();
        assert_eq!(refinement.results.len(), 1);
        assert_eq!(refinement.results[0].name, "Adaptor 9V DC");
        assert_eq!(refinement.merged_item, "adaptor 9 volt");
    }

    #[test]
    fn rpm_refinement_matches_spaced_spelling() {
        let parents = vec![candidate("Motor 100 R P M"), candidate("Motor 12V")];
        let refinement = refine(&pending("motor"), &parents, "100 rpm").unwrap();
        assert_eq!(refinement.results.len(), 1);
        assert_eq!(refinement.results[0].name, "Motor 100 R P M");
    }

    #[test]
    fn garbage_followup_is_rejected() {
        let parents = vec![candidate("Adaptor 9V DC"), candidate("Adaptor 12V DC")];
        assert!(refine(&pending("adaptor"), &parents, "save").is_none());
    }

    #[test]
    fn filler_only_followup_is_rejected() {
        let parents = vec![candidate("Adaptor 9V DC")];
        assert!(refine(&pending("adaptor"), &parents, "").is_none());
    }

    #[test]
    fn absent_spec_is_rejected_and_context_reusable() {
        let parents = vec![candidate("Adaptor 9V DC"), candidate("Adaptor 12V DC")];
        let ctx = pending("adaptor");
        // "24 volt": the unit signal matches both names, but "24" is in
        // neither, so no survivor remains.
        assert!(refine(&ctx, &parents, "24 volt").is_none());
        // The same context still accepts a valid spec afterwards.
        assert!(refine(&ctx, &parents, "12 volt").is_some());
    }

    #[test]
    fn session_overwrites_single_context() {
        let mut session = Session::new();
        session.pending = Some(pending("adaptor"));
        assert!(session.is_awaiting_spec());
        session.pending = Some(pending("motor"));
        assert_eq!(session.pending.as_ref().unwrap().parent_item, "motor");
        session.clear();
        assert!(!session.is_awaiting_spec());
    }
}
