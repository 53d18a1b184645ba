//! Entity and quantity extraction from transcribed utterances.
//!
//! Pulls the item phrase and an optional count out of noisy text like
//! "add five 12 volt adaptors to the shelf". The tricky part is telling a
//! *quantity* ("add 5 multimeters") apart from a *specification* ("100 RPM",
//! "13.5 cm"): a standalone integer followed by a unit word is a spec and
//! must stay in the item phrase.

use std::sync::LazyLock;

use regex::Regex;

/// Unit-word spellings normalized to the short forms the stored names use.
const UNIT_NORMALIZATION: &[(&str, &str)] = &[
    ("centimeters", "cm"),
    ("centimeter", "cm"),
    ("millimeters", "mm"),
    ("millimeter", "mm"),
    ("meters", "m"),
    ("meter", "m"),
    ("kilovolts", "kv"),
    ("kilovolt", "kv"),
    ("volts", "v"),
    ("volt", "v"),
    ("watts", "w"),
    ("watt", "w"),
    ("kilowatts", "kw"),
    ("kilowatt", "kw"),
    ("amperes", "a"),
    ("ampere", "a"),
    ("amps", "a"),
    ("amp", "a"),
    ("diameters", "dia"),
    ("diameter", "dia"),
];

/// Multi-word spellings normalized before per-word processing.
const PHRASE_NORMALIZATION: &[(&str, &str)] = &[
    ("national instruments", "ni"),
    ("nat inst", "ni"),
];

/// Spoken number words mapped to digits.
const NUMBER_WORDS: &[(&str, &str)] = &[
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
    ("ten", "10"),
];

/// Unit words whose preceding integer is a spec, not a quantity.
const SPEC_UNITS: &[&str] = &[
    "v", "kv", "w", "kw", "rpm", "a", "mah", "mm", "cm", "m", "kg", "g", "dia", "volt", "watt",
    "amp", "ohm", "volts", "watts", "amps", "cross", "x", "by", "ah", "ohms",
];

/// Words carrying no item information, stripped from the item phrase.
const STOPWORDS: &[&str] = &[
    "s", "so", "well", "now", "then", "okay", "ok", "please", "give", "find", "search", "show",
    "tell", "where", "what", "how", "needed", "need", "want", "looking", "look", "get", "got",
    "have", "has", "had", "stored", "kept", "located", "check", "stock", "quantity", "many",
    "much", "available", "left", "inventory", "count", "add", "remove", "restock", "received",
    "increase", "decrease", "used", "taken", "took", "picked", "grabbed", "put", "placed",
    "deposited", "withdrew", "reduce", "unit", "units", "piece", "pieces", "for", "from",
    "with", "by", "per", "of", "to", "in", "at", "on", "and", "any", "do", "does", "you", "we",
    "your", "our", "is", "it", "its", "am", "are", "was", "were", "be", "been", "being",
    "this", "that", "there", "here", "the", "a", "an", "all", "list", "type", "types",
    "kind", "kinds", "sort", "sorts", "item", "items", "thing", "things", "stuff", "object",
    "objects",
];

/// Conversational lead-ins stripped from an entity phrase (longer first).
const PHRASE_PREFIXES: &[&str] = &[
    "i need a ",
    "i need ",
    "i want ",
    "i would like ",
    "please find ",
    "find ",
    "where is ",
    "look for ",
    "search for ",
    "check for ",
    "give me ",
    "get me ",
    "show me ",
    "do you have ",
    "is there ",
    "are there ",
    "i meant ",
    "meant ",
    "actually ",
    "no ",
    "sorry ",
    "correction ",
];

/// Leading determiners stripped after the prefixes.
const LEADING_WORDS: &[&str] = &["the ", "a ", "an ", "some ", "my ", "i ", "they ", "we "];

/// The item phrase and quantity recognized in an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Cleaned item phrase; empty when the utterance named no item.
    pub item: String,
    /// Captured count; defaults to 1 when no quantity was spoken.
    pub quantity: u32,
}

static RE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s+to\s+(\d)").unwrap());

/// Extract the item phrase and quantity from an utterance.
pub fn extract(text: &str) -> Entity {
    let mut text = text.to_lowercase();

    for (phrase, short) in PHRASE_NORMALIZATION {
        text = text.replace(phrase, short);
    }

    // Stored names spell ranges with "dash" ("9dash12V").
    text = RE_RANGE.replace_all(&text, "${1}dash${2}").into_owned();
    text = text.replace('-', "dash");

    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            let bare = w.trim_matches(|c: char| ".,?!".contains(c));
            if let Some((_, digit)) = NUMBER_WORDS.iter().find(|(word, _)| *word == bare) {
                return (*digit).to_string();
            }
            if let Some((_, short)) = UNIT_NORMALIZATION.iter().find(|(long, _)| *long == bare) {
                return (*short).to_string();
            }
            w.to_string()
        })
        .collect();

    // First standalone integer not followed by a unit word is the quantity.
    let mut quantity = 1u32;
    let mut qty_index = None;
    for (i, w) in words.iter().enumerate() {
        let bare = w.trim_matches(|c: char| ".,?!".contains(c));
        if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let next_is_unit = words
            .get(i + 1)
            .map(|n| n.trim_matches(|c: char| ".,?!".contains(c)))
            .is_some_and(|n| SPEC_UNITS.contains(&n));
        if !next_is_unit {
            if let Ok(q) = bare.parse() {
                quantity = q;
                qty_index = Some(i);
            }
            break;
        }
    }

    let mut clean_words = Vec::new();
    for (i, w) in words.iter().enumerate() {
        if Some(i) == qty_index {
            continue;
        }
        // Keep interior dots so "13.5" survives; strip a trailing one.
        let mut bare = w.trim_matches(|c: char| "?!,".contains(c)).to_string();
        if bare.ends_with('.') {
            bare.pop();
        }
        if !bare.is_empty() && !STOPWORDS.contains(&bare.as_str()) {
            clean_words.push(bare);
        }
    }

    let mut item = clean_words.join(" ");

    // Plural normalization: "batteries" → "battery", "motors" → "motor".
    if let Some(stem) = item.strip_suffix("ies") {
        item = format!("{stem}y");
    } else if item.ends_with('s') && !item.ends_with("ss") {
        item.pop();
    }

    Entity { item, quantity }
}

/// Strip conversational lead-ins and leading determiners from an entity
/// phrase ("i need a servo" → "servo").
pub fn clean_entity_phrase(phrase: &str) -> String {
    let mut clean = phrase.to_lowercase().trim().to_string();

    for prefix in PHRASE_PREFIXES {
        if let Some(rest) = clean.strip_prefix(prefix) {
            clean = rest.trim().to_string();
        }
    }
    for lead in LEADING_WORDS {
        if let Some(rest) = clean.strip_prefix(lead) {
            clean = rest.trim().to_string();
        }
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_before_item() {
        let e = extract("Add 5 multimeters to inventory");
        assert_eq!(e.quantity, 5);
        assert!(e.item.contains("multimeter"));
    }

    #[test]
    fn spec_number_is_not_a_quantity() {
        let e = extract("Where are the 100 RPM motors");
        assert_eq!(e.quantity, 1);
        assert_eq!(e.item, "100 rpm motor");
    }

    #[test]
    fn number_words_become_digits() {
        let e = extract("take out three resistors");
        assert_eq!(e.quantity, 3);
        assert!(e.item.contains("resistor"));
    }

    #[test]
    fn unit_words_normalize_to_short_forms() {
        let e = extract("find the 12 volt motor");
        assert_eq!(e.item, "12 v motor");
    }

    #[test]
    fn decimal_specs_survive() {
        let e = extract("do we have 13.5 cm wheel");
        assert_eq!(e.item, "13.5 cm wheel");
        assert_eq!(e.quantity, 1);
    }

    #[test]
    fn ranges_are_spelled_dash() {
        let e = extract("AC-DC converter 9 to 12");
        assert!(e.item.contains("acdashdc"));
        assert!(e.item.contains("9dash12"));
        // Non-numeric "to" does not glue words together.
        let e = extract("moved wire to shelf");
        assert!(!e.item.contains("dash"));
    }

    #[test]
    fn plural_normalization() {
        assert_eq!(extract("batteries").item, "battery");
        assert_eq!(extract("servo motors").item, "servo motor");
        // Double-s words keep their suffix.
        assert_eq!(extract("glass").item, "glass");
    }

    #[test]
    fn stopwords_do_not_leak_into_item() {
        let e = extract("check stock of adapter");
        assert_eq!(e.item, "adapter");
    }

    #[test]
    fn clean_entity_phrase_strips_lead_ins() {
        assert_eq!(clean_entity_phrase("i need a servo"), "servo");
        assert_eq!(clean_entity_phrase("the servo"), "servo");
        assert_eq!(clean_entity_phrase("sorry the multimeter"), "multimeter");
        assert_eq!(clean_entity_phrase("servo"), "servo");
    }

    #[test]
    fn no_item_yields_empty_phrase() {
        let e = extract("how many are there");
        assert_eq!(e.item, "");
        assert_eq!(e.quantity, 1);
    }
}
