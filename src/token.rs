//! Tokenizer/normalizer: splits raw utterance text into matchable tokens.
//!
//! Inventory names embed model codes ("RMCS1106"), specs ("100RPM", "13.5 cm"),
//! and spelling artifacts (multiplication signs stored as "cross"). The
//! tokenizer splits on digit/letter boundaries so that code fragments become
//! independently matchable, keeps decimals intact, and generates the spelling
//! variants that the stored names use.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+$").unwrap());
static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// A single query token with its optional spelling variant.
///
/// The variant covers the two artifacts the stored names use:
/// decimals spelled with "point" ("13.5" ↔ "13point5") and multiplication
/// signs spelled as "cross" ("flex" ↔ "flecross"). A name matches the token
/// if it contains either form as a substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    /// Normalized (lowercase) primary form.
    pub text: String,
    /// Alternate spelling, when one exists.
    pub variant: Option<String>,
}

impl QueryToken {
    /// Build a token, deriving the variant form if applicable.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let variant = if RE_DECIMAL.is_match(&text) {
            Some(text.replace('.', "point"))
        } else if text.contains('x') {
            Some(text.replace('x', "cross"))
        } else {
            None
        };
        Self { text, variant }
    }

    /// Whether a lowercase item name contains this token or its variant.
    pub fn matches(&self, name_lower: &str) -> bool {
        if name_lower.contains(self.text.as_str()) {
            return true;
        }
        self.variant
            .as_deref()
            .is_some_and(|v| name_lower.contains(v))
    }
}

/// Normalize raw text: NFKC fold, lowercase, collapse whitespace.
pub fn normalize(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a phrase into matchable tokens.
///
/// Whitespace-delimited words are kept intact when they are decimals
/// (`"13.5"`); otherwise each word is split into runs of digits and runs of
/// non-digits, preserving order and discarding empty runs
/// (`"RMCS1106"` → `["RMCS", "1106"]`, `"100RPM"` → `["100", "RPM"]`).
pub fn tokenize(phrase: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in phrase.split_whitespace() {
        if RE_DECIMAL.is_match(word) {
            tokens.push(word.to_string());
            continue;
        }
        let mut run = String::new();
        let mut run_is_digit = None;
        for ch in word.chars() {
            let is_digit = ch.is_ascii_digit();
            if run_is_digit.is_some_and(|d| d != is_digit) {
                tokens.push(std::mem::take(&mut run));
            }
            run.push(ch);
            run_is_digit = Some(is_digit);
        }
        if !run.is_empty() {
            tokens.push(run);
        }
    }
    tokens
}

/// Tokenize a normalized phrase into [`QueryToken`]s with variants.
pub fn query_tokens(phrase: &str) -> Vec<QueryToken> {
    tokenize(phrase).into_iter().map(QueryToken::new).collect()
}

/// Standalone integers in a phrase: tokens composed solely of digits.
/// These carry the strict-match requirement ("10" must never match
/// "100 RPM" through substring containment). Decimals are excluded —
/// "13.5" is one token and not all digits.
pub fn standalone_integers(phrase: &str) -> BTreeSet<u64> {
    tokenize(phrase)
        .into_iter()
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .collect()
}

/// All integer substrings embedded in an item name
/// (`"RMCS1106"` → `{1106}`, `"1000 RPM"` → `{1000}`).
pub fn name_integers(name: &str) -> BTreeSet<u64> {
    RE_INTEGER
        .find_iter(name)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphanumeric_codes_split_at_digit_boundaries() {
        assert_eq!(tokenize("RMCS1106"), vec!["RMCS", "1106"]);
        assert_eq!(tokenize("100RPM"), vec!["100", "RPM"]);
        assert_eq!(tokenize("PUD81I"), vec!["PUD", "81", "I"]);
    }

    #[test]
    fn decimals_stay_intact() {
        assert_eq!(tokenize("13.5"), vec!["13.5"]);
        assert_eq!(tokenize("13.5 cm wheel"), vec!["13.5", "cm", "wheel"]);
    }

    #[test]
    fn decimal_token_gets_point_variant() {
        let token = QueryToken::new("13.5");
        assert_eq!(token.variant.as_deref(), Some("13point5"));
        assert!(token.matches("wheel 13point5 cm dia"));
        assert!(token.matches("wheel 13.5 cm dia"));
    }

    #[test]
    fn x_token_gets_cross_variant() {
        let token = QueryToken::new("flex");
        assert_eq!(token.variant.as_deref(), Some("flecross"));
        assert!(token.matches("flecross sensor"));
    }

    #[test]
    fn plain_token_has_no_variant() {
        let token = QueryToken::new("servo");
        assert!(token.variant.is_none());
        assert!(token.matches("servo motor mg996r"));
        assert!(!token.matches("dc motor"));
    }

    #[test]
    fn standalone_integers_exclude_decimals() {
        let ints = standalone_integers("10 rpm motor 13.5");
        assert_eq!(ints.into_iter().collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn standalone_integers_include_embedded_code_digits() {
        // "100RPM" tokenizes to ["100", "RPM"], so 100 is strict.
        let ints = standalone_integers("100rpm motor");
        assert_eq!(ints.into_iter().collect::<Vec<_>>(), vec![100]);
    }

    #[test]
    fn name_integers_extracts_embedded_numbers() {
        let ints = name_integers("RMCS1106 1000 RPM");
        assert_eq!(ints.into_iter().collect::<Vec<_>>(), vec![1000, 1106]);
    }

    #[test]
    fn normalize_folds_case_and_whitespace() {
        assert_eq!(normalize("  Servo   MOTOR "), "servo motor");
    }
}
