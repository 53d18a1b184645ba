//! Correction adapter: model-assisted recovery of a garbled item phrase.
//!
//! Invoked only when intent confidence is too low and the direct search
//! tiers found nothing usable. The model sees the raw utterance plus a
//! short candidate list and replies in free text; nothing it says is
//! trusted verbatim. An ordered chain of validation rules — each a pure
//! function, first success wins — either anchors the reply to a real
//! candidate (or a deliberately generic sub-phrase of one, so the next
//! turn disambiguates instead of guessing) or rejects it outright. With
//! no rule match the correction fails closed.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::encoder::OllamaConfig;
use crate::error::CorrectionError;

/// Conversational lead-ins models like to prepend.
const GARBAGE_PREFIXES: &[&str] = &[
    "the user meant",
    "i think the user said",
    "correction:",
    "output:",
    "answer:",
];

/// Filler ignored by the token-overlap fallback.
const OVERLAP_STOPWORDS: &[&str] = &["the", "user", "meant", "item", "is", "a", "an", "of", "box"];

static RE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']*)["']"#).unwrap());

/// Generative model contract (spec'd as `complete(prompt, max_tokens,
/// temperature, stop_sequences) -> text`).
pub trait CorrectionModel {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
        stop: &[&str],
    ) -> Result<String, CorrectionError>;
}

/// Build the correction prompt: numbered candidates plus the raw utterance.
pub fn build_prompt(user_text: &str, candidates: &[String]) -> String {
    let list = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are matching a noisy voice transcript to an inventory item.\n\
         Rules:\n\
         1. Reply with ONLY the exact item name from the list. No explanations.\n\
         2. If the input is a generic variation of a list item, reply with the list item.\n\
         3. If no reasonable match exists, reply with 'None'.\n\n\
         Candidate list:\n{list}\n\n\
         User said: '{user_text}'\n\
         Which item did they mean?"
    )
}

/// Ask the model to pick a candidate and validate its reply.
///
/// Transport failures degrade to `None` — the pipeline continues without a
/// correction rather than surfacing the fault.
pub fn correct(
    model: &dyn CorrectionModel,
    user_text: &str,
    candidates: &[String],
) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let prompt = build_prompt(user_text, candidates);
    let response = match model.complete(&prompt, 50, 0.1, &["\n"]) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(%err, "correction model unavailable; continuing without");
            return None;
        }
    };

    if response.trim().eq_ignore_ascii_case("none") {
        return None;
    }
    parse_response(&response, candidates)
}

/// One validation rule: cleaned response + candidates (longest first) in,
/// accepted phrase out.
type Rule = fn(&str, &[String]) -> Option<String>;

/// The validation chain, evaluated in order; first success wins.
const RULES: &[(&str, Rule)] = &[
    ("starts-with-candidate", rule_starts_with_candidate),
    ("contains-candidate", rule_contains_candidate),
    ("generalized-term", rule_generalized_term),
    ("candidate-prefix", rule_candidate_prefix),
    ("token-overlap", rule_token_overlap),
];

/// Validate a raw model reply against the candidate list.
pub fn parse_response(raw: &str, candidates: &[String]) -> Option<String> {
    let cleaned = cleanup(raw);
    if cleaned.is_empty() {
        return None;
    }

    // Longest first so a specific item wins over its generic prefix.
    let mut sorted: Vec<String> = candidates.to_vec();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.len()));

    for &(name, rule) in RULES {
        if let Some(accepted) = rule(&cleaned, &sorted) {
            tracing::debug!(rule = name, %accepted, "correction accepted");
            return Some(accepted);
        }
    }
    tracing::debug!(response = %cleaned, "correction rejected: no rule matched");
    None
}

/// Strip quoting and conversational garbage, then prefer a quoted
/// substring when the model wrapped its actual answer in quotes.
fn cleanup(raw: &str) -> String {
    let mut resp = strip_quote_pair(raw.trim()).to_string();

    for prefix in GARBAGE_PREFIXES {
        if let Some(head) = resp.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
        {
            resp = strip_quote_pair(resp[prefix.len()..].trim()).to_string();
        }
    }
    if resp.ends_with('.') {
        resp.pop();
    }

    if let Some(cap) = RE_QUOTED.captures(&resp) {
        let quoted = cap[1].trim();
        if quoted.len() > 3 {
            resp = quoted.to_string();
        }
    }
    resp
}

fn strip_quote_pair(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn rule_starts_with_candidate(resp: &str, candidates: &[String]) -> Option<String> {
    let resp_lower = resp.to_lowercase();
    candidates
        .iter()
        .find(|c| resp_lower.starts_with(&c.to_lowercase()))
        .cloned()
}

fn rule_contains_candidate(resp: &str, candidates: &[String]) -> Option<String> {
    let resp_lower = resp.to_lowercase();
    candidates
        .iter()
        .find(|c| resp_lower.contains(&c.to_lowercase()))
        .cloned()
}

/// The response is a strict sub-phrase of a candidate ("DC Motor" inside
/// "DC Motor 100RPM"): accept the *generic* term so the engine asks a
/// follow-up instead of picking one variant blind.
fn rule_generalized_term(resp: &str, candidates: &[String]) -> Option<String> {
    if resp.len() <= 3 {
        return None;
    }
    let resp_lower = resp.to_lowercase();
    candidates
        .iter()
        .any(|c| c.to_lowercase().contains(&resp_lower))
        .then(|| resp.to_string())
}

/// The first two words of a candidate appear in the response: accept the
/// generic prefix or the full cleaned response, whichever is shorter.
fn rule_candidate_prefix(resp: &str, candidates: &[String]) -> Option<String> {
    let resp_lower = resp.to_lowercase();
    for cand in candidates {
        let lower = cand.to_lowercase();
        let mut words = lower.split_whitespace();
        let (Some(first), Some(second)) = (words.next(), words.next()) else {
            continue;
        };
        let prefix = format!("{first} {second}");
        if prefix.len() > 4 && resp_lower.contains(&prefix) {
            let accepted = if resp.len() < prefix.len() {
                resp.to_string()
            } else {
                prefix
            };
            return Some(accepted);
        }
    }
    None
}

/// Last resort: greatest token intersection between response and a
/// candidate, reconstructing a generic term from the shared words in
/// their original response order.
fn rule_token_overlap(resp: &str, candidates: &[String]) -> Option<String> {
    let resp_lower = resp.to_lowercase();
    let resp_tokens: BTreeSet<&str> = resp_lower
        .split_whitespace()
        .filter(|t| t.len() > 2 && !OVERLAP_STOPWORDS.contains(t))
        .collect();
    if resp_tokens.is_empty() {
        return None;
    }

    let mut best: Option<(&String, BTreeSet<&str>)> = None;
    for cand in candidates {
        let cand_lower = cand.to_lowercase();
        let cand_tokens: BTreeSet<&str> = cand_lower.split_whitespace().collect();
        let common: BTreeSet<&str> = resp_tokens
            .intersection(&cand_tokens)
            .copied()
            .collect();
        if common.is_empty() {
            continue;
        }
        let better = match &best {
            Some((_, best_common)) => common.len() > best_common.len(),
            None => true,
        };
        if better {
            // Re-collect owned borrows against the response's lifetime.
            let owned: BTreeSet<&str> = resp_tokens
                .iter()
                .copied()
                .filter(|t| common.contains(t))
                .collect();
            best = Some((cand, owned));
        }
    }

    let (cand, common) = best?;
    let generic: Vec<&str> = resp
        .split_whitespace()
        .filter(|w| common.contains(w.to_lowercase().as_str()))
        .collect();
    if generic.is_empty() {
        return Some(cand.clone());
    }
    Some(generic.join(" "))
}

// ---------------------------------------------------------------------------
// Ollama implementation
// ---------------------------------------------------------------------------

/// Correction model served by a local Ollama instance.
pub struct OllamaCorrector {
    config: OllamaConfig,
}

impl OllamaCorrector {
    /// Create a corrector with the given configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }
}

impl CorrectionModel for OllamaCorrector {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
        stop: &[&str],
    ) -> Result<String, CorrectionError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": max_tokens,
                "temperature": temperature,
                "stop": stop,
            },
        });
        let body_str =
            serde_json::to_string(&body).map_err(|e| CorrectionError::RequestFailed {
                message: format!("JSON serialize error: {e}"),
            })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| CorrectionError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| CorrectionError::ParseError {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| CorrectionError::ParseError {
                message: e.to_string(),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| CorrectionError::ParseError {
                message: "missing 'response' field".into(),
            })
    }
}

impl std::fmt::Debug for OllamaCorrector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaCorrector")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cands(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn quoted_answer_with_garbage_prefix() {
        let candidates = cands(&["Servo Motor MG996R"]);
        let result = parse_response("The user meant \"Servo Motor MG996R\".", &candidates);
        assert_eq!(result.as_deref(), Some("Servo Motor MG996R"));
    }

    #[test]
    fn response_starting_with_candidate() {
        let candidates = cands(&["Servo Motor MG996R", "DC Motor"]);
        let result = parse_response("Servo Motor MG996R is the closest item", &candidates);
        assert_eq!(result.as_deref(), Some("Servo Motor MG996R"));
    }

    #[test]
    fn candidate_mentioned_mid_response() {
        let candidates = cands(&["DC Motor"]);
        let result = parse_response("I believe it is the DC Motor here", &candidates);
        assert_eq!(result.as_deref(), Some("DC Motor"));
    }

    #[test]
    fn longest_candidate_wins_over_its_prefix() {
        let candidates = cands(&["DC Motor", "DC Motor 100RPM Plastic Gear"]);
        let result = parse_response("DC Motor 100RPM Plastic Gear", &candidates);
        assert_eq!(result.as_deref(), Some("DC Motor 100RPM Plastic Gear"));
    }

    #[test]
    fn generalization_returns_the_generic_term() {
        let candidates = cands(&["DC Motor 100RPM Plastic Gear"]);
        let result = parse_response("DC Motor", &candidates);
        // Under-specific on purpose: the engine will disambiguate next turn.
        assert_eq!(result.as_deref(), Some("DC Motor"));
    }

    #[test]
    fn candidate_prefix_rule_accepts_shorter_form() {
        let candidates = cands(&["Servo Motor MG996R"]);
        let result = parse_response("They probably want the servo motor variant", &candidates);
        assert_eq!(result.as_deref(), Some("servo motor"));
    }

    #[test]
    fn token_overlap_reconstructs_generic_term() {
        let candidates = cands(&["Standard Servo", "DC Motor"]);
        let result = parse_response("some servo apparatus", &candidates);
        assert_eq!(result.as_deref(), Some("servo"));
    }

    #[test]
    fn unrelated_response_fails_closed() {
        let candidates = cands(&["Standard Servo", "DC Motor"]);
        assert_eq!(parse_response("I could not decide", &candidates), None);
    }

    #[test]
    fn empty_response_fails_closed() {
        let candidates = cands(&["Standard Servo"]);
        assert_eq!(parse_response("   ", &candidates), None);
    }

    #[test]
    fn trivial_quoted_fragment_is_ignored() {
        let candidates = cands(&["Standard Servo"]);
        // Quoted fragment of 3 chars is below the significance floor, but
        // the unquoted remainder still matches by containment.
        let result = parse_response("'ser' Standard Servo", &candidates);
        assert_eq!(result.as_deref(), Some("Standard Servo"));
    }

    struct Canned(&'static str);

    impl CorrectionModel for Canned {
        fn complete(
            &self,
            _prompt: &str,
            _max_tokens: usize,
            _temperature: f32,
            _stop: &[&str],
        ) -> Result<String, CorrectionError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl CorrectionModel for Failing {
        fn complete(
            &self,
            _prompt: &str,
            _max_tokens: usize,
            _temperature: f32,
            _stop: &[&str],
        ) -> Result<String, CorrectionError> {
            Err(CorrectionError::RequestFailed {
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn explicit_none_reply_is_no_correction() {
        let model = Canned("None");
        assert_eq!(correct(&model, "sevro", &cands(&["Standard Servo"])), None);
    }

    #[test]
    fn transport_failure_degrades_to_none() {
        let model = Failing;
        assert_eq!(correct(&model, "sevro", &cands(&["Standard Servo"])), None);
    }

    #[test]
    fn empty_candidate_list_skips_the_model() {
        let model = Canned("Standard Servo");
        assert_eq!(correct(&model, "sevro", &[]), None);
    }

    #[test]
    fn prompt_numbers_every_candidate() {
        let prompt = build_prompt("sevro", &cands(&["Standard Servo", "DC Motor"]));
        assert!(prompt.contains("1. Standard Servo"));
        assert!(prompt.contains("2. DC Motor"));
        assert!(prompt.contains("sevro"));
    }
}
