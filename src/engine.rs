//! Engine facade: the per-turn query resolution pipeline.
//!
//! The `Engine` owns the collaborators behind trait objects and drives one
//! conversational turn at a time: refinement against a pending context,
//! intent classification and entity extraction, the tiered candidate
//! search, the semantic and correction fallbacks, and summarization. A
//! turn never fails — external-service faults degrade to the next tier and
//! every path ends in a reply plus an updated [`Session`].

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::alias::AliasTable;
use crate::context::{self, Session};
use crate::correction::{self, CorrectionModel};
use crate::encoder::TextEncoder;
use crate::entity;
use crate::error::{EngineError, InvenovaResult};
use crate::intent::{Intent, IntentClassifier};
use crate::search::{self, MatchCandidate};
use crate::semantic::SemanticIndex;
use crate::store::{InventoryItem, InventoryStore};
use crate::summary::{self, ContextEffect, display_name};

/// Configuration for the invenova engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classifier floor: a best-anchor cosine below this is `unknown`.
    pub intent_threshold: f32,
    /// Stricter per-turn gate; classified intents scoring below it are
    /// demoted to `unknown` and routed through the rescue ladder.
    pub intent_gate: f32,
    /// Acceptance threshold for the semantic fallback.
    pub semantic_threshold: f32,
    /// Looser semantic threshold when gathering correction candidates.
    pub correction_threshold: f32,
    /// Ranked results below this fraction of the top score are dropped.
    pub score_cutoff: f32,
    /// Similarity ratio needed to accept a ranked rescue match.
    pub rescue_ratio: f32,
    /// Relaxed ratio when the query and top candidate share their leading
    /// token.
    pub rescue_prefix_ratio: f32,
    /// Result count for the semantic fallback.
    pub semantic_top_k: usize,
    /// Cap on the correction candidate list.
    pub max_correction_candidates: usize,
    /// Auto-create missing items on positive additions.
    pub auto_create_on_add: bool,
    /// Extra alias entries layered over the built-in table.
    pub aliases: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intent_threshold: 0.30,
            intent_gate: 0.55,
            semantic_threshold: 0.45,
            correction_threshold: 0.35,
            score_cutoff: 0.85,
            rescue_ratio: 0.6,
            rescue_prefix_ratio: 0.3,
            semantic_top_k: 5,
            max_correction_candidates: 10,
            auto_create_on_add: true,
            aliases: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Load overrides from a TOML file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| EngineError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn validate(&self) -> Result<(), EngineError> {
        let unit = [
            ("intent_threshold", self.intent_threshold),
            ("intent_gate", self.intent_gate),
            ("semantic_threshold", self.semantic_threshold),
            ("correction_threshold", self.correction_threshold),
            ("score_cutoff", self.score_cutoff),
            ("rescue_ratio", self.rescue_ratio),
            ("rescue_prefix_ratio", self.rescue_prefix_ratio),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig {
                    message: format!("{name} must be within 0.0..=1.0, got {value}"),
                });
            }
        }
        if self.semantic_top_k == 0 {
            return Err(EngineError::InvalidConfig {
                message: "semantic_top_k must be > 0".into(),
            });
        }
        if self.max_correction_candidates == 0 {
            return Err(EngineError::InvalidConfig {
                message: "max_correction_candidates must be > 0".into(),
            });
        }
        Ok(())
    }
}

/// The outcome of one conversational turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// User-facing reply text.
    pub reply: String,
    /// The intent the turn resolved to.
    pub intent: Intent,
    /// The candidates the reply was produced from (before zero-stock
    /// filtering), for callers that want to inspect the resolution.
    pub matches: Vec<MatchCandidate>,
}

impl TurnOutcome {
    fn reply(intent: Intent, text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            intent,
            matches: Vec::new(),
        }
    }
}

/// The invenova query resolution engine.
///
/// Owns the storage, encoder, and correction collaborators plus the
/// startup-built classifier, semantic index, and alias table. Holds no
/// conversational state: that lives in the [`Session`] passed into each
/// turn.
pub struct Engine {
    config: EngineConfig,
    store: Box<dyn InventoryStore>,
    encoder: Box<dyn TextEncoder>,
    corrector: Option<Box<dyn CorrectionModel>>,
    classifier: IntentClassifier,
    semantic: SemanticIndex,
    aliases: AliasTable,
}

impl Engine {
    /// Create a new engine around the given collaborators.
    ///
    /// Builds the intent anchors and semantic index up front. A failing
    /// encoder is fatal for the anchors (the engine cannot classify
    /// without them) but only degrades the semantic index to empty.
    pub fn new(
        config: EngineConfig,
        store: Box<dyn InventoryStore>,
        encoder: Box<dyn TextEncoder>,
        corrector: Option<Box<dyn CorrectionModel>>,
    ) -> InvenovaResult<Self> {
        config.validate()?;

        let mut aliases = AliasTable::default_lab();
        aliases.extend(&config.aliases);

        let classifier = IntentClassifier::build(encoder.as_ref(), config.intent_threshold)?;

        let names = store.all_names();
        let semantic = match SemanticIndex::build(encoder.as_ref(), names) {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(%err, "semantic index unavailable; continuing without");
                SemanticIndex::empty()
            }
        };

        tracing::info!(
            items = semantic.len(),
            aliases = aliases.len(),
            correction = corrector.is_some(),
            "initializing invenova engine"
        );

        Ok(Self {
            config,
            store,
            encoder,
            corrector,
            classifier,
            semantic,
            aliases,
        })
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the storage handle.
    pub fn store(&self) -> &dyn InventoryStore {
        self.store.as_ref()
    }

    /// Get summary information about the engine state.
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            items: self.store.all_names().len(),
            aliases: self.aliases.len(),
            semantic_indexed: self.semantic.len(),
            correction_enabled: self.corrector.is_some(),
        }
    }

    /// Resolve one conversational turn.
    ///
    /// Infallible by design: collaborator faults are logged and degraded,
    /// and the result is always a reply plus an updated session.
    pub fn handle_turn(&self, session: &mut Session, text: &str) -> TurnOutcome {
        let raw = text.trim();
        if raw.is_empty() {
            return TurnOutcome::reply(
                Intent::Unknown,
                "I didn't hear anything. Please try again.",
            );
        }

        // Refinement: a pending clarification filters the parent's result
        // set instead of re-searching the whole inventory.
        let mut forced = None;
        if let Some(pending) = session.pending.clone().filter(|p| p.awaiting_spec) {
            let cleaned = context::clean_followup(raw, &self.aliases);
            let parent_results = search::resolve(
                self.store.as_ref(),
                &pending.parent_item,
                self.config.score_cutoff,
            );
            match context::refine(&pending, &parent_results, &cleaned) {
                Some(refinement) => {
                    tracing::debug!(
                        parent = %pending.parent_item,
                        spec = %cleaned,
                        survivors = refinement.results.len(),
                        "refinement accepted"
                    );
                    session.clear();
                    forced = Some((pending, refinement));
                }
                None => {
                    tracing::debug!(
                        parent = %pending.parent_item,
                        spec = %cleaned,
                        "refinement rejected; context persists"
                    );
                }
            }
        }

        let (mut intent, mut phrase, quantity, pre_results) = match forced {
            Some((pending, refinement)) => (
                pending.intent,
                refinement.merged_item,
                pending.quantity,
                Some(refinement.results),
            ),
            None => {
                let (mut intent, score) =
                    match self.classifier.classify(self.encoder.as_ref(), raw) {
                        Ok(result) => result,
                        Err(err) => {
                            tracing::warn!(%err, "intent classifier unavailable");
                            (Intent::Unknown, 0.0)
                        }
                    };

                let extracted = entity::extract(raw);
                let mut phrase = self
                    .aliases
                    .rewrite(&entity::clean_entity_phrase(&extracted.item));

                // With no item named but a context on hand, the parent is
                // implicitly the subject ("and how many are there?").
                if phrase.is_empty() {
                    if let Some(pending) = &session.pending {
                        phrase = pending.parent_item.clone();
                        tracing::debug!(parent = %phrase, "substituting pending parent item");
                    }
                }

                if score < self.config.intent_gate {
                    intent = Intent::Unknown;
                }
                tracing::debug!(intent = %intent, score, item = %phrase, "turn analyzed");
                (intent, phrase, extracted.quantity, None)
            }
        };

        // Rescue ladder: an unknown intent with a recognizable item is
        // treated as a location lookup rather than rejected.
        if intent == Intent::Unknown && pre_results.is_none() && !phrase.is_empty() {
            intent = self.rescue_intent(&phrase);
        }

        // Correction fallback: low confidence and no usable direct match.
        if intent == Intent::Unknown && pre_results.is_none() {
            if let Some(corrector) = &self.corrector {
                let query = if phrase.is_empty() { raw } else { phrase.as_str() };
                let candidates = self.correction_candidates(query, raw);
                if let Some(corrected) =
                    correction::correct(corrector.as_ref(), raw, &candidates)
                {
                    tracing::debug!(%corrected, "correction model recovered an item");
                    intent = Intent::CheckLocation;
                    phrase = corrected;
                }
            }
        }

        if intent == Intent::Unknown {
            // Context stays as-is so a pending clarification can still be
            // answered on the next attempt.
            return TurnOutcome::reply(
                intent,
                "I didn't catch that. Please mention an item name.",
            );
        }

        match intent {
            Intent::Emergency => {
                session.clear();
                TurnOutcome::reply(intent, "Emergency alert activated! Alerting the authorities.")
            }
            Intent::SaveInfo => {
                let key = format!("note_{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
                self.store.save_note(&key, raw);
                session.clear();
                TurnOutcome::reply(intent, "I have saved that to memory.")
            }
            Intent::CheckStock | Intent::CheckLocation => {
                self.handle_lookup(session, intent, &phrase, raw, quantity, pre_results)
            }
            Intent::UpdateAdd | Intent::UpdateRemove => {
                self.handle_update(session, intent, &phrase, quantity, pre_results)
            }
            Intent::Unknown => unreachable!("unknown intent handled above"),
        }
    }

    /// Tier 1 → tier 2 → semantic fallback.
    fn lookup(&self, phrase: &str) -> Vec<MatchCandidate> {
        let direct = search::resolve(self.store.as_ref(), phrase, self.config.score_cutoff);
        if !direct.is_empty() {
            return direct;
        }

        let matches = match self.semantic.search(
            self.encoder.as_ref(),
            phrase,
            self.config.semantic_top_k,
            self.config.semantic_threshold,
        ) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(%err, "semantic search unavailable");
                return Vec::new();
            }
        };

        let mut seen = BTreeSet::new();
        let mut results = Vec::new();
        for (name, score) in matches {
            if !seen.insert(name.clone()) {
                continue;
            }
            tracing::debug!(%name, score, "semantic fallback candidate");
            results.extend(search::exact_search(self.store.as_ref(), &name));
        }
        results
    }

    /// Unknown-intent rescue: a direct hit, or a close-enough ranked hit,
    /// defaults the turn to a location lookup.
    fn rescue_intent(&self, phrase: &str) -> Intent {
        if !search::exact_search(self.store.as_ref(), phrase).is_empty() {
            tracing::debug!(item = %phrase, "unknown intent but item found; assuming check_location");
            return Intent::CheckLocation;
        }

        let ranked = search::ranked_search(self.store.as_ref(), phrase, self.config.score_cutoff);
        let Some(top) = ranked.first() else {
            return Intent::Unknown;
        };

        let phrase_lower = phrase.to_lowercase();
        let top_lower = top.name.to_lowercase();
        let prefix_match = phrase_lower.split_whitespace().next()
            == top_lower.split_whitespace().next()
            || ranked
                .iter()
                .any(|c| c.name.to_lowercase().starts_with(&phrase_lower));
        let needed = if prefix_match {
            self.config.rescue_prefix_ratio
        } else {
            self.config.rescue_ratio
        };

        let ratio = search::similarity_ratio(&phrase_lower, &top_lower);
        if ratio > needed {
            tracing::debug!(item = %phrase, top = %top.name, ratio, "ranked rescue accepted");
            Intent::CheckLocation
        } else {
            tracing::debug!(item = %phrase, top = %top.name, ratio, needed, "ranked rescue rejected");
            Intent::Unknown
        }
    }

    /// Up to `max_correction_candidates` deduplicated names: ranked hits
    /// first, semantic hits (at the looser threshold) mixed in after.
    fn correction_candidates(&self, query: &str, raw_text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();

        let mut ranked =
            search::ranked_search(self.store.as_ref(), query, self.config.score_cutoff);
        if ranked.is_empty() && query != raw_text {
            tracing::debug!(%query, "no candidates for entity; retrying with raw text");
            ranked = search::ranked_search(self.store.as_ref(), raw_text, self.config.score_cutoff);
        }
        for candidate in ranked.into_iter().take(5) {
            if seen.insert(candidate.name.clone()) {
                candidates.push(candidate.name);
            }
        }

        match self.semantic.search(
            self.encoder.as_ref(),
            query,
            self.config.semantic_top_k,
            self.config.correction_threshold,
        ) {
            Ok(matches) => {
                for (name, _) in matches {
                    if candidates.len() >= self.config.max_correction_candidates {
                        break;
                    }
                    if seen.insert(name.clone()) {
                        candidates.push(name);
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "semantic candidates unavailable"),
        }

        candidates.truncate(self.config.max_correction_candidates);
        candidates
    }

    fn handle_lookup(
        &self,
        session: &mut Session,
        intent: Intent,
        phrase: &str,
        raw: &str,
        quantity: u32,
        pre_results: Option<Vec<MatchCandidate>>,
    ) -> TurnOutcome {
        if phrase.is_empty() {
            return TurnOutcome::reply(intent, "Which item should I check?");
        }

        let results = match pre_results {
            Some(results) => results,
            None => self.lookup(phrase),
        };

        let summary = summary::summarize(intent, phrase, raw, results.clone(), quantity);
        apply_effect(session, summary.effect);
        TurnOutcome {
            reply: summary.reply,
            intent,
            matches: results,
        }
    }

    fn handle_update(
        &self,
        session: &mut Session,
        intent: Intent,
        phrase: &str,
        quantity: u32,
        pre_results: Option<Vec<MatchCandidate>>,
    ) -> TurnOutcome {
        if phrase.is_empty() {
            return TurnOutcome::reply(intent, "Which item would you like to update?");
        }

        let mut results = match pre_results {
            Some(results) => results,
            None => self.lookup(phrase),
        };

        let is_add = intent == Intent::UpdateAdd;
        if !is_add {
            // Zero-stock items cannot be removed from; hiding them keeps
            // the disambiguation list meaningful.
            let found_any = !results.is_empty();
            results.retain(|r| r.quantity > 0);
            if results.is_empty() && found_any {
                return TurnOutcome::reply(
                    intent,
                    format!(
                        "I found items matching {}, but they all have 0 stock, so I can't remove anything.",
                        display_name(phrase)
                    ),
                );
            }
        }

        if results.is_empty() {
            if is_add && self.config.auto_create_on_add {
                self.store.insert(InventoryItem {
                    name: phrase.to_string(),
                    quantity,
                    location: "Unassigned".into(),
                    last_updated: String::new(),
                });
                session.clear();
                tracing::info!(item = %phrase, quantity, "auto-created inventory item");
                return TurnOutcome::reply(
                    intent,
                    format!(
                        "I didn't have {} before, so I added it with quantity {}.",
                        display_name(phrase),
                        quantity
                    ),
                );
            }
            return TurnOutcome::reply(
                intent,
                format!("I couldn't find {} in the inventory.", display_name(phrase)),
            );
        }

        if results.len() == 1 {
            let exact_name = results[0].name.clone();
            let delta = if is_add {
                i64::from(quantity)
            } else {
                -i64::from(quantity)
            };
            return match self.store.update_quantity(&exact_name, delta) {
                Ok(updated) => {
                    session.clear();
                    TurnOutcome {
                        reply: format!(
                            "Updated {}. New quantity is {}.",
                            display_name(&updated.name),
                            updated.quantity
                        ),
                        intent,
                        matches: results,
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "update target vanished between search and update");
                    TurnOutcome::reply(
                        intent,
                        format!(
                            "I couldn't find {} in the inventory.",
                            display_name(&exact_name)
                        ),
                    )
                }
            };
        }

        let summary = summary::update_disambiguation(intent, phrase, &results, quantity);
        apply_effect(session, summary.effect);
        TurnOutcome {
            reply: summary.reply,
            intent,
            matches: results,
        }
    }
}

/// Summary information about the engine state.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub items: usize,
    pub aliases: usize,
    pub semantic_indexed: usize,
    pub correction_enabled: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "invenova engine info")?;
        writeln!(f, "  items:       {}", self.items)?;
        writeln!(f, "  aliases:     {}", self.aliases)?;
        writeln!(f, "  indexed:     {}", self.semantic_indexed)?;
        writeln!(f, "  correction:  {}", self.correction_enabled)?;
        Ok(())
    }
}

fn apply_effect(session: &mut Session, effect: ContextEffect) {
    match effect {
        ContextEffect::Keep => {}
        ContextEffect::Clear => session.clear(),
        ContextEffect::Set(ctx) => session.pending = Some(ctx),
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("semantic", &self.semantic)
            .field("correction", &self.corrector.is_some())
            .finish()
    }
}
