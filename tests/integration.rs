//! End-to-end turn scenarios for the invenova engine.
//!
//! These tests drive full conversations through `Engine::handle_turn`,
//! validating the search tiers, the disambiguation context machine, and
//! the summarizer together. The encoder is a deterministic word-bag stub:
//! cosine similarity reduces to exact word overlap, so every threshold
//! comparison in these scenarios is reproducible.

use std::collections::HashMap;
use std::sync::Mutex;

use invenova::context::Session;
use invenova::encoder::TextEncoder;
use invenova::engine::{Engine, EngineConfig};
use invenova::error::EncoderError;
use invenova::intent::Intent;
use invenova::store::{InventoryItem, MemoryStore};

const DIM: usize = 512;

/// Bag-of-words encoder: each distinct word gets its own dimension, so
/// cosine similarity is exactly normalized word overlap.
struct WordEncoder {
    index: Mutex<HashMap<String, usize>>,
}

impl WordEncoder {
    fn new() -> Self {
        Self {
            index: Mutex::new(HashMap::new()),
        }
    }
}

impl TextEncoder for WordEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        let mut vec = vec![0.0f32; DIM];
        let mut index = self.index.lock().unwrap();
        for word in text.to_lowercase().split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string();
            if word.is_empty() {
                continue;
            }
            let next = index.len();
            let slot = *index.entry(word).or_insert(next);
            vec[slot] += 1.0;
        }
        Ok(vec)
    }
}

fn item(name: &str, quantity: u32, location: &str) -> InventoryItem {
    InventoryItem {
        name: name.into(),
        quantity,
        location: location.into(),
        last_updated: String::new(),
    }
}

fn engine_with(items: Vec<InventoryItem>) -> Engine {
    Engine::new(
        EngineConfig::default(),
        Box::new(MemoryStore::with_items(items)),
        Box::new(WordEncoder::new()),
        None,
    )
    .unwrap()
}

fn adaptor_range(n: u32) -> Vec<InventoryItem> {
    (1..=n)
        .map(|i| item(&format!("Adaptor {i}V 1A"), 2, "Shelf A"))
        .collect()
}

#[test]
fn strict_integer_rejects_wider_rpm() {
    let engine = engine_with(vec![
        item("10 RPM Motor", 3, "Shelf A"),
        item("100 RPM Motor", 7, "Shelf A"),
        item("1000 RPM Motor", 1, "Shelf B"),
    ]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Where are the 100RPM motors");
    assert_eq!(outcome.intent, Intent::CheckLocation);
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].name, "100 RPM Motor");
    assert!(outcome.reply.contains("100 RPM Motor"));
    assert!(!outcome.reply.contains("1000 RPM Motor"));
}

#[test]
fn servo_query_groups_both_servo_items_and_excludes_dc_motor() {
    let engine = engine_with(vec![
        item("Servo MG996R", 5, "Shelf A"),
        item("Standard Servo", 2, "Shelf B"),
        item("DC Motor 12V", 10, "Shelf C"),
    ]);
    let mut session = Session::new();

    // Tier 1 and tier 2 both fail ("motor" appears in neither servo name,
    // so the AND match misses and the ranked floor of 2 filters score-1
    // hits); the semantic fallback bridges to the two servo items.
    let outcome = engine.handle_turn(&mut session, "Where is the servo motor kept");
    assert!(outcome.reply.contains("Shelf A"));
    assert!(outcome.reply.contains("Shelf B"));
    assert!(!outcome.reply.contains("Shelf C"), "DC Motor must be excluded");
    assert!(session.pending.is_none(), "grouped listing clears context");
}

#[test]
fn twelve_matches_ask_for_spec_then_accept_volt_refinement() {
    let engine = engine_with(adaptor_range(12));
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "check stock of adapter");
    assert_eq!(outcome.intent, Intent::CheckStock);
    assert!(outcome.reply.contains("12 matches"));
    assert!(outcome.reply.contains("Variations include"));
    assert!(session.is_awaiting_spec());
    assert_eq!(session.pending.as_ref().unwrap().parent_item, "adaptor");

    let outcome = engine.handle_turn(&mut session, "9 volt");
    assert_eq!(outcome.intent, Intent::CheckStock, "original intent preserved");
    assert!(outcome.reply.contains("Adaptor 9V 1A"));
    // Refinement resolved to a single item: context now remembers it
    // without awaiting a spec.
    assert!(!session.is_awaiting_spec());
    assert_eq!(
        session.pending.as_ref().unwrap().parent_item,
        "Adaptor 9V 1A"
    );
}

#[test]
fn garbage_followup_keeps_context_for_retry() {
    let engine = engine_with(adaptor_range(12));
    let mut session = Session::new();

    engine.handle_turn(&mut session, "check stock of adapter");
    assert!(session.is_awaiting_spec());

    let outcome = engine.handle_turn(&mut session, "crimson zephyr");
    assert!(outcome.reply.contains("didn't catch"));
    assert!(session.is_awaiting_spec(), "rejected refinement persists");
    assert_eq!(session.pending.as_ref().unwrap().parent_item, "adaptor");

    // The same context still accepts a valid spec on the next try.
    let outcome = engine.handle_turn(&mut session, "9 volt");
    assert!(outcome.reply.contains("Adaptor 9V 1A"));
}

#[test]
fn over_twenty_matches_ask_to_narrow() {
    let engine = engine_with(adaptor_range(25));
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "check stock of adapter");
    assert!(outcome.reply.contains("too many"));
    assert!(session.is_awaiting_spec());
}

#[test]
fn force_list_bypasses_summarization() {
    let engine = engine_with(adaptor_range(8));
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "list all adaptors");
    assert!(outcome.reply.contains("located at"));
    assert!(!outcome.reply.contains("Which one"));
    assert!(session.pending.is_none());
}

#[test]
fn single_result_queries_are_idempotent() {
    let engine = engine_with(vec![item("Raspberry Pi 4B", 3, "Cabinet 2")]);

    let mut first_session = Session::new();
    let first = engine.handle_turn(&mut first_session, "Where is the rpi");

    let mut second_session = Session::new();
    let second = engine.handle_turn(&mut second_session, "Where is the rpi");

    assert_eq!(first.reply, second.reply);
    assert_eq!(first_session.pending, second_session.pending);
    assert_eq!(
        first_session.pending.as_ref().unwrap().parent_item,
        "Raspberry Pi 4B"
    );
}

#[test]
fn alias_and_canonical_phrase_resolve_identically() {
    let inventory = vec![item("Raspberry Pi 4B", 3, "Cabinet 2")];
    let engine = engine_with(inventory);

    let mut session = Session::new();
    let via_alias = engine.handle_turn(&mut session, "Where is the rpi");
    let mut session = Session::new();
    let via_canonical = engine.handle_turn(&mut session, "Where is the raspberry pi");

    assert!(via_alias.reply.contains("Raspberry Pi 4B"));
    assert_eq!(via_alias.reply, via_canonical.reply);
}

#[test]
fn resolved_item_carries_into_followup_question() {
    let engine = engine_with(vec![
        item("Servo Motor MG996R", 5, "Shelf A"),
        item("Oscilloscope DSO138", 1, "Shelf C"),
    ]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Where is the servo");
    assert!(outcome.reply.contains("Servo Motor MG996R"));

    // No item named here; the pending parent substitutes in.
    let outcome = engine.handle_turn(&mut session, "How many items");
    assert_eq!(outcome.intent, Intent::CheckStock);
    assert!(outcome.reply.contains('5'));
    assert!(outcome.reply.contains("Servo Motor MG996R"));
}

#[test]
fn update_add_applies_delta() {
    let engine = engine_with(vec![item("Multimeter UT33D", 3, "Shelf B")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Add 5 multimeters to inventory");
    assert_eq!(outcome.intent, Intent::UpdateAdd);
    assert!(outcome.reply.contains("New quantity is 8"));
    assert!(session.pending.is_none());
}

#[test]
fn update_remove_clamps_at_zero() {
    let engine = engine_with(vec![item("Soldering Iron 60W", 1, "Shelf D")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Remove 2 soldering irons");
    assert_eq!(outcome.intent, Intent::UpdateRemove);
    assert!(outcome.reply.contains("New quantity is 0"));
}

#[test]
fn ambiguous_update_disambiguates_then_applies_with_quantity() {
    let engine = engine_with(vec![
        item("Soldering Iron 60W", 4, "Shelf D"),
        item("Soldering Iron 25W", 2, "Shelf D"),
    ]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Remove 2 soldering irons");
    assert!(outcome.reply.contains("Which one did you mean?"));
    assert!(session.is_awaiting_spec());
    assert_eq!(session.pending.as_ref().unwrap().quantity, 2);

    let outcome = engine.handle_turn(&mut session, "60");
    assert!(outcome.reply.contains("New quantity is 2"));
    assert!(session.pending.is_none());
}

#[test]
fn remove_with_only_zero_stock_matches_reports_out_of_stock() {
    let engine = engine_with(vec![item("Soldering Iron 60W", 0, "Shelf D")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Remove 2 soldering irons");
    assert!(outcome.reply.contains("0 stock"));
}

#[test]
fn positive_add_auto_creates_missing_item() {
    let engine = engine_with(vec![item("Oscilloscope DSO138", 1, "Shelf C")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Add 5 multimeters to inventory");
    assert_eq!(outcome.intent, Intent::UpdateAdd);
    assert!(outcome.reply.contains("added"));

    let outcome = engine.handle_turn(&mut session, "How many multimeters do we have");
    assert!(outcome.reply.contains('5'));
    assert!(outcome.reply.contains("Unassigned"));
}

#[test]
fn lookup_hit_with_zero_stock_reads_as_out_of_stock() {
    let engine = engine_with(vec![item("Oscilloscope DSO138", 0, "Shelf C")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Where is the oscilloscope");
    assert!(outcome.reply.contains("out of stock"));
}

#[test]
fn emergency_clears_pending_context() {
    let engine = engine_with(adaptor_range(12));
    let mut session = Session::new();

    engine.handle_turn(&mut session, "check stock of adapter");
    assert!(session.is_awaiting_spec());

    let outcome = engine.handle_turn(&mut session, "Fire alarm");
    assert_eq!(outcome.intent, Intent::Emergency);
    assert!(outcome.reply.contains("Emergency"));
    assert!(session.pending.is_none());
}

#[test]
fn unmatchable_item_reports_no_match() {
    let engine = engine_with(vec![item("Oscilloscope DSO138", 1, "Shelf C")]);
    let mut session = Session::new();

    let outcome = engine.handle_turn(&mut session, "Where is the multimeter kept");
    assert_eq!(outcome.intent, Intent::CheckLocation);
    assert!(outcome.reply.contains("don't know where"));
    assert!(session.pending.is_none(), "failed lookup leaves no context");
}
