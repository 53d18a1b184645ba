//! # invenova
//!
//! Query resolution and disambiguation engine for a voice-driven inventory
//! assistant. Turns a noisy transcribed utterance into a resolved inventory
//! action through layered matching and a stateful clarification protocol.
//!
//! ## Architecture
//!
//! - **Tokenizer** (`token`): digit/letter splitting, decimal preservation,
//!   "point"/"cross" spelling variants
//! - **Alias resolver** (`alias`): exact colloquial-to-canonical rewrites
//! - **Candidate search** (`search`): exact AND tier → ranked overlap tier,
//!   strict integer enforcement, critical-token and score-cutoff guards
//! - **Semantic fallback** (`semantic`, `encoder`): cosine top-k over
//!   precomputed item-name vectors, used only when both tiers fail
//! - **Correction adapter** (`correction`): model-assisted recovery with a
//!   fail-closed validation rule chain
//! - **Disambiguation context** (`context`): per-session pending query,
//!   unit-aware refinement of the parent result set
//! - **Summarizer** (`summary`): narrowing questions, variations lists,
//!   direct answers, location-grouped listings
//!
//! ## Library usage
//!
//! ```
//! use invenova::encoder::HashedNgramEncoder;
//! use invenova::engine::{Engine, EngineConfig};
//! use invenova::context::Session;
//! use invenova::store::{InventoryItem, MemoryStore};
//!
//! let store = MemoryStore::with_items(vec![InventoryItem {
//!     name: "Servo Motor MG996R".into(),
//!     quantity: 5,
//!     location: "Shelf A".into(),
//!     last_updated: String::new(),
//! }]);
//! let engine = Engine::new(
//!     EngineConfig::default(),
//!     Box::new(store),
//!     Box::new(HashedNgramEncoder::default()),
//!     None,
//! )
//! .unwrap();
//!
//! let mut session = Session::new();
//! let outcome = engine.handle_turn(&mut session, "Where is the servo motor kept");
//! assert!(outcome.reply.contains("Servo Motor MG996R"));
//! ```

pub mod alias;
pub mod context;
pub mod correction;
pub mod encoder;
pub mod engine;
pub mod entity;
pub mod error;
pub mod intent;
pub mod search;
pub mod semantic;
pub mod store;
pub mod summary;
pub mod token;
