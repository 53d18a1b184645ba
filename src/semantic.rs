//! Semantic fallback: vector-similarity search over item names.
//!
//! Used only when the substring and ranked tiers both fail — it bridges
//! vocabulary gaps ("wire" finds "Cable") and heavy mistranscriptions
//! ("sevr" finds "Servo"). The index is built once at startup from the
//! store's name list and is immutable for the process lifetime; rebuilding
//! it belongs to the external encoder collaborator, not this engine.

use crate::encoder::{TextEncoder, top_k};
use crate::error::EncoderError;

/// Immutable item-name index with precomputed vectors.
pub struct SemanticIndex {
    names: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl SemanticIndex {
    /// Encode every item name once.
    pub fn build(encoder: &dyn TextEncoder, names: Vec<String>) -> Result<Self, EncoderError> {
        let vectors = encoder.encode_batch(&names)?;
        tracing::info!(items = names.len(), "semantic index ready");
        Ok(Self { names, vectors })
    }

    /// An index over nothing; every search returns empty.
    pub fn empty() -> Self {
        Self {
            names: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Number of indexed names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the index holds no names.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Top-k names most similar to the query, best first, keeping only
    /// scores at or above `threshold`.
    pub fn search(
        &self,
        encoder: &dyn TextEncoder,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(String, f32)>, EncoderError> {
        if self.names.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = encoder.encode(query)?;
        Ok(top_k(&query_vec, &self.vectors, k, threshold)
            .into_iter()
            .map(|(idx, score)| (self.names[idx].clone(), score))
            .collect())
    }
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("names", &self.names.len())
            .finish()
    }
}
