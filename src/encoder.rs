//! Semantic encoder seam: text-to-vector embedding with cosine similarity.
//!
//! The engine consumes embeddings through the [`TextEncoder`] trait only.
//! Two implementations ship:
//!
//! - [`HashedNgramEncoder`]: a deterministic, dependency-free local encoder
//!   (hashed character trigrams + word buckets). It captures surface
//!   similarity, which is what the fallback tiers need for misspellings,
//!   and keeps the whole engine usable offline and in tests.
//! - [`OllamaEncoder`]: embeddings from a local Ollama server for real
//!   semantic similarity ("wire" ≈ "cable").

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use crate::error::EncoderError;

/// Embedding provider contract.
///
/// Implementations must be deterministic per input for the lifetime of the
/// process: the semantic index and intent anchors are encoded once at
/// startup and compared against per-turn encodings forever after.
pub trait TextEncoder {
    /// Encode one text into a vector.
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError>;

    /// Encode a batch of texts. The default implementation encodes one at
    /// a time; HTTP-backed encoders may override with a batched request.
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncoderError> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

/// Cosine similarity between two vectors; 0.0 when either has zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

/// Indices and scores of the `k` corpus vectors most similar to `query`,
/// best first, keeping only scores at or above `threshold`.
pub fn top_k(query: &[f32], corpus: &[Vec<f32>], k: usize, threshold: f32) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(i, v)| (i, cosine(query, v)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(k)
        .filter(|(_, score)| *score >= threshold)
        .collect()
}

// ---------------------------------------------------------------------------
// HashedNgramEncoder
// ---------------------------------------------------------------------------

/// Deterministic local encoder: hashed character trigrams plus word buckets.
///
/// The same text always maps to the same vector, so indices built at
/// startup stay comparable for the process lifetime.
#[derive(Debug, Clone)]
pub struct HashedNgramEncoder {
    dim: usize,
}

impl HashedNgramEncoder {
    /// Create an encoder with the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }
}

impl Default for HashedNgramEncoder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TextEncoder for HashedNgramEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        let mut vec = vec![0.0f32; self.dim];
        let normalized = crate::token::normalize(text);
        if normalized.is_empty() {
            return Ok(vec);
        }

        // Character trigrams over the padded text capture surface overlap
        // between misspellings ("sevro" vs "servo").
        let padded: Vec<char> = format!(" {normalized} ").chars().collect();
        for window in padded.windows(3) {
            let gram: String = window.iter().collect();
            let (idx, sign) = self.bucket(&gram);
            vec[idx] += sign;
        }

        // Whole words weigh heavier than any single trigram.
        for word in normalized.split_whitespace() {
            let (idx, sign) = self.bucket(word);
            vec[idx] += sign * 2.0;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vec {
                *x /= norm;
            }
        }
        Ok(vec)
    }
}

// ---------------------------------------------------------------------------
// OllamaEncoder
// ---------------------------------------------------------------------------

/// Configuration for Ollama-backed collaborators.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            timeout_secs: 120,
        }
    }
}

/// Embedding client for the Ollama REST API.
pub struct OllamaEncoder {
    config: OllamaConfig,
}

impl OllamaEncoder {
    /// Create a new encoder client with the given configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    /// Probe the server with a lightweight request.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        matches!(agent.get(&url).call(), Ok(resp) if resp.status() == 200)
    }
}

impl TextEncoder for OllamaEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": text,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| EncoderError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| EncoderError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| EncoderError::ParseError {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| EncoderError::ParseError {
                message: e.to_string(),
            })?;

        json["embedding"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect()
            })
            .ok_or_else(|| EncoderError::ParseError {
                message: "missing 'embedding' field".into(),
            })
    }
}

impl std::fmt::Debug for OllamaEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaEncoder")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let v = vec![1.0, 2.0];
        let z = vec![0.0, 0.0];
        assert_eq!(cosine(&v, &z), 0.0);
    }

    #[test]
    fn hashed_encoder_is_deterministic() {
        let enc = HashedNgramEncoder::default();
        let a = enc.encode("servo motor").unwrap();
        let b = enc.encode("servo motor").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn similar_surface_forms_score_higher() {
        let enc = HashedNgramEncoder::default();
        let servo = enc.encode("servo motor").unwrap();
        let close = enc.encode("servo motors").unwrap();
        let far = enc.encode("oscilloscope probe").unwrap();
        assert!(cosine(&servo, &close) > cosine(&servo, &far));
    }

    #[test]
    fn top_k_orders_and_thresholds() {
        let enc = HashedNgramEncoder::default();
        let query = enc.encode("servo").unwrap();
        let corpus = vec![
            enc.encode("oscilloscope").unwrap(),
            enc.encode("servo").unwrap(),
            enc.encode("servo motor").unwrap(),
        ];
        let hits = top_k(&query, &corpus, 3, 0.9);
        assert_eq!(hits[0].0, 1, "exact text should rank first");
        assert!(hits.iter().all(|(_, s)| *s >= 0.9));
    }

    #[test]
    fn empty_text_encodes_to_zero_vector() {
        let enc = HashedNgramEncoder::default();
        let v = enc.encode("   ").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn ollama_encode_unreachable_returns_error() {
        let enc = OllamaEncoder::new(OllamaConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        });
        assert!(!enc.probe());
        assert!(enc.encode("test").is_err());
    }
}
