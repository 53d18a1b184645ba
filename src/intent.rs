//! Intent taxonomy and nearest-anchor classification.
//!
//! Each intent carries a set of anchor phrases. Classification encodes the
//! utterance and takes the maximum cosine similarity against every anchor;
//! the best-scoring intent wins, and anything below the confidence
//! threshold degrades to [`Intent::Unknown`] so the engine can route the
//! turn through its correction fallback instead of guessing.

use serde::{Deserialize, Serialize};

use crate::encoder::{TextEncoder, cosine};
use crate::error::EncoderError;

/// Recognized user intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// "How many X do we have" — quantity lookup.
    CheckStock,
    /// "Where is X" — location lookup.
    CheckLocation,
    /// "Add 5 X" — stock increase.
    UpdateAdd,
    /// "Took 2 X" — stock decrease.
    UpdateRemove,
    /// "Fire alarm" — immediate alert, no inventory action.
    Emergency,
    /// "Remember that ..." — persist a user note.
    SaveInfo,
    /// Confidence too low to act.
    Unknown,
}

impl Intent {
    /// Whether this intent mutates stock levels.
    pub fn is_update(self) -> bool {
        matches!(self, Self::UpdateAdd | Self::UpdateRemove)
    }

    /// Whether this intent reads the inventory without mutating it.
    pub fn is_lookup(self) -> bool {
        matches!(self, Self::CheckStock | Self::CheckLocation)
    }

    /// Stable label for logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckStock => "check_stock",
            Self::CheckLocation => "check_location",
            Self::UpdateAdd => "update_stock_add",
            Self::UpdateRemove => "update_stock_remove",
            Self::Emergency => "emergency",
            Self::SaveInfo => "save_info",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The default anchor phrase sets, one entry per classifiable intent.
pub fn default_anchors() -> Vec<(Intent, Vec<&'static str>)> {
    vec![
        (
            Intent::CheckStock,
            vec![
                "Check stock of soldering irons",
                "How many multimeters do we have",
                "What is the quantity of wire spools",
                "Do we have any resistors in stock",
                "List inventory of item",
                "Is the 3.5mm jack available",
                "Is item available",
                "Do we have 13.5 cm wheel",
                "Do we have item",
                "Are all the motor drivers",
                "Are there any connectors",
                "How much units are there",
                "How many items",
                "What is the count",
                "Count of item",
                "Stock level",
            ],
        ),
        (
            Intent::UpdateAdd,
            vec![
                "Add 5 multimeters to inventory",
                "Restock 10 soldering irons",
                "Increase stock of wires by 2",
                "Received 5 new oscilloscopes",
                "Add item",
                "Put 5 items",
                "Placed 2 units",
                "Deposited 10 units",
            ],
        ),
        (
            Intent::UpdateRemove,
            vec![
                "Remove 2 soldering irons",
                "Take out 5 resistors",
                "Decrease stock of multimeter by 1",
                "Used 3 wire spools",
                "Remove item",
                "I have taken 3 units",
                "Took 2 items",
                "Picked up 5 sensors",
                "Grabbed 1 motor",
                "Withdrew 3 units",
                "Reduce 2 units",
                "Reduce stock of battery",
            ],
        ),
        (
            Intent::CheckLocation,
            vec![
                "Where is the multimeter kept",
                "Where can I find soldering irons",
                "Location of resistor pack",
                "Which rack has the wire spool",
                "Find item",
                "Where's the item",
                "Where is the adapter",
                "Where is the device",
                "Where is the 10mm screw",
                "Location of 12V motor",
                "Find 13.5 cm wheel",
                "Where are the 100RPM motors",
            ],
        ),
        (
            Intent::Emergency,
            vec![
                "Help me",
                "Emergency",
                "Fire alarm",
                "Danger",
                "Alert security",
                "Call for help",
                "Critical situation",
                "Accident",
            ],
        ),
        (
            Intent::SaveInfo,
            vec![
                "My name is",
                "Save this information",
                "Remember that",
                "Note that",
                "Keep in mind",
                "My phone number is",
                "Store this",
            ],
        ),
    ]
}

/// Nearest-anchor intent classifier.
///
/// Anchor embeddings are computed once at construction; classification is a
/// linear scan over them, which is plenty for a few dozen anchors.
pub struct IntentClassifier {
    anchors: Vec<(Intent, Vec<Vec<f32>>)>,
    threshold: f32,
}

impl IntentClassifier {
    /// Build the classifier from the default anchor sets.
    pub fn build(encoder: &dyn TextEncoder, threshold: f32) -> Result<Self, EncoderError> {
        Self::with_anchors(encoder, default_anchors(), threshold)
    }

    /// Build the classifier from explicit anchor sets.
    pub fn with_anchors(
        encoder: &dyn TextEncoder,
        anchor_sets: Vec<(Intent, Vec<&str>)>,
        threshold: f32,
    ) -> Result<Self, EncoderError> {
        let mut anchors = Vec::with_capacity(anchor_sets.len());
        for (intent, phrases) in anchor_sets {
            let texts: Vec<String> = phrases.iter().map(|p| p.to_string()).collect();
            let vectors = encoder.encode_batch(&texts)?;
            anchors.push((intent, vectors));
        }
        Ok(Self { anchors, threshold })
    }

    /// Classify an utterance into `(intent, confidence)`.
    ///
    /// Confidence is the best cosine score across all anchors; below the
    /// threshold the intent degrades to [`Intent::Unknown`].
    pub fn classify(
        &self,
        encoder: &dyn TextEncoder,
        text: &str,
    ) -> Result<(Intent, f32), EncoderError> {
        if text.trim().is_empty() {
            return Ok((Intent::Unknown, 0.0));
        }

        let query = encoder.encode(text)?;
        let mut best_intent = Intent::Unknown;
        let mut best_score = -1.0f32;

        for (intent, vectors) in &self.anchors {
            for anchor in vectors {
                let score = cosine(&query, anchor);
                if score > best_score {
                    best_score = score;
                    best_intent = *intent;
                }
            }
        }

        if best_score < self.threshold {
            return Ok((Intent::Unknown, best_score.max(0.0)));
        }
        Ok((best_intent, best_score))
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("intents", &self.anchors.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}
