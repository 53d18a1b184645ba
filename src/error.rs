//! Rich diagnostic error types for the invenova engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Note that most query-resolution outcomes
//! (no match, rejected refinement, low-confidence intent) are *replies*, not
//! errors — a conversational turn never fails; see [`crate::engine::Engine::handle_turn`].
//! Errors here cover the collaborator boundaries: storage, the semantic encoder,
//! the correction model, and engine configuration.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the invenova engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum InvenovaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Correction(#[from] CorrectionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("inventory item not found: \"{name}\"")]
    #[diagnostic(
        code(invenova::store::item_not_found),
        help(
            "No item with this exact name exists in the inventory. \
             Quantity updates require the canonical item name; \
             resolve the item through a search first."
        )
    )]
    ItemNotFound { name: String },

    #[error("failed to load inventory CSV \"{path}\": {message}")]
    #[diagnostic(
        code(invenova::store::csv_load),
        help(
            "Check that the CSV file exists, is readable, and uses comma-separated \
             columns with a header row."
        )
    )]
    CsvLoad { path: String, message: String },

    #[error("CSV is missing the required column \"{column}\"")]
    #[diagnostic(
        code(invenova::store::csv_column),
        help(
            "The header row must contain the configured item-name column. \
             Use the column-mapping options to point at the right headers."
        )
    )]
    CsvColumn { column: String },
}

// ---------------------------------------------------------------------------
// Encoder errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EncoderError {
    #[error("embedding service is not available at {url}")]
    #[diagnostic(
        code(invenova::encoder::unavailable),
        help(
            "Start Ollama with `ollama serve`, or run without --ollama to use \
             the built-in hashed n-gram encoder."
        )
    )]
    Unavailable { url: String },

    #[error("embedding request failed: {message}")]
    #[diagnostic(
        code(invenova::encoder::request_failed),
        help("Check that the embedding service is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse embedding response: {message}")]
    #[diagnostic(
        code(invenova::encoder::parse_error),
        help("The embedding service returned an unexpected response format.")
    )]
    ParseError { message: String },
}

// ---------------------------------------------------------------------------
// Correction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CorrectionError {
    #[error("correction model is not available at {url}")]
    #[diagnostic(
        code(invenova::correction::unavailable),
        help(
            "Start Ollama with `ollama serve`, or run without --ollama; \
             the engine degrades to search-only resolution."
        )
    )]
    Unavailable { url: String },

    #[error("correction request failed: {message}")]
    #[diagnostic(
        code(invenova::correction::request_failed),
        help("Check that the correction model service is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse correction response: {message}")]
    #[diagnostic(
        code(invenova::correction::parse_error),
        help("The correction model returned an unexpected response format.")
    )]
    ParseError { message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(invenova::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("failed to read config file \"{path}\": {message}")]
    #[diagnostic(
        code(invenova::engine::config_file),
        help("Ensure the file exists and contains valid TOML.")
    )]
    ConfigFile { path: String, message: String },
}

/// Convenience alias for functions returning invenova results.
pub type InvenovaResult<T> = std::result::Result<T, InvenovaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_invenova_error() {
        let err = StoreError::ItemNotFound {
            name: "DC Motor".into(),
        };
        let top: InvenovaError = err.into();
        assert!(matches!(
            top,
            InvenovaError::Store(StoreError::ItemNotFound { .. })
        ));
    }

    #[test]
    fn encoder_error_converts_to_invenova_error() {
        let err = EncoderError::Unavailable {
            url: "http://localhost:11434".into(),
        };
        let top: InvenovaError = err.into();
        assert!(matches!(
            top,
            InvenovaError::Encoder(EncoderError::Unavailable { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = StoreError::ItemNotFound {
            name: "Servo MG996R".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Servo MG996R"));
    }
}
