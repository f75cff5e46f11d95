//! Configuration for the verse finder binaries
//!
//! All settings come from environment variables with defaults that match the
//! corpus artifacts shipped by the builder.

use std::path::PathBuf;

/// Default embedding model. The corpus artifacts and the runtime encoder must
/// agree on this; the manifest check enforces it at startup.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Runtime configuration shared by the API, builder, and CLI binaries
#[derive(Debug, Clone)]
pub struct VerseConfig {
    /// Directory holding the corpus artifacts
    pub data_dir: PathBuf,
    /// Local model directory; when unset the model files are resolved
    /// through the Hugging Face hub cache
    pub model_dir: Option<PathBuf>,
    /// Identifier of the sentence-embedding model
    pub model_id: String,
}

impl VerseConfig {
    /// Load configuration from environment variables
    ///
    /// Expected variables:
    /// - VERSE_DATA_DIR: corpus artifact directory (default: "./data")
    /// - VERSE_MODEL_DIR: local model directory (optional)
    /// - VERSE_MODEL_ID: embedding model identifier
    pub fn from_env() -> Self {
        let data_dir = std::env::var("VERSE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let model_dir = std::env::var("VERSE_MODEL_DIR").ok().map(PathBuf::from);

        let model_id =
            std::env::var("VERSE_MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());

        Self {
            data_dir,
            model_dir,
            model_id,
        }
    }
}
