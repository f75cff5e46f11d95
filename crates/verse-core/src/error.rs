//! Error types for the verse finder core

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or saving the corpus artifacts.
///
/// All of these are startup errors: the corpus is loaded once per process
/// lifetime, and a broken corpus must prevent the service from starting.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("required artifact missing: {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("embeddings file has no `{0}` tensor")]
    MissingTensor(&'static str),

    #[error("embeddings tensor must be a rank-2 array, got shape {0:?}")]
    BadTensorShape(Vec<usize>),

    #[error("quote count {quotes} does not match embedding row count {rows}")]
    CountMismatch { quotes: usize, rows: usize },

    #[error("manifest records {manifest} entries but the artifacts hold {actual}")]
    ManifestCountMismatch { manifest: usize, actual: usize },

    #[error("manifest records dimension {manifest} but the embeddings have {actual} columns")]
    ManifestDimensionMismatch { manifest: usize, actual: usize },

    #[error("embedding row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Failures while loading the embedding model or computing an embedding.
///
/// Model-load failures are fatal at startup; per-request embedding failures
/// surface to the caller as a generic service error.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("model error: {0}")]
    Model(#[from] candle_core::Error),

    #[error("hub fetch failed: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),
}

/// Mismatches between the corpus artifacts and the live encoder.
///
/// The build step and the runtime must use the identical embedding model;
/// cosine similarity between embeddings from different models is meaningless.
/// Both checks run at service construction and fail the process fast.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("corpus was built with model `{corpus}` but the encoder is `{encoder}`")]
    ModelMismatch { corpus: String, encoder: String },

    #[error("corpus embeddings are {corpus}-dimensional but the encoder emits {encoder}")]
    DimensionMismatch { corpus: usize, encoder: usize },
}
