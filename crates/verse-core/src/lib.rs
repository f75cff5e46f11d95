//! Verse Finder core - corpus store, sentence embeddings, and similarity matching
//!
//! This crate provides:
//! - Corpus store: index-aligned quotes and precomputed embeddings with artifact IO
//! - Sentence encoder: local BERT inference with Candle
//! - Matcher: cosine scoring against the corpus with a fixed acceptance threshold
//! - Configuration and error types

pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod matcher;

// Re-export commonly used types
pub use config::{VerseConfig, DEFAULT_MODEL_ID};
pub use corpus::{Corpus, CorpusManifest};
pub use embeddings::{Embedder, SentenceEncoder, EMBEDDING_DIM};
pub use error::{CorpusError, EmbedError, ServiceError};
pub use matcher::{
    best_match, cosine_similarity, Match, VerseService, FALLBACK_MESSAGE, SCORE_THRESHOLD,
};
