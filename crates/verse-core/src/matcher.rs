//! Similarity matching over the quote corpus
//!
//! A query embedding is scored against every corpus row with cosine
//! similarity; the single best entry is returned when it clears the fixed
//! acceptance threshold, otherwise the caller gets the fallback message.

use std::sync::Arc;

use crate::corpus::Corpus;
use crate::embeddings::Embedder;
use crate::error::{EmbedError, ServiceError};

/// Minimum cosine score for a corpus entry to count as a match (strict `>`)
pub const SCORE_THRESHOLD: f32 = 0.4;

/// Returned in place of a quote when nothing clears the threshold
pub const FALLBACK_MESSAGE: &str = "I don't have a good quote for that";

const EPSILON: f32 = 1e-10;

/// Cosine similarity: normalized dot product, bounded to [-1, 1].
/// A zero-magnitude input scores 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator < EPSILON {
        0.0
    } else {
        (dot / denominator).clamp(-1.0, 1.0)
    }
}

/// Outcome of matching one query against the corpus
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    Quote {
        index: usize,
        text: String,
        score: f32,
    },
    NoMatch {
        best_score: f32,
    },
}

impl Match {
    /// The quote text, or the fallback message when nothing matched
    pub fn into_text(self) -> String {
        match self {
            Match::Quote { text, .. } => text,
            Match::NoMatch { .. } => FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Score the query against every corpus entry and pick the winner.
///
/// Ties resolve to the first occurring maximum, so duplicate quotes always
/// report the lowest index. The threshold comparison is strict: a score of
/// exactly [`SCORE_THRESHOLD`] is not a match.
pub fn best_match(corpus: &Corpus, query: &[f32]) -> Match {
    let mut best: Option<(usize, f32)> = None;
    for (index, row) in corpus.embeddings().iter().enumerate() {
        let score = cosine_similarity(query, row);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }

    match best {
        Some((index, score)) if score > SCORE_THRESHOLD => Match::Quote {
            index,
            // The index came from the embeddings walk, and the corpus
            // guarantees quote/embedding alignment.
            text: corpus.quote(index).unwrap_or_default().to_string(),
            score,
        },
        Some((_, score)) => Match::NoMatch { best_score: score },
        None => Match::NoMatch { best_score: 0.0 },
    }
}

/// Immutable service object tying the encoder to the corpus.
///
/// Constructed once at startup and shared read-only across requests; there is
/// no per-request state beyond the transient query embedding.
pub struct VerseService {
    embedder: Arc<dyn Embedder>,
    corpus: Corpus,
}

impl VerseService {
    /// Fails fast when the encoder does not match what the corpus was built
    /// with, either by model identifier or by embedding dimension.
    pub fn new(embedder: Arc<dyn Embedder>, corpus: Corpus) -> Result<Self, ServiceError> {
        if embedder.model_id() != corpus.model_id() {
            return Err(ServiceError::ModelMismatch {
                corpus: corpus.model_id().to_string(),
                encoder: embedder.model_id().to_string(),
            });
        }
        if !corpus.is_empty() && embedder.dimension() != corpus.dimension() {
            return Err(ServiceError::DimensionMismatch {
                corpus: corpus.dimension(),
                encoder: embedder.dimension(),
            });
        }
        Ok(Self { embedder, corpus })
    }

    /// Embed the prompt and return the best corpus match
    pub fn find_quote(&self, prompt: &str) -> Result<Match, EmbedError> {
        let query = self.embedder.embed(prompt)?;
        Ok(best_match(&self.corpus, &query))
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }
}
