//! Application state for the Verse Finder API

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use verse_core::{Corpus, SentenceEncoder, VerseConfig, VerseService};

/// Shared application state: the service object is built once at startup and
/// held read-only for the process lifetime.
pub struct AppState {
    pub service: VerseService,
}

impl AppState {
    /// Initialize application state from environment configuration
    pub fn new() -> Result<Self> {
        let config = VerseConfig::from_env();

        info!("Loading embedding model `{}`...", config.model_id);
        let encoder = SentenceEncoder::from_config(&config)?;
        info!("Embedding model loaded, dimension: {}", encoder.dimension());

        info!("Loading corpus from {:?}", config.data_dir);
        let corpus = Corpus::load(&config.data_dir)?;

        let service = VerseService::new(Arc::new(encoder), corpus)?;
        Ok(Self { service })
    }
}
