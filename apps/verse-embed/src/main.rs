//! Offline corpus builder
//!
//! Reads a raw quote collection, embeds every entry with the same model
//! configuration the runtime uses, and writes the corpus artifacts the API
//! loads at startup. The manifest records the model id so a mismatched
//! runtime fails fast instead of serving meaningless scores.
//!
//! Usage: verse-embed [quotes.json]

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;
use verse_core::{Corpus, SentenceEncoder, VerseConfig};

/// One entry of the raw quote collection
#[derive(Debug, Deserialize)]
struct RawQuote {
    text: String,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("verse_embed=info".parse()?)
                .add_directive("verse_core=info".parse()?),
        )
        .init();

    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "quotes.json".to_string());
    let config = VerseConfig::from_env();

    let raw = std::fs::read_to_string(&source)
        .with_context(|| format!("failed to read {}", source))?;
    let entries: Vec<RawQuote> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed quote collection in {}", source))?;
    if entries.is_empty() {
        bail!("{} holds no quotes, nothing to embed", source);
    }
    let quotes: Vec<String> = entries.into_iter().map(|q| q.text).collect();

    info!("Loading embedding model `{}`...", config.model_id);
    let encoder = SentenceEncoder::from_config(&config)?;

    info!("Embedding {} quotes...", quotes.len());
    let texts: Vec<&str> = quotes.iter().map(String::as_str).collect();
    let embeddings = encoder.embed_batch(&texts)?;

    let corpus = Corpus::new(quotes, embeddings, encoder.model_id())?;
    corpus.save(&config.data_dir)?;

    info!(
        "Saved {} quote embeddings to {:?}",
        corpus.len(),
        config.data_dir
    );
    Ok(())
}
