//! Interactive quote lookup
//!
//! Reads prompts line by line from stdin and prints the best-matching quote
//! with its similarity score, or the fallback line when nothing clears the
//! threshold. `quit` or EOF exits.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use verse_core::{Corpus, Match, SentenceEncoder, VerseConfig, VerseService, FALLBACK_MESSAGE};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = VerseConfig::from_env();
    let encoder = SentenceEncoder::from_config(&config)?;
    let corpus = Corpus::load(&config.data_dir)?;
    let service = VerseService::new(Arc::new(encoder), corpus)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("Enter a prompt (type quit to quit): ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let prompt = line.trim();
        if prompt == "quit" {
            break;
        }

        match service.find_quote(prompt)? {
            Match::Quote { text, score, .. } => {
                println!("Best matching quote:");
                println!("{}", text);
                println!("Similarity score is {}", score);
            }
            Match::NoMatch { .. } => println!("{}", FALLBACK_MESSAGE),
        }
    }

    Ok(())
}
