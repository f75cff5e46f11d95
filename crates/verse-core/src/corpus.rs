//! Corpus store: index-aligned quotes and their precomputed embeddings
//!
//! Three artifacts live in the data directory:
//! - `quote_embeddings.safetensors`: rank-2 f32 tensor, one row per quote
//! - `quotes_list.json`: ordered array of quote strings
//! - `manifest.json`: model id, dimension, and count the artifacts were built with
//!
//! The store is read-only after load. Every alignment invariant is checked at
//! construction time so a broken corpus can never be served.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CorpusError;

pub const EMBEDDINGS_FILE: &str = "quote_embeddings.safetensors";
pub const QUOTES_FILE: &str = "quotes_list.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Name of the tensor inside the safetensors artifact
const EMBEDDINGS_TENSOR: &str = "embeddings";

/// Build metadata persisted alongside the embeddings, making the model
/// coupling between the offline builder and the runtime explicit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub model_id: String,
    pub dimension: usize,
    pub count: usize,
    pub created_at: DateTime<Utc>,
}

/// The static, index-aligned collection of quotes and embeddings
#[derive(Debug, Clone)]
pub struct Corpus {
    quotes: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    dimension: usize,
    model_id: String,
}

impl Corpus {
    /// Build a corpus in memory, validating that quotes and embeddings are
    /// index-aligned and that every row has the same width.
    pub fn new(
        quotes: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        model_id: impl Into<String>,
    ) -> Result<Self, CorpusError> {
        if quotes.len() != embeddings.len() {
            return Err(CorpusError::CountMismatch {
                quotes: quotes.len(),
                rows: embeddings.len(),
            });
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        for (row, vector) in embeddings.iter().enumerate() {
            if vector.len() != dimension {
                return Err(CorpusError::RaggedRow {
                    row,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        Ok(Self {
            quotes,
            embeddings,
            dimension,
            model_id: model_id.into(),
        })
    }

    /// Load the corpus from its persisted artifacts.
    ///
    /// Fails if any artifact is missing or malformed, or if the quote count,
    /// embedding row count, and manifest disagree with each other.
    pub fn load(dir: &Path) -> Result<Self, CorpusError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let quotes_path = dir.join(QUOTES_FILE);
        let embeddings_path = dir.join(EMBEDDINGS_FILE);
        for path in [&manifest_path, &quotes_path, &embeddings_path] {
            if !path.exists() {
                return Err(CorpusError::Missing(path.clone()));
            }
        }

        let manifest_str = fs::read_to_string(&manifest_path).map_err(|source| CorpusError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: CorpusManifest =
            serde_json::from_str(&manifest_str).map_err(|source| CorpusError::Json {
                path: manifest_path.clone(),
                source,
            })?;

        let quotes_str = fs::read_to_string(&quotes_path).map_err(|source| CorpusError::Io {
            path: quotes_path.clone(),
            source,
        })?;
        let quotes: Vec<String> =
            serde_json::from_str(&quotes_str).map_err(|source| CorpusError::Json {
                path: quotes_path.clone(),
                source,
            })?;

        let mut tensors = candle_core::safetensors::load(&embeddings_path, &Device::Cpu)?;
        let tensor = tensors
            .remove(EMBEDDINGS_TENSOR)
            .ok_or(CorpusError::MissingTensor(EMBEDDINGS_TENSOR))?;
        let dims = tensor.dims().to_vec();
        if dims.len() != 2 {
            return Err(CorpusError::BadTensorShape(dims));
        }
        let embeddings = tensor.to_dtype(DType::F32)?.to_vec2::<f32>()?;

        let mut corpus = Self::new(quotes, embeddings, manifest.model_id.clone())?;
        if corpus.is_empty() {
            // No rows to take the width from; trust the manifest.
            corpus.dimension = manifest.dimension;
        }

        if corpus.len() != manifest.count {
            return Err(CorpusError::ManifestCountMismatch {
                manifest: manifest.count,
                actual: corpus.len(),
            });
        }
        if corpus.dimension != manifest.dimension {
            return Err(CorpusError::ManifestDimensionMismatch {
                manifest: manifest.dimension,
                actual: corpus.dimension,
            });
        }

        tracing::info!(
            "Corpus loaded: {} quotes, dimension {}, model `{}`",
            corpus.len(),
            corpus.dimension,
            corpus.model_id
        );
        Ok(corpus)
    }

    /// Write all three artifacts to the data directory
    pub fn save(&self, dir: &Path) -> Result<(), CorpusError> {
        fs::create_dir_all(dir).map_err(|source| CorpusError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let quotes_path = dir.join(QUOTES_FILE);
        let quotes_json = serde_json::to_string(&self.quotes).map_err(|source| CorpusError::Json {
            path: quotes_path.clone(),
            source,
        })?;
        fs::write(&quotes_path, quotes_json).map_err(|source| CorpusError::Io {
            path: quotes_path,
            source,
        })?;

        let flat: Vec<f32> = self.embeddings.iter().flatten().copied().collect();
        let tensor = Tensor::from_vec(flat, (self.len(), self.dimension), &Device::Cpu)?;
        let tensors = HashMap::from([(EMBEDDINGS_TENSOR.to_string(), tensor)]);
        candle_core::safetensors::save(&tensors, dir.join(EMBEDDINGS_FILE))?;

        let manifest = CorpusManifest {
            model_id: self.model_id.clone(),
            dimension: self.dimension,
            count: self.len(),
            created_at: Utc::now(),
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest_json =
            serde_json::to_string_pretty(&manifest).map_err(|source| CorpusError::Json {
                path: manifest_path.clone(),
                source,
            })?;
        fs::write(&manifest_path, manifest_json).map_err(|source| CorpusError::Io {
            path: manifest_path,
            source,
        })?;

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Width of every embedding row
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Identifier of the model the embeddings were built with
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn quote(&self, index: usize) -> Option<&str> {
        self.quotes.get(index).map(String::as_str)
    }

    pub fn quotes(&self) -> &[String] {
        &self.quotes
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_corpus() -> Corpus {
        Corpus::new(
            vec![
                "Be yourself.".to_string(),
                "Carpe diem.".to_string(),
                "Knowledge is power.".to_string(),
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
            "test-model",
        )
        .unwrap()
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let err = Corpus::new(
            vec!["one".to_string()],
            vec![vec![1.0], vec![2.0]],
            "test-model",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CorpusError::CountMismatch { quotes: 1, rows: 2 }
        ));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Corpus::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0]],
            "test-model",
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = sample_corpus();
        corpus.save(dir.path()).unwrap();

        let loaded = Corpus::load(dir.path()).unwrap();
        assert_eq!(loaded.quotes(), corpus.quotes());
        assert_eq!(loaded.embeddings(), corpus.embeddings());
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.model_id(), "test-model");
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(err, CorpusError::Missing(_)));
    }

    #[test]
    fn test_load_rejects_shortened_quotes_file() {
        let dir = tempfile::tempdir().unwrap();
        sample_corpus().save(dir.path()).unwrap();

        // Drop one quote from the list; the row count no longer matches.
        fs::write(
            dir.path().join(QUOTES_FILE),
            r#"["Be yourself.","Carpe diem."]"#,
        )
        .unwrap();

        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::CountMismatch { quotes: 2, rows: 3 }
        ));
    }

    #[test]
    fn test_load_rejects_tampered_manifest_count() {
        let dir = tempfile::tempdir().unwrap();
        sample_corpus().save(dir.path()).unwrap();

        let manifest_path = dir.path().join(MANIFEST_FILE);
        let mut manifest: CorpusManifest =
            serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
        manifest.count = 7;
        fs::write(&manifest_path, serde_json::to_string(&manifest).unwrap()).unwrap();

        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            CorpusError::ManifestCountMismatch {
                manifest: 7,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_load_rejects_malformed_quotes_json() {
        let dir = tempfile::tempdir().unwrap();
        sample_corpus().save(dir.path()).unwrap();

        fs::write(dir.path().join(QUOTES_FILE), "not json").unwrap();
        let err = Corpus::load(dir.path()).unwrap_err();
        assert!(matches!(err, CorpusError::Json { .. }));
    }
}
