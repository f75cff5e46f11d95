//! Sentence embedding model, run locally with Hugging Face Candle
//!
//! Implements the BERT encoder behind `sentence-transformers/all-MiniLM-L6-v2`
//! with the same pooling the sentence-transformers pipeline applies: mean
//! pooling over non-padding tokens followed by L2 normalization. The corpus
//! artifacts are built with this exact configuration, so the query side must
//! reproduce it bit for bit.

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::ops::softmax_last_dim;
use candle_nn::{embedding, layer_norm, linear, Activation, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::config::VerseConfig;
use crate::error::EmbedError;

/// Embedding dimension of the default all-MiniLM-L6-v2 model
pub const EMBEDDING_DIM: usize = 384;

/// Sequence cap applied before inference, matching the sentence-transformers
/// truncation for this model
const MAX_SEQ_LEN: usize = 256;

/// Anything that can turn text into a fixed-dimension embedding vector.
///
/// The service holds the embedder behind this trait so tests can substitute
/// a stub and the model lifecycle stays explicit.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Width of the vectors `embed` produces
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model, compared against the corpus manifest
    fn model_id(&self) -> &str;
}

/// Model hyperparameters, loaded from the model directory's config.json
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub hidden_act: String,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub layer_norm_eps: f64,
    pub pad_token_id: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        // all-MiniLM-L6-v2 configuration
        Self {
            vocab_size: 30522,
            hidden_size: 384,
            num_hidden_layers: 6,
            num_attention_heads: 12,
            intermediate_size: 1536,
            hidden_act: "gelu".to_string(),
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
        }
    }
}

/// Token, position, and segment embeddings with the shared layer norm
struct EmbeddingLayer {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    layer_norm: LayerNorm,
}

impl EmbeddingLayer {
    fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self, EmbedError> {
        let word = embedding(config.vocab_size, config.hidden_size, vb.pp("word_embeddings"))?;
        let position = embedding(
            config.max_position_embeddings,
            config.hidden_size,
            vb.pp("position_embeddings"),
        )?;
        let token_type = embedding(
            config.type_vocab_size,
            config.hidden_size,
            vb.pp("token_type_embeddings"),
        )?;
        let layer_norm = layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?;

        Ok(Self {
            word,
            position,
            token_type,
            layer_norm,
        })
    }

    /// input_ids: [batch, seq] u32
    fn forward(&self, input_ids: &Tensor) -> Result<Tensor, EmbedError> {
        let (_batch, seq_len) = input_ids.dims2()?;
        let device = input_ids.device();

        let position_ids = Tensor::arange(0u32, seq_len as u32, device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let word = self.word.forward(input_ids)?;
        let position = self.position.forward(&position_ids)?;
        let token_type = self.token_type.forward(&token_type_ids)?;

        let hidden = (word.broadcast_add(&position)? + token_type)?;
        Ok(self.layer_norm.forward(&hidden)?)
    }
}

/// Multi-head self-attention with its output projection and residual norm
struct AttentionBlock {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    layer_norm: LayerNorm,
    num_heads: usize,
    head_dim: usize,
}

impl AttentionBlock {
    fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self, EmbedError> {
        let head_dim = config.hidden_size / config.num_attention_heads;
        let all_heads = config.num_attention_heads * head_dim;

        let query = linear(config.hidden_size, all_heads, vb.pp("attention.self.query"))?;
        let key = linear(config.hidden_size, all_heads, vb.pp("attention.self.key"))?;
        let value = linear(config.hidden_size, all_heads, vb.pp("attention.self.value"))?;
        let output = linear(all_heads, config.hidden_size, vb.pp("attention.output.dense"))?;
        let layer_norm = layer_norm(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("attention.output.LayerNorm"),
        )?;

        Ok(Self {
            query,
            key,
            value,
            output,
            layer_norm,
            num_heads: config.num_attention_heads,
            head_dim,
        })
    }

    /// hidden: [batch, seq, hidden], mask: additive [batch, 1, 1, seq]
    fn forward(&self, hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbedError> {
        let (batch, seq_len, _) = hidden.dims3()?;

        let split = |t: Tensor| -> Result<Tensor, candle_core::Error> {
            t.reshape((batch, seq_len, self.num_heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = split(self.query.forward(hidden)?)?;
        let k = split(self.key.forward(hidden)?)?;
        let v = split(self.value.forward(hidden)?)?;

        let scores = (q.matmul(&k.transpose(2, 3)?.contiguous()?)? / (self.head_dim as f64).sqrt())?;
        let scores = scores.broadcast_add(mask)?;
        let probs = softmax_last_dim(&scores)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, self.num_heads * self.head_dim))?;

        let projected = self.output.forward(&context)?;
        Ok(self.layer_norm.forward(&(projected + hidden)?)?)
    }
}

/// Position-wise feed-forward network with its residual norm
struct FeedForward {
    intermediate: Linear,
    activation: Activation,
    output: Linear,
    layer_norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self, EmbedError> {
        let intermediate = linear(
            config.hidden_size,
            config.intermediate_size,
            vb.pp("intermediate.dense"),
        )?;
        let activation = match config.hidden_act.as_str() {
            "relu" => Activation::Relu,
            _ => Activation::Gelu,
        };
        let output = linear(config.intermediate_size, config.hidden_size, vb.pp("output.dense"))?;
        let layer_norm = layer_norm(
            config.hidden_size,
            config.layer_norm_eps,
            vb.pp("output.LayerNorm"),
        )?;

        Ok(Self {
            intermediate,
            activation,
            output,
            layer_norm,
        })
    }

    fn forward(&self, hidden: &Tensor) -> Result<Tensor, EmbedError> {
        let inner = self.activation.forward(&self.intermediate.forward(hidden)?)?;
        let projected = self.output.forward(&inner)?;
        Ok(self.layer_norm.forward(&(projected + hidden)?)?)
    }
}

/// One transformer encoder layer
struct EncoderLayer {
    attention: AttentionBlock,
    feed_forward: FeedForward,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self, EmbedError> {
        Ok(Self {
            attention: AttentionBlock::load(vb.clone(), config)?,
            feed_forward: FeedForward::load(vb, config)?,
        })
    }

    fn forward(&self, hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbedError> {
        let hidden = self.attention.forward(hidden, mask)?;
        self.feed_forward.forward(&hidden)
    }
}

/// Sentence encoder: tokenizer + BERT encoder stack + pooling
pub struct SentenceEncoder {
    tokenizer: Tokenizer,
    embeddings: EmbeddingLayer,
    layers: Vec<EncoderLayer>,
    device: Device,
    hidden_size: usize,
    model_id: String,
}

impl SentenceEncoder {
    /// Load the encoder from a local model directory containing
    /// `config.json`, `tokenizer.json`, and `model.safetensors`.
    pub fn load(model_dir: &Path, model_id: &str) -> Result<Self, EmbedError> {
        Self::from_files(
            &model_dir.join("config.json"),
            &model_dir.join("tokenizer.json"),
            &model_dir.join("model.safetensors"),
            model_id,
        )
    }

    /// Resolve the model files through the Hugging Face hub cache
    pub fn fetch(model_id: &str) -> Result<Self, EmbedError> {
        tracing::info!("Resolving model `{}` through the hub cache", model_id);

        let api = hf_hub::api::sync::Api::new()?;
        let repo = api.model(model_id.to_string());

        let config = repo.get("config.json")?;
        let tokenizer = repo.get("tokenizer.json")?;
        let weights = repo.get("model.safetensors")?;

        Self::from_files(&config, &tokenizer, &weights, model_id)
    }

    /// Local model directory when configured, hub cache otherwise
    pub fn from_config(config: &VerseConfig) -> Result<Self, EmbedError> {
        match &config.model_dir {
            Some(dir) => Self::load(dir, &config.model_id),
            None => Self::fetch(&config.model_id),
        }
    }

    fn from_files(
        config_path: &Path,
        tokenizer_path: &Path,
        weights_path: &Path,
        model_id: &str,
    ) -> Result<Self, EmbedError> {
        let device = pick_device()?;
        tracing::info!("Loading embedding model on device: {:?}", device);

        let config_str =
            std::fs::read_to_string(config_path).map_err(|source| EmbedError::Io {
                path: config_path.to_path_buf(),
                source,
            })?;
        let config: ModelConfig =
            serde_json::from_str(&config_str).map_err(|source| EmbedError::Config {
                path: config_path.to_path_buf(),
                source,
            })?;

        tracing::info!(
            "Model config: {} layers, hidden size {}, {} heads",
            config.num_hidden_layers,
            config.hidden_size,
            config.num_attention_heads
        );

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.to_path_buf()], DType::F32, &device)?
        };

        let embeddings = EmbeddingLayer::load(vb.pp("embeddings"), &config)?;
        let vb_layers = vb.pp("encoder").pp("layer");
        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for i in 0..config.num_hidden_layers {
            layers.push(EncoderLayer::load(vb_layers.pp(i), &config)?);
        }

        Ok(Self {
            tokenizer,
            embeddings,
            layers,
            device,
            hidden_size: config.hidden_size,
            model_id: model_id.to_string(),
        })
    }

    /// Embed a single text into a unit-length vector
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();
        let mut mask: Vec<u32> = encoding.get_attention_mask().to_vec();
        ids.truncate(MAX_SEQ_LEN);
        mask.truncate(MAX_SEQ_LEN);

        let input_ids = Tensor::new(&ids[..], &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(&mask[..], &self.device)?.unsqueeze(0)?;

        let mut hidden = self.embeddings.forward(&input_ids)?;
        let additive = additive_mask(&attention_mask)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, &additive)?;
        }

        let pooled = mean_pool(&hidden, &attention_mask)?;
        let normalized = l2_normalize(&pooled)?;
        Ok(normalized.to_vec1::<f32>()?)
    }

    /// Embed several texts, preserving order
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl Embedder for SentenceEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        SentenceEncoder::embed(self, text)
    }

    fn dimension(&self) -> usize {
        self.hidden_size
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn pick_device() -> Result<Device, EmbedError> {
    let device = if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)?
    } else if candle_core::utils::metal_is_available() {
        Device::new_metal(0)?
    } else {
        Device::Cpu
    };
    Ok(device)
}

/// Turn a 0/1 attention mask [batch, seq] into the additive form the
/// attention scores expect: 0 where attended, -10000 where masked,
/// broadcastable as [batch, 1, 1, seq].
fn additive_mask(attention_mask: &Tensor) -> Result<Tensor, EmbedError> {
    let (batch, seq_len) = attention_mask.dims2()?;
    let mask = attention_mask
        .to_dtype(DType::F32)?
        .reshape((batch, 1, 1, seq_len))?;
    Ok(mask.affine(10_000.0, -10_000.0)?)
}

/// Mean of the token vectors weighted by the attention mask.
/// hidden: [batch, seq, hidden], mask: [batch, seq]; returns [hidden].
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbedError> {
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?;
    Ok(summed.broadcast_div(&counts)?.squeeze(0)?)
}

fn l2_normalize(vector: &Tensor) -> Result<Tensor, EmbedError> {
    let norm = vector.sqr()?.sum_all()?.sqrt()?;
    let norm = (norm + 1e-12)?;
    Ok(vector.broadcast_div(&norm)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_minilm() {
        let config = ModelConfig::default();
        assert_eq!(config.hidden_size, EMBEDDING_DIM);
        assert_eq!(config.num_hidden_layers, 6);
        assert_eq!(config.hidden_size % config.num_attention_heads, 0);
    }

    #[test]
    fn test_l2_normalize_produces_unit_vector() {
        let v = Tensor::new(&[3.0f32, 4.0], &Device::Cpu).unwrap();
        let n = l2_normalize(&v).unwrap().to_vec1::<f32>().unwrap();
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_additive_mask_values() {
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let additive = additive_mask(&mask).unwrap();
        let values = additive.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 0.0, -10_000.0]);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // Two real tokens [1, 3] and [3, 5], one padded row that must not count
        let hidden = Tensor::new(&[[[1.0f32, 3.0], [3.0, 5.0], [100.0, 100.0]]], &Device::Cpu)
            .unwrap();
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu).unwrap();
        let pooled = mean_pool(&hidden, &mask).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(pooled, vec![2.0, 4.0]);
    }
}
