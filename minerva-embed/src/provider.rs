//! Embedding provider trait and the fastembed-backed implementation.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use fnv::FnvHasher;
use half::f16;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::{Arc, Mutex, OnceLock};

/// Result of batch embedding generation.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// One embedding vector per input text, in input order.
    pub embeddings: Vec<Vec<f16>>,
    /// Dimension of each vector, inferred from the first one.
    pub dimension: usize,
}

impl EmbeddingResult {
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for services that turn text into fixed-dimension vectors.
///
/// Implementations are opaque to callers: the similarity metric, model
/// architecture, and any batching strategy belong to the provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>>;

    /// Embed a batch of texts, preserving order.
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Short identifier recorded alongside persisted indexes.
    fn provider_name(&self) -> &str;
}

/// Type alias for cached model entries (model, dimension).
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Process-wide cache of loaded models, keyed by configuration hash, so two
/// providers with the same configuration share one ONNX session.
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

fn model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn cache_key(config: &EmbedConfig) -> String {
    let config_json = serde_json::to_string(config).expect("config always serializes");
    let mut hasher = FnvHasher::default();
    hasher.write(config_json.as_bytes());
    format!("{:x}", hasher.finish())
}

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbedError::invalid_config(format!(
            "unsupported embedding model: {other}"
        ))),
    }
}

/// Local ONNX embedding provider backed by fastembed.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load (or reuse from the process-wide cache) the configured model.
    ///
    /// Model initialization is blocking ONNX work and runs under
    /// `spawn_blocking`; the dimension is probed with a throwaway embedding
    /// rather than trusted from metadata.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let key = cache_key(&config);

        let cached = {
            let cache = model_cache().lock().unwrap();
            cache
                .get(&key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };
        if let Some((model, dimension)) = cached {
            tracing::debug!(model = %config.model_name, "reusing cached embedding model");
            return Ok(Self {
                config,
                model,
                dimension,
            });
        }

        let embedding_model = resolve_model(&config.model_name)?;
        let model_name = config.model_name.clone();
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("loading embedding model: {model_name}");

                let init_options =
                    InitOptions::new(embedding_model).with_show_download_progress(false);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                let probe = model
                    .embed(vec!["dimension probe".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = probe.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::info!("embedding model ready, dimension {dimension}");
                Ok((model, dimension))
            })
            .await??;

        let model = Arc::new(Mutex::new(model));
        {
            let mut cache = model_cache().lock().unwrap();
            cache.insert(key, (Arc::clone(&model), dimension));
        }

        Ok(Self {
            config,
            model,
            dimension,
        })
    }

    /// Drop all cached models. Mainly useful to tests.
    pub fn clear_cache() {
        model_cache().lock().unwrap().clear();
    }

    fn convert_to_f16(&self, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
        embeddings
            .into_iter()
            .map(|embedding| {
                let mut converted: Vec<f16> = embedding.into_iter().map(f16::from_f32).collect();
                if self.config.normalize {
                    normalize_in_place(&mut converted);
                }
                converted
            })
            .collect()
    }
}

pub(crate) fn normalize_in_place(embedding: &mut [f16]) {
    let norm: f32 = embedding
        .iter()
        .map(|x| x.to_f32() * x.to_f32())
        .sum::<f32>()
        .sqrt();
    if norm > 0.0 {
        for value in embedding.iter_mut() {
            *value = f16::from_f32(value.to_f32() / norm);
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let result = self.embed_texts(&[text.to_string()]).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("no embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("embedding {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            let batch = batch.to_vec();
            let model = Arc::clone(&self.model);

            let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().unwrap();
                guard
                    .embed(batch, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            all_embeddings.extend(self.convert_to_f16(raw));
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_result_infers_dimension() {
        let embeddings = vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2), f16::from_f32(0.3)],
            vec![f16::from_f32(0.4), f16::from_f32(0.5), f16::from_f32(0.6)],
        ];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
    }

    #[test]
    fn empty_result_has_zero_dimension() {
        let result = EmbeddingResult::new(vec![]);
        assert!(result.is_empty());
        assert_eq!(result.dimension, 0);
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(resolve_model("definitely-not-a-model").is_err());
        assert!(resolve_model("all-MiniLM-L6-v2").is_ok());
    }

    #[test]
    fn cache_key_is_deterministic_per_config() {
        let a = cache_key(&EmbedConfig::default());
        let b = cache_key(&EmbedConfig::default());
        assert_eq!(a, b);

        let c = cache_key(&EmbedConfig::new("bge-small-en-v1.5"));
        assert_ne!(a, c);
    }

    #[test]
    fn normalization_produces_unit_vectors() {
        let mut embedding = vec![f16::from_f32(3.0), f16::from_f32(4.0)];
        normalize_in_place(&mut embedding);

        let norm: f32 = embedding
            .iter()
            .map(|x| x.to_f32() * x.to_f32())
            .sum::<f32>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-2);
    }
}
