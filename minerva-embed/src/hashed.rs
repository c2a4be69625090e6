//! Deterministic hashed bag-of-words embeddings.
//!
//! Tokens are lowercased alphanumeric runs hashed into a fixed number of
//! buckets; the resulting count vector is L2-normalized. Quality is far
//! below a learned model, but the output is deterministic, needs no model
//! download, and still ranks lexically-overlapping texts above unrelated
//! ones, which is what tests and offline runs need.

use crate::error::Result;
use crate::provider::{EmbeddingProvider, EmbeddingResult, normalize_in_place};
use async_trait::async_trait;
use half::f16;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Dimension used when none is requested.
pub const DEFAULT_DIMENSION: usize = 384;

/// Embedding provider that hashes tokens into buckets.
#[derive(Debug, Clone)]
pub struct HashedProvider {
    dimension: usize,
}

impl Default for HashedProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashedProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokens(text) {
            vector[bucket(&token, self.dimension)] += 1.0;
        }

        let mut converted: Vec<f16> = vector.into_iter().map(f16::from_f32).collect();
        normalize_in_place(&mut converted);
        converted
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}

#[async_trait]
impl EmbeddingProvider for HashedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        Ok(self.embed_one(text))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }
        let embeddings = texts.iter().map(|text| self.embed_one(text)).collect();
        Ok(EmbeddingResult::new(embeddings))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashed"
    }
}
