//! The in-memory vector index: embedded chunks plus cosine search.
//!
//! An index is immutable once built. Similarity search is a linear scan;
//! sources here are single papers or pages with tens to hundreds of chunks.

use half::f16;
use minerva_context::TextChunk;
use serde::{Deserialize, Serialize};

/// Metadata recorded with every index, in memory and on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    /// The source key this index was built for.
    pub key: String,
    /// Name of the embedding provider that produced the vectors.
    pub provider: String,
    /// Embedding dimension.
    pub dimension: usize,
    /// Number of chunks in the index.
    pub chunk_count: usize,
    /// Unix timestamp of the build.
    pub created_at: i64,
}

/// A chunk with its embedding, as stored in the index.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub sequence: usize,
    pub text: String,
    pub embedding: Vec<f16>,
}

/// A search hit: chunk text plus its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub score: f32,
    pub sequence: usize,
    pub text: String,
}

/// Searchable index over the chunks of one source.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    meta: IndexMeta,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new(meta: IndexMeta, chunks: Vec<IndexedChunk>) -> Self {
        Self { meta, chunks }
    }

    /// Assemble an index from freshly chunked text and its embeddings.
    /// Chunks and embeddings are zipped positionally; a length mismatch
    /// truncates to the shorter side.
    pub fn from_parts(
        key: &str,
        provider: &str,
        dimension: usize,
        chunks: Vec<TextChunk>,
        embeddings: Vec<Vec<f16>>,
    ) -> Self {
        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk {
                sequence: chunk.sequence,
                text: chunk.text,
                embedding,
            })
            .collect();

        let meta = IndexMeta {
            key: key.to_string(),
            provider: provider.to_string(),
            dimension,
            chunk_count: indexed.len(),
            created_at: chrono::Utc::now().timestamp(),
        };

        Self::new(meta, indexed)
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Top-`k` chunks by cosine similarity to `query`, highest first.
    pub fn search(&self, query: &[f16], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query, &chunk.embedding),
                sequence: chunk.sequence,
                text: chunk.text.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity between two f16 vectors. Mismatched lengths and zero
/// norms score 0.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();

    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec16(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    fn index_with(embeddings: Vec<Vec<f16>>) -> VectorIndex {
        let chunks = embeddings
            .into_iter()
            .enumerate()
            .map(|(sequence, embedding)| IndexedChunk {
                sequence,
                text: format!("chunk {sequence}"),
                embedding,
            })
            .collect();
        VectorIndex::new(
            IndexMeta {
                key: "test".to_string(),
                provider: "hashed".to_string(),
                dimension: 3,
                chunk_count: 3,
                created_at: 0,
            },
            chunks,
        )
    }

    #[test]
    fn search_ranks_by_similarity() {
        let index = index_with(vec![
            vec16(&[1.0, 0.0, 0.0]),
            vec16(&[0.0, 1.0, 0.0]),
            vec16(&[0.7, 0.7, 0.0]),
        ]);

        let hits = index.search(&vec16(&[1.0, 0.0, 0.0]), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].sequence, 0);
        assert_eq!(hits[1].sequence, 2);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn search_k_larger_than_index_returns_all() {
        let index = index_with(vec![vec16(&[1.0, 0.0, 0.0]), vec16(&[0.0, 1.0, 0.0])]);
        let hits = index.search(&vec16(&[1.0, 1.0, 0.0]), 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        let a = vec16(&[1.0, 0.0]);
        let zero = vec16(&[0.0, 0.0]);
        let short = vec16(&[1.0]);

        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&a, &short), 0.0);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn from_parts_records_meta() {
        let chunks = vec![TextChunk {
            source: "s".to_string(),
            sequence: 0,
            text: "hello".to_string(),
        }];
        let index = VectorIndex::from_parts("s", "hashed", 2, chunks, vec![vec16(&[0.6, 0.8])]);

        assert_eq!(index.meta().key, "s");
        assert_eq!(index.meta().provider, "hashed");
        assert_eq!(index.meta().dimension, 2);
        assert_eq!(index.meta().chunk_count, 1);
        assert_eq!(index.chunk_count(), 1);
    }
}
