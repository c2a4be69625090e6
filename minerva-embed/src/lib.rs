//! # minerva-embed
//!
//! Text-to-vector encoding for the minerva retrieval pipeline, behind a
//! small [`EmbeddingProvider`] trait so the index never knows which model
//! produced its vectors.
//!
//! Two implementations ship:
//!
//! - [`FastEmbedProvider`] runs a local ONNX sentence-transformer via
//!   fastembed. Loaded models are cached process-wide so repeated provider
//!   construction with the same configuration is cheap.
//! - [`HashedProvider`] is a deterministic bag-of-words fallback with no
//!   model download at all, used by tests and offline runs.
//!
//! Embeddings are half-precision ([`half::f16`]) and L2-normalized, which
//! halves storage in the on-disk cache and lets cosine similarity reduce to
//! a dot product.

pub mod config;
pub mod error;
pub mod hashed;
pub mod provider;

pub use config::EmbedConfig;
pub use error::{EmbedError, Result};
pub use hashed::HashedProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
