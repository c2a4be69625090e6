//! minerva-index: the retrieval index cache.
//!
//! This crate maps a *source* (raw text, a PDF path, or a URL) to a
//! ready-to-query vector index while avoiding redundant expensive work:
//!
//! ```text
//! Source → Loader → Chunks → Embeddings → VectorIndex
//!   ↑                                         ↓
//! IndexCache (in-memory map) ←→ SQLite cache dir per source digest
//! ```
//!
//! The [`cache::IndexCache`] is the entry point. On a request it checks its
//! in-memory map, then the on-disk cache directory derived from the source
//! key's blake3 digest, and only then loads, chunks, and embeds the source.
//! Builds can run in the foreground or be handed to a small worker pool,
//! which returns a [`cache::BuildHandle`] the caller can poll or await.
//!
//! Indexes are immutable once built and are never evicted for the life of
//! the process; a corrupted or incompatible cache directory is treated as a
//! miss and rebuilt, never surfaced as an error.

pub mod cache;
pub mod error;
pub mod loader;
pub mod source;
pub mod store;
pub mod vector_index;

pub use cache::{BuildHandle, BuildMode, BuildState, CacheStats, IndexCache, IndexCacheConfig, IndexStatus};
pub use error::{IndexError, Result};
pub use loader::DocumentLoader;
pub use source::{DEFAULT_KEY, Source, key_digest};
pub use vector_index::{IndexMeta, IndexedChunk, ScoredChunk, VectorIndex};
