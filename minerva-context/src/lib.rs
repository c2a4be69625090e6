//! Text segmentation utilities for the minerva retrieval pipeline.
//!
//! This crate owns every transformation from "one blob of text" to "a
//! sequence of bounded pieces":
//!
//! - [`WindowChunker`] splits raw text into fixed-size sliding windows with
//!   configurable overlap. These windows are the unit of retrieval: they get
//!   embedded and stored in a vector index.
//! - [`chunks_from_units`] wraps pre-segmented documents (one unit per PDF
//!   page or fetched section) into the same [`TextChunk`] shape.
//! - [`chunk_for_stream`] re-chunks a finished answer at sentence boundaries
//!   into pieces that fit a delivery budget, for progressive streaming.
//! - [`clean_text`] normalizes whitespace before any of the above.
//!
//! Chunk ordering is preserved through the `sequence` field, but nothing
//! downstream depends on it: retrieval is similarity-based, not positional.

pub mod stream;
pub mod text;

pub use stream::{StreamChunks, chunk_for_stream, split_sentences};
pub use text::{ChunkConfig, TextChunk, WindowChunker, chunks_from_units, clean_text};
