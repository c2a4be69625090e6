//! Sliding-window chunking of raw text.
//!
//! Structured documents arrive pre-segmented (one unit per page or section)
//! and pass through [`chunks_from_units`] unchanged. Everything else is raw
//! text and goes through [`WindowChunker`], which cuts fixed-size windows
//! that overlap by a configurable number of characters so that sentences
//! straddling a window boundary still appear whole in at least one chunk.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Default window size in characters for raw-text chunking.
pub const DEFAULT_WINDOW: usize = 1000;

/// Default overlap in characters between consecutive windows.
pub const DEFAULT_OVERLAP: usize = 200;

/// Configuration for splitting raw text into overlapping windows.
///
/// The window size and overlap are deliberately configuration, not call-site
/// constants: callers pick a profile once (e.g. [`ChunkConfig::for_url`]
/// disables overlap for fetched pages) and hand it to whatever does the
/// chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum size of each window in characters.
    pub window: usize,
    /// Number of characters shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkConfig {
    pub fn new(window: usize, overlap: usize) -> Self {
        Self { window, overlap }
    }

    /// Profile for text recovered from a fetched URL: same window, no
    /// overlap.
    pub fn for_url(&self) -> Self {
        Self {
            window: self.window,
            overlap: 0,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Distance between window starts. Overlap is clamped below the window
    /// size so the stride is always at least one character.
    fn stride(&self) -> usize {
        let window = self.window.max(1);
        window - self.overlap.min(window - 1)
    }
}

/// A contiguous span of source text, the unit of retrieval.
///
/// `sequence` records the chunk's position within its source; it is kept for
/// diagnostics and persistence ordering, not for search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Identifier of the source this chunk was cut from.
    pub source: String,
    /// 0-indexed position of this chunk within the source.
    pub sequence: usize,
    /// The text content of this chunk.
    pub text: String,
}

/// Splits raw text into fixed-size overlapping windows.
#[derive(Debug, Clone, Default)]
pub struct WindowChunker {
    config: ChunkConfig,
}

impl WindowChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Cut `text` into windows of at most `config.window` characters, each
    /// starting `stride` characters after the previous one.
    ///
    /// Window arithmetic is in characters, not bytes, so multi-byte content
    /// never splits inside a code point. Empty input produces no chunks; the
    /// final window may be shorter than the configured size.
    pub fn chunk(&self, source: &str, text: &str) -> Vec<TextChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let window = self.config.window.max(1);
        let stride = self.config.stride();

        // Byte offset of every char boundary.
        let bounds: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let char_count = bounds.len();

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + window).min(char_count);
            let byte_start = bounds[start];
            let byte_end = if end == char_count {
                text.len()
            } else {
                bounds[end]
            };

            chunks.push(TextChunk {
                source: source.to_string(),
                sequence: chunks.len(),
                text: text[byte_start..byte_end].to_string(),
            });

            if end == char_count {
                break;
            }
            start += stride;
        }

        chunks
    }
}

/// Wrap pre-segmented document units (pages, fetched sections) as chunks,
/// skipping units that are blank after trimming.
pub fn chunks_from_units<I, S>(source: &str, units: I) -> Vec<TextChunk>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    units
        .into_iter()
        .map(Into::into)
        .filter(|unit| !unit.trim().is_empty())
        .enumerate()
        .map(|(sequence, text)| TextChunk {
            source: source.to_string(),
            sequence,
            text,
        })
        .collect()
}

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));
static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("static regex"));

/// Normalize whitespace: CRLF/CR become LF, runs of three or more newlines
/// collapse to one blank line, runs of spaces and tabs collapse to a single
/// space, and the result is trimmed.
pub fn clean_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = BLANK_RUNS.replace_all(&unified, "\n\n");
    let spaced = SPACE_RUNS.replace_all(&collapsed, " ");
    spaced.trim().to_string()
}
