//! Document loading: turn a [`Source`] into retrieval chunks.
//!
//! PDFs yield one chunk per page. URLs are fetched, reduced to readable
//! text, and windowed without overlap. Raw text is windowed with the
//! configured overlap. Load failures are fatal to the caller; there is no
//! retry here.

use crate::error::{IndexError, Result};
use crate::source::Source;
use minerva_context::{ChunkConfig, TextChunk, WindowChunker, chunks_from_units};
use std::path::Path;

/// Loads and chunks sources. One instance is shared by the whole cache;
/// the HTTP client inside pools its connections.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    http: reqwest::Client,
    chunk_config: ChunkConfig,
}

impl DocumentLoader {
    pub fn new(chunk_config: ChunkConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            chunk_config,
        }
    }

    /// Produce the chunk sequence for `source`, labeled with `key`.
    pub async fn load(&self, key: &str, source: &Source) -> Result<Vec<TextChunk>> {
        match source {
            Source::Document(path) => self.load_document(key, path).await,
            Source::Url(url) => self.load_url(key, url).await,
            Source::RawText(text) => {
                Ok(WindowChunker::new(self.chunk_config.clone()).chunk(key, text))
            }
        }
    }

    async fn load_document(&self, key: &str, path: &Path) -> Result<Vec<TextChunk>> {
        tracing::debug!(key, path = %path.display(), "extracting document pages");

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IndexError::source_load(key, format!("{}: {e}", path.display())))?;

        // pdf parsing is CPU-bound and synchronous
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await?
        .map_err(|e| IndexError::source_load(key, e))?;

        Ok(chunks_from_units(key, pages))
    }

    async fn load_url(&self, key: &str, url: &str) -> Result<Vec<TextChunk>> {
        tracing::debug!(key, url, "fetching url");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| IndexError::source_load(key, e))?;
        let html = response
            .text()
            .await
            .map_err(|e| IndexError::source_load(key, e))?;

        let url_owned = url.to_string();
        let text = tokio::task::spawn_blocking(move || extract_readable_text(&html, &url_owned))
            .await?
            .map_err(|e| IndexError::source_load(key, e))?;

        // Fetched pages are windowed without overlap.
        let chunker = WindowChunker::new(self.chunk_config.for_url());
        Ok(chunker.chunk(key, &text))
    }
}

/// Reduce fetched HTML to readable text via readability extraction.
fn extract_readable_text(html: &str, url: &str) -> anyhow::Result<String> {
    let config = dom_smoothie::Config {
        text_mode: dom_smoothie::TextMode::Markdown,
        ..Default::default()
    };
    let mut readability = dom_smoothie::Readability::new(html, Some(url), Some(config))?;
    let article = readability.parse()?;
    Ok(article.text_content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use minerva_context::ChunkConfig;

    #[tokio::test]
    async fn raw_text_is_windowed() {
        let loader = DocumentLoader::new(ChunkConfig::new(50, 10));
        let text: String = (0..20).map(|_| "some words here. ").collect();
        let chunks = loader
            .load("inline", &Source::RawText(text))
            .await
            .unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.source == "inline"));
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 50));
    }

    #[tokio::test]
    async fn empty_raw_text_yields_no_chunks() {
        let loader = DocumentLoader::new(ChunkConfig::default());
        let chunks = loader
            .load("empty", &Source::RawText(String::new()))
            .await
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_a_load_error() {
        let loader = DocumentLoader::new(ChunkConfig::default());
        let result = loader
            .load(
                "missing.pdf",
                &Source::Document("does/not/exist.pdf".into()),
            )
            .await;

        match result {
            Err(IndexError::SourceLoad { key, .. }) => assert_eq!(key, "missing.pdf"),
            other => panic!("expected SourceLoad error, got {other:?}"),
        }
    }
}
