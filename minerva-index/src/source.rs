//! Source classification.
//!
//! What kind of thing a caller handed us is decided exactly once, here, at
//! the boundary. Everything downstream matches on [`Source`] instead of
//! re-sniffing string suffixes.

use std::path::PathBuf;

/// Sentinel cache key shared by every request that arrives without a
/// source, so all "default" calls land in one cache slot.
pub const DEFAULT_KEY: &str = "__default__";

/// A classified content source.
///
/// Two sources with the same key string are the same content as far as the
/// cache is concerned; no byte-level dedup happens. The key string itself is
/// hashed for the on-disk directory name, not the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Arbitrary text supplied inline.
    RawText(String),
    /// A local document path (currently PDF).
    Document(PathBuf),
    /// A web address to fetch.
    Url(String),
}

impl Source {
    /// Classify an input string. A trimmed lowercase `.pdf` suffix makes a
    /// document, an `http` prefix makes a URL, everything else is raw text.
    pub fn classify(input: &str) -> Self {
        let trimmed = input.trim();
        let lowered = trimmed.to_lowercase();
        if lowered.ends_with(".pdf") {
            Source::Document(PathBuf::from(trimmed))
        } else if lowered.starts_with("http") {
            Source::Url(trimmed.to_string())
        } else {
            Source::RawText(input.to_string())
        }
    }

    /// The identifying string for this source. Raw text identifies itself.
    pub fn key(&self) -> String {
        match self {
            Source::RawText(text) => text.clone(),
            Source::Document(path) => path.to_string_lossy().into_owned(),
            Source::Url(url) => url.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Source::RawText(_) => "text",
            Source::Document(_) => "document",
            Source::Url(_) => "url",
        }
    }
}

/// Hex-encoded blake3 digest of a cache key, used as the cache directory
/// name. Distinct keys collide only with negligible probability.
pub fn key_digest(key: &str) -> String {
    hex::encode(blake3::hash(key.as_bytes()).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_suffix_classifies_as_document() {
        assert_eq!(
            Source::classify("papers/transformer.pdf"),
            Source::Document(PathBuf::from("papers/transformer.pdf"))
        );
        assert_eq!(
            Source::classify("  PAPER.PDF  "),
            Source::Document(PathBuf::from("PAPER.PDF"))
        );
    }

    #[test]
    fn http_prefix_classifies_as_url() {
        assert_eq!(
            Source::classify("https://example.org/profile"),
            Source::Url("https://example.org/profile".to_string())
        );
        assert_eq!(
            Source::classify("http://example.org"),
            Source::Url("http://example.org".to_string())
        );
    }

    #[test]
    fn everything_else_is_raw_text() {
        let source = Source::classify("An abstract about retrieval.");
        assert_eq!(
            source,
            Source::RawText("An abstract about retrieval.".to_string())
        );
        assert_eq!(source.kind_name(), "text");
    }

    #[test]
    fn digest_is_stable_and_distinct() {
        let a = key_digest("one source");
        let b = key_digest("one source");
        let c = key_digest("another source");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
