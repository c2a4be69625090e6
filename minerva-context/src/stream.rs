//! Sentence-boundary re-chunking for progressive delivery.
//!
//! A finished answer is one large string; callers that stream it to a client
//! want bounded pieces that break between sentences, not mid-word. The
//! splitter here treats `.`, `!` and `?` followed by whitespace as sentence
//! terminators and packs whole sentences greedily into pieces of at most
//! `max_chars` characters.
//!
//! One edge case is deliberate: a single sentence longer than `max_chars` is
//! emitted as-is rather than split further, so the bound holds for every
//! piece except those degenerate ones.

use crate::text::clean_text;
use regex::Regex;
use std::sync::LazyLock;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("static regex"));

/// Split `text` into sentences at terminal punctuation followed by
/// whitespace. The punctuation stays with its sentence; the separating
/// whitespace is dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for mat in SENTENCE_END.find_iter(text) {
        // The terminator is a single ASCII character, so the sentence ends
        // one byte into the match.
        let end = mat.start() + 1;
        sentences.push(&text[last..end]);
        last = mat.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }
    sentences
}

/// Lazily chunk `text` into pieces of at most `max_chars` characters at
/// sentence boundaries.
///
/// The returned iterator is finite and restartable only by calling this
/// function again; it is not resumable mid-stream. Empty input yields
/// exactly one empty piece, so a consumer always observes at least one item.
pub fn chunk_for_stream(text: &str, max_chars: usize) -> StreamChunks {
    let cleaned = clean_text(text);
    let empty = cleaned.is_empty();
    let sentences = if empty {
        Vec::new()
    } else {
        split_sentences(&cleaned)
            .into_iter()
            .map(str::to_string)
            .collect()
    };

    StreamChunks {
        sentences,
        next_sentence: 0,
        max_chars,
        emit_empty: empty,
    }
}

/// Iterator returned by [`chunk_for_stream`].
#[derive(Debug, Clone)]
pub struct StreamChunks {
    sentences: Vec<String>,
    next_sentence: usize,
    max_chars: usize,
    emit_empty: bool,
}

impl Iterator for StreamChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.emit_empty {
            self.emit_empty = false;
            return Some(String::new());
        }
        if self.next_sentence >= self.sentences.len() {
            return None;
        }

        let mut piece = String::new();
        while self.next_sentence < self.sentences.len() {
            let sentence = &self.sentences[self.next_sentence];
            if piece.is_empty() {
                // A sentence always starts a piece, even one that alone
                // exceeds the budget.
                piece.push_str(sentence);
            } else if piece.len() + sentence.len() + 1 <= self.max_chars {
                piece.push(' ');
                piece.push_str(sentence);
            } else {
                break;
            }
            self.next_sentence += 1;
        }

        Some(piece)
    }
}
