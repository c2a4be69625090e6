//! The caller-facing surface: ensure_index / answer / stream.

use crate::completion::{CompletionClient, CompletionOutput};
use crate::error::{BotError, Result};
use crate::format::ResponseFormatter;
use crate::kind::BotKind;
use futures::{Stream, StreamExt};
use minerva_context::chunk_for_stream;
use minerva_index::{BuildMode, IndexCache};
use std::pin::Pin;

/// Stream of answer pieces, terminated by one final empty piece.
pub type ResponseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Tunables for the assistant surface.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Piece budget when re-chunking a whole answer for streaming.
    pub stream_max_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            stream_max_chars: 60,
        }
    }
}

impl AssistantConfig {
    pub fn with_stream_max_chars(mut self, max_chars: usize) -> Self {
        self.stream_max_chars = max_chars.max(1);
        self
    }
}

/// Ties the index cache, the completion service, and the formatter into the
/// contract the outer layers (CLI, dashboard) consume.
pub struct Assistant {
    cache: IndexCache,
    completion: CompletionClient,
    formatter: ResponseFormatter,
    config: AssistantConfig,
}

impl Assistant {
    pub fn new(cache: IndexCache, completion: CompletionClient) -> Self {
        Self::with_config(cache, completion, AssistantConfig::default())
    }

    pub fn with_config(
        cache: IndexCache,
        completion: CompletionClient,
        config: AssistantConfig,
    ) -> Self {
        Self {
            cache,
            completion,
            formatter: ResponseFormatter::new(),
            config,
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Build or reuse the index for `source`; returns a human-readable
    /// status line.
    pub async fn ensure_index(&self, source: &str, background: bool) -> Result<String> {
        let key = self.cache.resolve_key(source);
        let mode = if background {
            BuildMode::Background
        } else {
            BuildMode::Foreground
        };
        let status = self.cache.ensure_index(source, mode).await?;
        Ok(status.describe(&key))
    }

    /// Answer `question` for `bot` against `source`, normalized for the bot.
    ///
    /// Falls back to the bot's default question when none is given; bots
    /// without a default require one.
    pub async fn answer(
        &self,
        bot: BotKind,
        source: &str,
        question: Option<&str>,
    ) -> Result<String> {
        let question = self.resolve_question(bot, question)?;
        let user = self.build_user_prompt(source, &question).await?;

        let raw = self.completion.complete(bot.system_prompt(), &user).await?;
        Ok(self.formatter.normalize(bot, &raw))
    }

    /// Stream the answer as bounded pieces.
    ///
    /// With a token-streaming completion backend the pieces are raw token
    /// deltas; otherwise the whole answer is generated, normalized, and
    /// re-chunked at sentence boundaries. Either way the stream ends with
    /// one empty piece as the end marker.
    pub async fn stream(
        &self,
        bot: BotKind,
        source: &str,
        question: Option<&str>,
    ) -> Result<ResponseStream> {
        let question = self.resolve_question(bot, question)?;
        let user = self.build_user_prompt(source, &question).await?;

        match self.completion.stream(bot.system_prompt(), &user).await? {
            CompletionOutput::TokenStream(tokens) => {
                let stream = async_stream::stream! {
                    let mut tokens = tokens;
                    while let Some(item) = tokens.next().await {
                        match item {
                            Ok(token) => yield token,
                            Err(error) => {
                                tracing::warn!(%error, "token stream failed");
                                yield format!("[error] {error}");
                                break;
                            }
                        }
                    }
                    yield String::new();
                };
                Ok(Box::pin(stream))
            }
            CompletionOutput::FullText(text) => {
                let normalized = self.formatter.normalize(bot, &text);
                let pieces: Vec<String> =
                    chunk_for_stream(&normalized, self.config.stream_max_chars).collect();
                let stream = async_stream::stream! {
                    for piece in pieces {
                        yield piece;
                    }
                    yield String::new();
                };
                Ok(Box::pin(stream))
            }
        }
    }

    fn resolve_question(&self, bot: BotKind, question: Option<&str>) -> Result<String> {
        match question {
            Some(q) if !q.trim().is_empty() => Ok(q.to_string()),
            _ => bot
                .default_question()
                .map(str::to_string)
                .ok_or_else(|| BotError::MissingQuestion {
                    bot: bot.to_string(),
                }),
        }
    }

    /// Retrieve context for the question and assemble the user prompt.
    /// Retrieval triggers a synchronous index build on a cache miss.
    async fn build_user_prompt(&self, source: &str, question: &str) -> Result<String> {
        let hits = self.cache.query(source, question, None).await?;
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        if context.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(format!("Context:\n{context}\n\nQuestion: {question}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_question_is_an_error_for_conference() {
        let assistant = Assistant::new(
            IndexCache::new(
                minerva_index::IndexCacheConfig::new(std::env::temp_dir().join("minerva-kind-test")),
                std::sync::Arc::new(minerva_embed::HashedProvider::new(8)),
            ),
            CompletionClient::fixed("x"),
        );

        let result = assistant.resolve_question(BotKind::Conference, None);
        assert!(matches!(result, Err(BotError::MissingQuestion { .. })));

        let result = assistant.resolve_question(BotKind::Reviewer, Some("  "));
        assert_eq!(
            result.unwrap(),
            "Please provide a structured review of the paper."
        );
    }
}
