//! The completion-service collaborator.
//!
//! Whether answers arrive token-by-token or as one blob is decided here, at
//! configuration time, and reported through [`CompletionOutput`]; callers
//! never probe the backend for capabilities at call time.

use crate::error::{BotError, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// Configuration for the completion client.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Chat model name on the OpenAI-compatible endpoint.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Whether answers are delivered incrementally. Fixed at configuration
    /// time; when false, `stream` falls back to whole-answer generation.
    pub streaming: bool,
    /// Endpoint base URL; `None` keeps the client default.
    pub api_base: Option<String>,
    /// API key; `None` falls back to the `OPENAI_API_KEY` environment
    /// variable.
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: None,
            streaming: false,
            api_base: None,
            api_key: None,
        }
    }
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// How a generated answer is delivered.
pub enum CompletionOutput {
    /// Incremental token deltas; a mid-stream error terminates the stream.
    TokenStream(Pin<Box<dyn Stream<Item = Result<String>> + Send>>),
    /// The whole answer at once.
    FullText(String),
}

enum Backend {
    OpenAi {
        client: Client<OpenAIConfig>,
        config: CompletionConfig,
    },
    /// Deterministic canned reply, for tests and offline runs.
    Fixed { reply: String },
}

/// Client for the opaque text-completion service.
pub struct CompletionClient {
    backend: Backend,
}

impl CompletionClient {
    /// Client against an OpenAI-compatible chat endpoint.
    pub fn openai(config: CompletionConfig) -> Self {
        let mut openai_config = OpenAIConfig::new();
        if let Some(api_base) = &config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }
        if let Some(api_key) = &config.api_key {
            openai_config = openai_config.with_api_key(api_key);
        }

        Self {
            backend: Backend::OpenAi {
                client: Client::with_config(openai_config),
                config,
            },
        }
    }

    /// Client that always answers with `reply`.
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            backend: Backend::Fixed {
                reply: reply.into(),
            },
        }
    }

    /// Generate the whole answer for a system/user message pair.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match &self.backend {
            Backend::Fixed { reply } => Ok(reply.clone()),
            Backend::OpenAi { client, config } => {
                let request = build_request(config, system, user, false)?;

                tracing::debug!(model = %config.model, "requesting completion");
                let response = client
                    .chat()
                    .create(request)
                    .await
                    .map_err(BotError::completion)?;

                response
                    .choices
                    .into_iter()
                    .find_map(|choice| choice.message.content)
                    .ok_or_else(|| BotError::completion("no content in completion response"))
            }
        }
    }

    /// Generate an answer in the configured delivery mode.
    pub async fn stream(&self, system: &str, user: &str) -> Result<CompletionOutput> {
        match &self.backend {
            Backend::Fixed { reply } => Ok(CompletionOutput::FullText(reply.clone())),
            Backend::OpenAi { config, .. } if !config.streaming => {
                Ok(CompletionOutput::FullText(self.complete(system, user).await?))
            }
            Backend::OpenAi { client, config } => {
                let request = build_request(config, system, user, true)?;

                tracing::debug!(model = %config.model, "opening completion stream");
                let mut upstream = client
                    .chat()
                    .create_stream(request)
                    .await
                    .map_err(BotError::completion)?;

                let tokens = async_stream::stream! {
                    while let Some(item) = upstream.next().await {
                        match item {
                            Ok(response) => {
                                for choice in response.choices {
                                    if let Some(content) = choice.delta.content {
                                        if !content.is_empty() {
                                            yield Ok(content);
                                        }
                                    }
                                }
                            }
                            Err(error) => {
                                yield Err(BotError::completion(error));
                                return;
                            }
                        }
                    }
                };

                Ok(CompletionOutput::TokenStream(Box::pin(tokens)))
            }
        }
    }

    /// True when the configured backend delivers token streams.
    pub fn streams_tokens(&self) -> bool {
        matches!(
            &self.backend,
            Backend::OpenAi { config, .. } if config.streaming
        )
    }
}

fn build_request(
    config: &CompletionConfig,
    system: &str,
    user: &str,
    stream: bool,
) -> Result<CreateChatCompletionRequest> {
    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(config.model.clone())
        .temperature(config.temperature)
        .stream(stream)
        .messages([
            ChatCompletionRequestSystemMessage::from(system.to_string()).into(),
            ChatCompletionRequestUserMessage::from(user.to_string()).into(),
        ]);
    if let Some(max_tokens) = config.max_tokens {
        args.max_tokens(max_tokens);
    }
    args.build().map_err(BotError::completion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_backend_returns_its_reply() {
        let client = CompletionClient::fixed("canned answer");
        let answer = client.complete("system", "user").await.unwrap();
        assert_eq!(answer, "canned answer");
        assert!(!client.streams_tokens());
    }

    #[tokio::test]
    async fn fixed_backend_streams_as_full_text() {
        let client = CompletionClient::fixed("whole thing");
        match client.stream("system", "user").await.unwrap() {
            CompletionOutput::FullText(text) => assert_eq!(text, "whole thing"),
            CompletionOutput::TokenStream(_) => panic!("fixed backend must not token-stream"),
        }
    }

    #[test]
    fn request_builds_with_and_without_max_tokens() {
        let config = CompletionConfig::new("test-model").with_temperature(0.9);
        assert!(build_request(&config, "s", "u", false).is_ok());

        let config = config.with_max_tokens(256);
        let request = build_request(&config, "s", "u", true).unwrap();
        assert_eq!(request.model, "test-model");
    }
}
