//! Error types for the bot layer.

use minerva_index::IndexError;

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

/// Errors surfaced to callers of the bot layer.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// The completion service rejected or failed the request. No retry is
    /// attempted.
    #[error("completion request failed: {message}")]
    Completion { message: String },

    /// The bot needs an explicit question and none was given.
    #[error("a question is required for the {bot} bot")]
    MissingQuestion { bot: String },

    /// Index building or retrieval failed underneath.
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl BotError {
    pub fn completion(source: impl ToString) -> Self {
        Self::Completion {
            message: source.to_string(),
        }
    }
}
