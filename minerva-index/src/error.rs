//! Error types for the index cache.

use minerva_embed::EmbedError;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors surfaced by the index cache.
///
/// Storage-layer faults (a broken cache directory) are recovered internally
/// by rebuilding and normally never reach a caller; the variants here are
/// the ones that do: bad input sources, embedding failures, and background
/// builds that died.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The source could not be read, fetched, or parsed.
    #[error("failed to load source {key}: {message}")]
    SourceLoad { key: String, message: String },

    /// The embedding collaborator failed.
    #[error(transparent)]
    Embedding(#[from] EmbedError),

    /// SQLite-level failure while reading or writing a cache directory.
    #[error("index storage error: {source}")]
    Storage {
        #[from]
        source: sqlx::Error,
    },

    /// A persisted index deserialized but failed validation.
    #[error("persisted index is invalid: {message}")]
    Corrupt { message: String },

    /// Filesystem failure outside SQLite.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A spawned task panicked or was cancelled.
    #[error("index task failed: {source}")]
    Task {
        #[from]
        source: tokio::task::JoinError,
    },

    /// A background build completed with an error.
    #[error("background build failed for {key}: {message}")]
    BackgroundBuild { key: String, message: String },

    /// The cache's worker pool has been shut down.
    #[error("index cache is shut down")]
    Shutdown,
}

impl IndexError {
    pub fn source_load(key: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceLoad {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}
