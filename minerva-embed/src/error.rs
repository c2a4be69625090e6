//! Error types for embedding generation.

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type covering configuration, model loading, and generation
/// failures. Integrates with [`thiserror`] for error chaining; callers that
/// only need a message can rely on `Display`.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The model configuration names an unknown model or invalid settings.
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The model failed while producing embeddings.
    #[error("embedding generation failed: {source}")]
    Generation {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A blocking inference task panicked or was cancelled.
    #[error("embedding task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Errors bubbling up from the underlying model library.
    #[error("embedding backend error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Convenience constructor for configuration validation failures.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Wrap any error raised while generating embeddings.
    pub fn generation<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Generation {
            source: Box::new(source),
        }
    }
}
