//! Configuration for embedding models.

use serde::{Deserialize, Serialize};

/// Model name used when no configuration is supplied. A small
/// sentence-transformer that fastembed bundles support for out of the box.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Configuration for an embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Name of the embedding model to load.
    pub model_name: String,
    /// Maximum number of texts embedded per inference call.
    pub batch_size: usize,
    /// Whether vectors are L2-normalized after generation.
    pub normalize: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            batch_size: 16,
            normalize: true,
        }
    }
}

impl EmbedConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_minilm() {
        let config = EmbedConfig::default();
        assert_eq!(config.model_name, "all-MiniLM-L6-v2");
        assert!(config.normalize);
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = EmbedConfig::new("bge-small-en-v1.5")
            .with_batch_size(0)
            .with_normalize(false);
        assert_eq!(config.model_name, "bge-small-en-v1.5");
        assert_eq!(config.batch_size, 1);
        assert!(!config.normalize);
    }
}
