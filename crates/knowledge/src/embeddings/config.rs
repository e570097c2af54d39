//! Embedding configuration types.

use helpdesk_core::config::EmbeddingSection;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            normalize: default_normalize(),
            batch_size: default_batch_size(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl From<&EmbeddingSection> for EmbeddingConfig {
    fn from(section: &EmbeddingSection) -> Self {
        Self {
            provider: section.provider.clone(),
            model: section.model.clone(),
            dimensions: section.dimensions,
            normalize: default_normalize(),
            batch_size: section.batch_size.max(1),
            endpoint: section.endpoint.clone(),
            timeout_secs: section.timeout.unwrap_or_else(default_timeout_secs),
        }
    }
}
