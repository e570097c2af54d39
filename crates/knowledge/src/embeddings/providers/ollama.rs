//! Ollama Embedding Provider
//!
//! Provides semantic embeddings via Ollama's local API using models like nomic-embed-text.
//!
//! # Features
//! - Neural semantic embeddings (768-dim for nomic-embed-text)
//! - Local-first (no API costs, privacy-preserving)
//! - Native batch requests via `/api/embed`, split by `batch_size`
//! - Automatic retry with exponential backoff
//!
//! # Example
//! ```no_run
//! use helpdesk_knowledge::embeddings::{EmbeddingConfig, EmbeddingProvider};
//! use helpdesk_knowledge::embeddings::providers::ollama::OllamaProvider;
//!
//! # async fn run() -> helpdesk_core::AppResult<()> {
//! let config = EmbeddingConfig {
//!     provider: "ollama".to_string(),
//!     model: "nomic-embed-text".to_string(),
//!     dimensions: 768,
//!     ..Default::default()
//! };
//!
//! let provider = OllamaProvider::new(&config)?;
//! let embedding = provider.embed("Where is the registrar's office?").await?;
//! assert_eq!(embedding.len(), 768);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use helpdesk_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Ollama API endpoint for embeddings
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBED_ENDPOINT: &str = "/api/embed";

/// Maximum retry attempts for failed requests
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Ollama embedding provider using local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// HTTP client for API requests
    client: Client,
    /// Ollama API base URL
    base_url: String,
    /// Model name (e.g., "nomic-embed-text")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
    /// Maximum inputs per request
    batch_size: usize,
}

/// Request payload for Ollama embed API
#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from Ollama embed API
#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Error response from Ollama API
#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create new Ollama provider with configuration.
    ///
    /// The endpoint comes from the config, then `OLLAMA_URL`, then the
    /// local default. No request is made here.
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for Ollama: {}", e))
            })?;

        let base_url = config
            .endpoint
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Embed one request worth of texts with retry logic
    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;

        loop {
            match self.embed_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(e);
                    }

                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, e
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// Single `/api/embed` round trip (no retries)
    async fn embed_request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        check_response(body.embeddings, texts.len(), self.dimensions)
    }
}

/// Validate count and dimensionality of a provider response.
fn check_response(
    embeddings: Vec<Vec<f32>>,
    expected_count: usize,
    dimensions: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if embeddings.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "Ollama returned {} embeddings for {} inputs",
            embeddings.len(),
            expected_count
        )));
    }

    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions: got {}, expected {}",
            bad.len(),
            dimensions
        )));
    }

    Ok(embeddings)
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    #[instrument(skip(self, text), fields(text_len = text.len(), provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        self.embed_with_retries(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        if let Some(i) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(AppError::Embedding(format!(
                "Cannot embed empty text at index {}",
                i
            )));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for (n, chunk) in texts.chunks(self.batch_size).enumerate() {
            debug!("Embedding request {} with {} texts", n + 1, chunk.len());
            embeddings.extend(self.embed_with_retries(chunk).await?);
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: Some("http://localhost:11434/".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_from_config() {
        let provider = OllamaProvider::new(&create_test_config()).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.dimensions(), 768);
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_request_serialization() {
        let input = vec!["first".to_string(), "second".to_string()];
        let request = EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "nomic-embed-text", "input": ["first", "second"]})
        );
    }

    #[test]
    fn test_check_response_count_mismatch() {
        let result = check_response(vec![vec![0.1, 0.2]], 2, 2);
        assert!(matches!(result, Err(AppError::Embedding(ref m)) if m.contains("1 embeddings for 2")));
    }

    #[test]
    fn test_check_response_dimension_mismatch() {
        let result = check_response(vec![vec![0.1, 0.2], vec![0.3]], 2, 2);
        assert!(matches!(result, Err(AppError::Embedding(ref m)) if m.contains("dimensions")));
    }

    #[test]
    fn test_check_response_ok() {
        let result = check_response(vec![vec![0.1, 0.2], vec![0.3, 0.4]], 2, 2).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_network() {
        let provider = OllamaProvider::new(&create_test_config()).unwrap();

        assert!(provider.embed("   ").await.is_err());
        assert!(provider
            .embed_batch(&["ok".to_string(), String::new()])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_embedding_error() {
        let config = EmbeddingConfig {
            endpoint: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            ..create_test_config()
        };
        let provider = OllamaProvider::new(&config).unwrap();

        let result = provider.embed("Where is the library?").await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_embed_batch_live() {
        // Requires a local Ollama with nomic-embed-text pulled
        if std::env::var("OLLAMA_URL").is_err() {
            println!("Skipping test: OLLAMA_URL not set");
            return;
        }

        let config = EmbeddingConfig {
            endpoint: None,
            batch_size: 2,
            ..create_test_config()
        };
        let provider = OllamaProvider::new(&config).unwrap();

        let texts = vec![
            "First text".to_string(),
            "Second text".to_string(),
            "Third text".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 3);
        for embedding in embeddings {
            assert_eq!(embedding.len(), 768);
            assert!(embedding.iter().any(|&x| x != 0.0));
        }
    }
}
