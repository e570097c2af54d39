//! Embedding providers for the knowledge index.
//!
//! Provides a provider-agnostic embedding capability: an offline trigram
//! embedder for development and an Ollama-backed neural embedder.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
