//! Concrete embedding provider implementations.

pub mod ollama;
pub mod trigram;
