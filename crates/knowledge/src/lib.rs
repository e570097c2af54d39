//! Support bot knowledge retrieval.
//!
//! Maps a free-text user message to the closest pre-authored question in a
//! knowledge base and returns its answer. Questions are embedded once into
//! an in-memory [`VectorIndex`]; messages are embedded at query time and
//! matched by cosine similarity.
//!
//! ```no_run
//! use helpdesk_core::AppConfig;
//! use helpdesk_knowledge::SupportBot;
//!
//! # async fn run() -> helpdesk_core::AppResult<()> {
//! let bot = SupportBot::from_config(&AppConfig::load()?)?;
//! let answer = bot.answer("How do I reset my password?").await?;
//! println!("{}", answer.response);
//! # Ok(())
//! # }
//! ```

pub mod embeddings;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod service;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use error::{ErrorKind, RetrievalError, RetrievalResult};
pub use lifecycle::{LifecycleSettings, SupportBot};
pub use loader::{FileKnowledgeLoader, KnowledgeLoader, StaticKnowledgeLoader};
pub use service::{PublishedIndex, RetrievalService, RetrievalSettings};
pub use types::{Answer, AnswerOutcome, IndexStats, KnowledgeEntry, Phase, QueryOutcome};
pub use vector_index::{SearchHit, VectorEntry, VectorIndex};
