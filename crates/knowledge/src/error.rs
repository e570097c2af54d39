//! Typed errors for the retrieval engine.

use helpdesk_core::AppError;
use std::time::Duration;
use thiserror::Error;

/// Failure modes of index construction, publication and lookup.
///
/// `Clone` so that a single build outcome can be handed to every caller
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("vector at position {position} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },

    #[error("vector index is already populated")]
    AlreadyPopulated,

    #[error("knowledge base has no entries")]
    EmptyKnowledgeBase,

    #[error("vector index has no entries")]
    EmptyIndex,

    #[error("knowledge index is not built yet")]
    NotReady,

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("knowledge base could not be loaded: {0}")]
    KnowledgeBase(String),

    /// One caller gave up waiting; the build may still be running.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("index build timed out after {0:?}")]
    BuildTimeout(Duration),

    #[error("index build aborted: {0}")]
    BuildAborted(String),
}

/// Coarse classification used to pick a caller-visible outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programming or configuration mistakes; surfaced to operators.
    Input,
    /// Provider or loader failures; retried on the next query.
    Dependency,
    /// Index not available yet.
    Readiness,
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::DimensionMismatch { .. }
            | RetrievalError::AlreadyPopulated
            | RetrievalError::EmptyKnowledgeBase => ErrorKind::Input,
            RetrievalError::EmbeddingFailure(_)
            | RetrievalError::KnowledgeBase(_)
            | RetrievalError::BuildTimeout(_)
            | RetrievalError::BuildAborted(_) => ErrorKind::Dependency,
            RetrievalError::NotReady | RetrievalError::EmptyIndex | RetrievalError::Timeout(_) => {
                ErrorKind::Readiness
            }
        }
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::EmbeddingFailure(msg) => AppError::Embedding(msg),
            other => AppError::Knowledge(other.to_string()),
        }
    }
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;
