//! Knowledge base loading.
//!
//! A knowledge base is a list of question/answer pairs kept in a YAML or
//! JSON file. Loaders are invoked once per index build attempt.

use crate::types::KnowledgeEntry;
use helpdesk_core::{AppError, AppResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of knowledge base entries.
#[async_trait::async_trait]
pub trait KnowledgeLoader: Send + Sync + std::fmt::Debug {
    /// Load and validate the full entry list.
    async fn load(&self) -> AppResult<Vec<KnowledgeEntry>>;
}

/// Accepted file layouts: a bare list or `{ entries: [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KnowledgeFile {
    List(Vec<KnowledgeEntry>),
    Document { entries: Vec<KnowledgeEntry> },
}

impl KnowledgeFile {
    fn into_entries(self) -> Vec<KnowledgeEntry> {
        match self {
            KnowledgeFile::List(entries) | KnowledgeFile::Document { entries } => entries,
        }
    }
}

/// Reads entries from a YAML (`.yaml`, `.yml`) or JSON (`.json`) file.
///
/// The file is re-read on every call, so fixing a broken file is picked
/// up by the next build attempt.
#[derive(Debug, Clone)]
pub struct FileKnowledgeLoader {
    path: PathBuf,
}

impl FileKnowledgeLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl KnowledgeLoader for FileKnowledgeLoader {
    async fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Knowledge(format!(
                "Failed to read knowledge base {:?}: {}",
                self.path, e
            ))
        })?;

        let entries = parse_entries(&self.path, &contents)?;
        validate_entries(&entries)?;

        tracing::debug!(
            "Loaded {} knowledge entries from {:?}",
            entries.len(),
            self.path
        );

        Ok(entries)
    }
}

/// Serves a fixed in-memory list.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeLoader {
    entries: Vec<KnowledgeEntry>,
}

impl StaticKnowledgeLoader {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait::async_trait]
impl KnowledgeLoader for StaticKnowledgeLoader {
    async fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        validate_entries(&self.entries)?;
        Ok(self.entries.clone())
    }
}

fn parse_entries(path: &Path, contents: &str) -> AppResult<Vec<KnowledgeEntry>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let file: KnowledgeFile = match extension.as_deref() {
        Some("json") => serde_json::from_str(contents)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(contents)?,
        other => {
            return Err(AppError::Knowledge(format!(
                "Unsupported knowledge base format {:?} for {:?} (expected .yaml, .yml or .json)",
                other.unwrap_or(""),
                path
            )))
        }
    };

    Ok(file.into_entries())
}

/// Every entry needs a non-blank question and answer.
pub fn validate_entries(entries: &[KnowledgeEntry]) -> AppResult<()> {
    for (position, entry) in entries.iter().enumerate() {
        if entry.question.trim().is_empty() {
            return Err(AppError::Knowledge(format!(
                "Knowledge entry {} has an empty question",
                position
            )));
        }
        if entry.answer.trim().is_empty() {
            return Err(AppError::Knowledge(format!(
                "Knowledge entry {} ('{}') has an empty answer",
                position, entry.question
            )));
        }
    }
    Ok(())
}
