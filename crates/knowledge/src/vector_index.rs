//! In-memory vector index with exhaustive cosine-similarity search.
//!
//! The index is loaded once with [`VectorIndex::insert_all`] and then only
//! read. Search is a linear scan, O(n·d) per query, which is the right
//! trade-off for knowledge bases of a few hundred entries.

use crate::error::{RetrievalError, RetrievalResult};
use std::cmp::Ordering;

/// A stored vector together with the payload returned on a hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEntry<P> {
    pub vector: Vec<f32>,
    pub payload: P,
}

impl<P> VectorEntry<P> {
    pub fn new(vector: Vec<f32>, payload: P) -> Self {
        Self { vector, payload }
    }
}

/// One search result. `position` is the entry's insertion index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a, P> {
    pub position: usize,
    pub payload: &'a P,
    pub score: f32,
}

/// Append-once vector store.
#[derive(Debug, Clone)]
pub struct VectorIndex<P> {
    entries: Vec<VectorEntry<P>>,
    dimensions: usize,
}

impl<P> Default for VectorIndex<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> VectorIndex<P> {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dimensions: 0,
        }
    }

    /// Populate the index from a non-empty batch.
    ///
    /// All vectors must share the first vector's length. The batch is
    /// validated before anything is stored, so a failed call leaves the
    /// index empty.
    pub fn insert_all(&mut self, entries: Vec<VectorEntry<P>>) -> RetrievalResult<()> {
        if !self.entries.is_empty() {
            return Err(RetrievalError::AlreadyPopulated);
        }

        let expected = match entries.first() {
            Some(first) => first.vector.len(),
            None => return Err(RetrievalError::EmptyIndex),
        };

        if let Some((position, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.vector.len() != expected)
        {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                found: entry.vector.len(),
                position,
            });
        }

        self.dimensions = expected;
        self.entries = entries;

        tracing::debug!(
            "Populated vector index with {} entries of dimension {}",
            self.entries.len(),
            self.dimensions
        );

        Ok(())
    }

    /// Top-k entries by cosine similarity, best first.
    ///
    /// Equal scores keep insertion order. Asking for more results than the
    /// index holds returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> RetrievalResult<Vec<SearchHit<'_, P>>> {
        if self.entries.is_empty() {
            return Err(RetrievalError::EmptyIndex);
        }

        if query.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                found: query.len(),
                position: 0,
            });
        }

        let mut hits: Vec<SearchHit<'_, P>> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchHit {
                position,
                payload: &entry.payload,
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        hits.sort_by(|a, b| rank(b.score, a.score).then(a.position.cmp(&b.position)));
        hits.truncate(k);

        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector length shared by all entries (0 while empty).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Descending-score comparison that sinks NaN below every real score.
fn rank(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Calculate cosine similarity between two vectors of equal length.
///
/// Returns 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
