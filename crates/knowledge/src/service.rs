//! Knowledge retrieval service.
//!
//! Owns the only live reference to the published [`VectorIndex`] and turns
//! a user message into the answer of the closest stored question.
//!
//! The published index and the in-flight build handle live together behind
//! one mutex. The lock is only held to read or swap those two fields, never
//! across an embedding call, so queries against the current index run in
//! parallel with each other and with a rebuild.
//!
//! Every build, whether started by [`RetrievalService::build`] or by the
//! support bot, runs through the same in-flight slot, so at most one build
//! executes at a time.

use crate::embeddings::EmbeddingProvider;
use crate::error::{RetrievalError, RetrievalResult};
use crate::types::{AnswerPayload, IndexStats, KnowledgeEntry, Phase, QueryOutcome};
use crate::vector_index::{VectorEntry, VectorIndex};
use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub type AnswerIndex = VectorIndex<AnswerPayload>;

/// Handle on a running build, cloneable by every caller that waits on it.
pub(crate) type SharedBuild = Shared<BoxFuture<'static, RetrievalResult<Arc<PublishedIndex>>>>;

/// An index together with the facts about how it was built.
#[derive(Debug)]
pub struct PublishedIndex {
    pub index: AnswerIndex,
    pub stats: IndexStats,
}

/// Fully constructed index that has not been published yet.
#[derive(Debug)]
struct BuiltIndex {
    index: AnswerIndex,
    elapsed: Duration,
}

#[derive(Default)]
pub(crate) struct ServiceState {
    pub(crate) published: Option<Arc<PublishedIndex>>,
    pub(crate) in_flight: Option<SharedBuild>,
    generation: u64,
}

/// Query-time policy.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Minimum cosine score for the best hit to count as a match.
    /// Hits scoring zero or below never match.
    pub min_score: Option<f32>,

    /// Returned when no entry qualifies.
    pub fallback_message: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            min_score: None,
            fallback_message: "Sorry, I don't have an answer for that yet.".to_string(),
        }
    }
}

pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    settings: RetrievalSettings,
    state: Mutex<ServiceState>,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_name())
            .field("settings", &self.settings)
            .field("phase", &self.phase())
            .finish()
    }
}

impl RetrievalService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: RetrievalSettings) -> Self {
        Self {
            provider,
            settings,
            state: Mutex::new(ServiceState::default()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Embed `entries` and publish the resulting index, replacing any
    /// previous one. On failure the published index is left untouched.
    ///
    /// If a build is already running, this waits for that build and
    /// returns its outcome instead of starting a second one.
    pub async fn build(
        self: &Arc<Self>,
        entries: &[KnowledgeEntry],
    ) -> RetrievalResult<IndexStats> {
        let entries = entries.to_vec();
        let build = {
            let mut state = self.lock_state();
            self.join_or_start(&mut state, async move { Ok(entries) }, None)
        };

        let published = build.await?;
        Ok(published.stats.clone())
    }

    /// Join the in-flight build, or start a new one whose entries come from
    /// `source`. The caller holds the state lock, which makes the check and
    /// the registration one step.
    pub(crate) fn join_or_start<S>(
        self: &Arc<Self>,
        state: &mut ServiceState,
        source: S,
        build_timeout: Option<Duration>,
    ) -> SharedBuild
    where
        S: Future<Output = RetrievalResult<Vec<KnowledgeEntry>>> + Send + 'static,
    {
        if let Some(build) = &state.in_flight {
            tracing::debug!("Joining in-flight knowledge index build");
            return build.clone();
        }

        let build = self.spawn_build(source, build_timeout);
        state.in_flight = Some(build.clone());
        build
    }

    /// Spawn the build task. The task always clears the in-flight handle
    /// before resolving, so a later caller can retry.
    fn spawn_build<S>(self: &Arc<Self>, source: S, build_timeout: Option<Duration>) -> SharedBuild
    where
        S: Future<Output = RetrievalResult<Vec<KnowledgeEntry>>> + Send + 'static,
    {
        let service = Arc::clone(self);

        tracing::info!("Starting knowledge index build");

        let handle = tokio::spawn(async move {
            let attempt = AssertUnwindSafe(async {
                let entries = source.await?;
                service.embed_index(&entries).await
            })
            .catch_unwind();

            let outcome = match build_timeout {
                Some(limit) => tokio::time::timeout(limit, attempt)
                    .await
                    .map_err(|_| RetrievalError::BuildTimeout(limit)),
                None => Ok(attempt.await),
            };

            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(RetrievalError::BuildAborted(
                    "index build panicked".to_string(),
                )),
                Err(e) => Err(e),
            };

            service.finish_build(result)
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(RetrievalError::BuildAborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    /// Answer from the published index, or the fallback message.
    pub async fn query(&self, message: &str) -> RetrievalResult<String> {
        Ok(match self.lookup(message).await? {
            QueryOutcome::Matched { answer, .. } => answer,
            QueryOutcome::Fallback => self.settings.fallback_message.clone(),
        })
    }

    /// Like [`query`](Self::query) but reports whether a match was found.
    pub async fn lookup(&self, message: &str) -> RetrievalResult<QueryOutcome> {
        let published = self.current().ok_or(RetrievalError::NotReady)?;
        self.lookup_in(&published, message).await
    }

    /// Search a specific index snapshot. The snapshot stays valid even if a
    /// newer index is published meanwhile.
    pub async fn lookup_in(
        &self,
        published: &PublishedIndex,
        message: &str,
    ) -> RetrievalResult<QueryOutcome> {
        let vector = self
            .provider
            .embed(message)
            .await
            .map_err(|e| RetrievalError::EmbeddingFailure(e.to_string()))?;

        let hits = published.index.search(&vector, 1)?;

        let Some(best) = hits.first() else {
            return Ok(QueryOutcome::Fallback);
        };

        if !self.accepts(best.score) {
            tracing::debug!(
                "Best match #{} scored {:.3}, below threshold; using fallback",
                best.position,
                best.score
            );
            return Ok(QueryOutcome::Fallback);
        }

        tracing::debug!(
            "Matched knowledge entry #{} (score {:.3}, generation {})",
            best.position,
            best.score,
            published.stats.generation
        );

        Ok(QueryOutcome::Matched {
            answer: best.payload.answer.clone(),
            score: best.score,
        })
    }

    fn accepts(&self, score: f32) -> bool {
        score > 0.0 && self.settings.min_score.map_or(true, |min| score >= min)
    }

    /// The currently published index, if any.
    pub fn current(&self) -> Option<Arc<PublishedIndex>> {
        self.lock_state().published.clone()
    }

    pub fn stats(&self) -> Option<IndexStats> {
        self.current().map(|p| p.stats.clone())
    }

    pub fn phase(&self) -> Phase {
        let state = self.lock_state();
        match (state.published.is_some(), state.in_flight.is_some()) {
            (false, false) => Phase::Absent,
            (false, true) => Phase::Building,
            (true, false) => Phase::Ready,
            (true, true) => Phase::Refreshing,
        }
    }

    /// Embed every question in one batch and construct an unpublished index.
    async fn embed_index(
        &self,
        entries: &[KnowledgeEntry],
    ) -> RetrievalResult<BuiltIndex> {
        if entries.is_empty() {
            return Err(RetrievalError::EmptyKnowledgeBase);
        }

        let start = Instant::now();
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();

        tracing::info!(
            "Embedding {} knowledge entries using provider '{}' (model: {})",
            questions.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let vectors = self
            .provider
            .embed_batch(&questions)
            .await
            .map_err(|e| RetrievalError::EmbeddingFailure(e.to_string()))?;

        if vectors.len() != entries.len() {
            return Err(RetrievalError::EmbeddingFailure(format!(
                "provider returned {} vectors for {} questions",
                vectors.len(),
                entries.len()
            )));
        }

        let mut index = VectorIndex::new();
        index.insert_all(
            vectors
                .into_iter()
                .zip(entries)
                .map(|(vector, entry)| {
                    VectorEntry::new(
                        vector,
                        AnswerPayload {
                            answer: entry.answer.clone(),
                        },
                    )
                })
                .collect(),
        )?;

        Ok(BuiltIndex {
            index,
            elapsed: start.elapsed(),
        })
    }

    /// Swap in a freshly built index. Callers holding the previous `Arc`
    /// keep reading it until they drop it.
    fn publish(
        &self,
        state: &mut ServiceState,
        built: BuiltIndex,
    ) -> Arc<PublishedIndex> {
        state.generation += 1;

        let stats = IndexStats {
            entries: built.index.len(),
            dimensions: built.index.dimensions(),
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            generation: state.generation,
            built_at: Utc::now(),
            build_millis: built.elapsed.as_millis() as u64,
        };

        tracing::info!(
            "Published knowledge index generation {}: {} entries, {} dimensions, built in {}ms",
            stats.generation,
            stats.entries,
            stats.dimensions,
            stats.build_millis
        );

        let published = Arc::new(PublishedIndex {
            index: built.index,
            stats,
        });
        state.published = Some(Arc::clone(&published));
        published
    }

    /// Record the outcome of a background build and clear the in-flight
    /// handle in the same critical section.
    fn finish_build(
        &self,
        result: RetrievalResult<BuiltIndex>,
    ) -> RetrievalResult<Arc<PublishedIndex>> {
        let mut state = self.lock_state();
        state.in_flight = None;

        match result {
            Ok(built) => Ok(self.publish(&mut state, built)),
            Err(e) => {
                tracing::warn!(
                    "Knowledge index build failed ({}); serving {}",
                    e,
                    if state.published.is_some() {
                        "previous index"
                    } else {
                        "fallback replies until the next attempt"
                    }
                );
                Err(e)
            }
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ServiceState> {
        // State is only ever swapped whole, so a panic mid-update cannot
        // leave it inconsistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
