//! Support bot lifecycle.
//!
//! [`SupportBot`] decides per message whether the knowledge index must be
//! built first and makes sure at most one build runs at a time:
//!
//! - **Absent**: the first caller spawns a build; callers arriving while it
//!   runs clone the same shared handle instead of starting their own.
//! - **Building**: every waiter observes the same outcome. A failed build
//!   drops back to Absent, and the next message starts a fresh attempt.
//! - **Ready**: messages go straight to the published index.
//!
//! The build runs as its own task. A caller that stops waiting (its wait
//! timeout fires, or its request is dropped) does not cancel it; only the
//! build timeout does, and that counts as a dependency failure.

use crate::embeddings::{create_provider, EmbeddingConfig};
use crate::error::{ErrorKind, RetrievalError, RetrievalResult};
use crate::loader::{FileKnowledgeLoader, KnowledgeLoader};
use crate::service::{
    PublishedIndex, RetrievalService, RetrievalSettings, ServiceState, SharedBuild,
};
use crate::types::{Answer, AnswerOutcome, IndexStats, Phase, QueryOutcome};
use helpdesk_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Timeouts and the not-ready reply.
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// How long one caller waits for an in-flight build
    pub wait_timeout: Duration,

    /// Upper bound for loading and embedding the knowledge base
    pub build_timeout: Duration,

    /// Reply while the index is unavailable
    pub starting_message: String,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(30),
            build_timeout: Duration::from_secs(120),
            starting_message: "I'm still starting up. Please try again in a moment.".to_string(),
        }
    }
}

/// Inbound query surface of the support bot. Cheap to clone; clones share
/// one index and one build.
#[derive(Debug, Clone)]
pub struct SupportBot {
    service: Arc<RetrievalService>,
    loader: Arc<dyn KnowledgeLoader>,
    settings: LifecycleSettings,
}

impl SupportBot {
    pub fn new(
        service: Arc<RetrievalService>,
        loader: Arc<dyn KnowledgeLoader>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            service,
            loader,
            settings,
        }
    }

    /// Wire up provider, knowledge base file and settings from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let provider = create_provider(&EmbeddingConfig::from(&config.embedding))?;
        let service = RetrievalService::new(
            provider,
            RetrievalSettings {
                min_score: config.bot.min_score,
                fallback_message: config.bot.fallback_message.clone(),
            },
        );
        let loader = FileKnowledgeLoader::new(config.knowledge_base_path());
        let settings = LifecycleSettings {
            wait_timeout: Duration::from_secs(config.bot.wait_timeout_secs),
            build_timeout: Duration::from_secs(config.bot.build_timeout_secs),
            starting_message: config.bot.starting_message.clone(),
        };

        tracing::debug!(
            "Support bot configured: knowledge base {:?}, provider {}, min score {:?}",
            loader.path(),
            config.embedding.provider,
            config.bot.min_score
        );

        Ok(Self::new(Arc::new(service), Arc::new(loader), settings))
    }

    pub fn service(&self) -> &Arc<RetrievalService> {
        &self.service
    }

    pub fn phase(&self) -> Phase {
        self.service.phase()
    }

    pub fn stats(&self) -> Option<IndexStats> {
        self.service.stats()
    }

    /// Answer one user message.
    ///
    /// Only an empty message is an error. Everything else resolves to a
    /// reply: the matched answer, the fallback message, or the starting-up
    /// message, with failures logged for operators.
    pub async fn answer(&self, message: &str) -> AppResult<Answer> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }

        let result = match self.ensure_ready().await {
            Ok(published) => self.service.lookup_in(&published, message).await,
            Err(e) => Err(e),
        };

        Ok(match result {
            Ok(QueryOutcome::Matched { answer, score }) => Answer {
                response: answer,
                outcome: AnswerOutcome::Matched { score },
            },
            Ok(QueryOutcome::Fallback) => Answer {
                response: self.service.settings().fallback_message.clone(),
                outcome: AnswerOutcome::NoMatch,
            },
            Err(e) => self.degrade(e),
        })
    }

    fn degrade(&self, err: RetrievalError) -> Answer {
        let response = match err.kind() {
            ErrorKind::Readiness => {
                tracing::warn!("Knowledge index unavailable: {}", err);
                self.settings.starting_message.clone()
            }
            ErrorKind::Dependency => {
                tracing::warn!("Support bot dependency failed: {}", err);
                self.service.settings().fallback_message.clone()
            }
            ErrorKind::Input => {
                tracing::error!("Support bot misconfigured: {}", err);
                self.service.settings().fallback_message.clone()
            }
        };

        Answer {
            response,
            outcome: AnswerOutcome::Unavailable,
        }
    }

    /// Return the published index, building it first if needed.
    ///
    /// Concurrent callers share one build. Waiting is bounded by the wait
    /// timeout; the build itself keeps running past it.
    pub async fn ensure_ready(&self) -> RetrievalResult<Arc<PublishedIndex>> {
        let build = {
            let mut state = self.service.lock_state();
            if let Some(published) = &state.published {
                return Ok(Arc::clone(published));
            }
            self.join_or_start(&mut state)
        };

        self.wait(build).await
    }

    /// Start a build in the background without waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn warm_up(&self) -> Phase {
        {
            let mut state = self.service.lock_state();
            if state.published.is_none() {
                let _ = self.join_or_start(&mut state);
            }
        }
        self.service.phase()
    }

    /// Rebuild from the knowledge base while the current index keeps
    /// serving. On failure the current index stays published.
    pub async fn reload(&self) -> RetrievalResult<IndexStats> {
        let build = {
            let mut state = self.service.lock_state();
            self.join_or_start(&mut state)
        };

        let published = self.wait(build).await?;
        Ok(published.stats.clone())
    }

    async fn wait(&self, build: SharedBuild) -> RetrievalResult<Arc<PublishedIndex>> {
        match tokio::time::timeout(self.settings.wait_timeout, build).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout(self.settings.wait_timeout)),
        }
    }

    fn join_or_start(&self, state: &mut ServiceState) -> SharedBuild {
        let loader = Arc::clone(&self.loader);
        let source = async move {
            loader
                .load()
                .await
                .map_err(|e| RetrievalError::KnowledgeBase(e.to_string()))
        };

        self.service
            .join_or_start(state, source, Some(self.settings.build_timeout))
    }
}
