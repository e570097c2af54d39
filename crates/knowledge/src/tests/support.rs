//! Stub collaborators for the behaviour tests.

use crate::embeddings::EmbeddingProvider;
use crate::lifecycle::{LifecycleSettings, SupportBot};
use crate::loader::KnowledgeLoader;
use crate::service::{RetrievalService, RetrievalSettings};
use crate::types::{KnowledgeEntry, Phase};
use helpdesk_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub const FALLBACK: &str = "Sorry, I can't help with that. Please contact the student helpdesk.";
pub const STARTING: &str = "I'm still starting up.";

pub const PASSWORD_QUESTION: &str = "How do I reset my password?";
pub const PASSWORD_ANSWER: &str = "Use the Forgot Password link on the login page.";

pub fn password_faq() -> Vec<KnowledgeEntry> {
    vec![KnowledgeEntry::new(PASSWORD_QUESTION, PASSWORD_ANSWER)]
}

pub fn campus_faq() -> Vec<KnowledgeEntry> {
    vec![
        KnowledgeEntry::new(PASSWORD_QUESTION, PASSWORD_ANSWER),
        KnowledgeEntry::new(
            "When does the library close?",
            "The library closes at 10 PM on weekdays.",
        ),
        KnowledgeEntry::new(
            "How long is each quiz?",
            "Quizzes run for 30 minutes and submit automatically.",
        ),
    ]
}

/// Embeds every distinct text on its own axis: identical strings get
/// identical vectors, different strings get orthogonal ones.
#[derive(Debug)]
pub struct AxisProvider {
    dimensions: usize,
    axes: Mutex<HashMap<String, usize>>,
    batch_calls: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
    gate: Option<Semaphore>,
}

impl AxisProvider {
    pub fn new() -> Self {
        Self {
            dimensions: 32,
            axes: Mutex::new(HashMap::new()),
            batch_calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
            gate: None,
        }
    }

    /// Batch calls sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Batch calls block until [`release_batches`](Self::release_batches).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release_batches(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_next_batches(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn axis_vector(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut axes = self.axes.lock().unwrap();
        let next = axes.len();
        let axis = *axes.entry(text.to_string()).or_insert(next);
        if axis >= self.dimensions {
            return Err(AppError::Embedding("axis provider ran out of axes".to_string()));
        }

        let mut vector = vec![0.0; self.dimensions];
        vector[axis] = 1.0;
        Ok(vector)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for AxisProvider {
    fn provider_name(&self) -> &str {
        "axis"
    }

    fn model_name(&self) -> &str {
        "axis-test"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| AppError::Embedding(e.to_string()))?
                .forget();
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AppError::Embedding("model server unavailable".to_string()));
        }

        texts.iter().map(|t| self.axis_vector(t)).collect()
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.axis_vector(text)
    }
}

/// In-memory knowledge base that can be swapped between loads.
#[derive(Debug, Default)]
pub struct SwappableLoader {
    entries: Mutex<Vec<KnowledgeEntry>>,
    loads: AtomicUsize,
}

impl SwappableLoader {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, entries: Vec<KnowledgeEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KnowledgeLoader for SwappableLoader {
    async fn load(&self) -> AppResult<Vec<KnowledgeEntry>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().clone())
    }
}

pub fn settings(wait_timeout: Duration, build_timeout: Duration) -> LifecycleSettings {
    LifecycleSettings {
        wait_timeout,
        build_timeout,
        starting_message: STARTING.to_string(),
    }
}

pub fn bot(
    provider: &Arc<AxisProvider>,
    loader: Arc<dyn KnowledgeLoader>,
    settings: LifecycleSettings,
) -> SupportBot {
    let provider: Arc<dyn EmbeddingProvider> = provider.clone();
    let service = RetrievalService::new(
        provider,
        RetrievalSettings {
            min_score: None,
            fallback_message: FALLBACK.to_string(),
        },
    );
    SupportBot::new(Arc::new(service), loader, settings)
}

/// Poll until the bot reports `phase`, failing after two seconds.
pub async fn wait_for_phase(bot: &SupportBot, phase: Phase) {
    for _ in 0..200 {
        if bot.phase() == phase {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("bot never reached {}, stuck at {}", phase, bot.phase());
}
