//! crates/movie_quiz_core/src/quiz.rs
//!
//! Orchestrates the two-phase quiz: start (pick a movie, generate a question,
//! open a session) and finish (consume the session, grade the guess).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{
    Answer, FinishedQuiz, Question, QuizConfig, QuizSession, QuotaSnapshot, StartedQuiz,
    StatsReport,
};
use crate::error::{QuizError, QuizResult, Recoverable};
use crate::parser::{parse_answer, parse_question, ANSWER_REPLY_FORMAT, QUESTION_REPLY_FORMAT};
use crate::ports::{ChatBackend, MovieCatalog, PromptRenderer, StatsRepository};
use crate::quota::QuotaTracker;
use crate::retry::RetryPolicy;
use crate::session_store::SessionStore;
use crate::stats::StatsAggregator;

/// The external collaborators the quiz depends on.
#[derive(Clone)]
pub struct QuizPorts {
    pub chat: Arc<dyn ChatBackend>,
    pub catalog: Arc<dyn MovieCatalog>,
    pub prompts: Arc<dyn PromptRenderer>,
    pub stats_repo: Arc<dyn StatsRepository>,
}

/// Tunables for quota, retry and session lifetime.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub daily_limit: u32,
    pub max_attempts: u32,
    pub retry_interval: Duration,
    pub session_ttl: Duration,
    pub session_capacity: usize,
}

/// Process-wide quiz context. Each piece of shared state carries its own lock.
pub struct QuizService {
    ports: QuizPorts,
    quota: QuotaTracker,
    retry: RetryPolicy,
    sessions: SessionStore,
    stats: StatsAggregator,
    session_ttl: Duration,
}

impl QuizService {
    pub fn new(ports: QuizPorts, settings: QuizSettings) -> Self {
        Self {
            ports,
            quota: QuotaTracker::new(settings.daily_limit),
            retry: RetryPolicy::new(settings.max_attempts, settings.retry_interval),
            sessions: SessionStore::new(settings.session_capacity),
            stats: StatsAggregator::default(),
            session_ttl: settings.session_ttl,
        }
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Loads the stats checkpoint. Failures are logged, leave totals at zero and
    /// keep `persist_stats` from overwriting the checkpoint.
    pub async fn restore_stats(&self) {
        self.stats.load_or_default(self.ports.stats_repo.as_ref()).await;
    }

    /// Writes the stats checkpoint unless it could not be loaded. Failures are
    /// logged, never returned.
    pub async fn persist_stats(&self) {
        self.stats.save_or_log(self.ports.stats_repo.as_ref()).await;
    }

    //=====================================================================================
    // Boundary Operations
    //=====================================================================================

    /// Starts a quiz about a random movie matching `config`.
    pub async fn start_quiz(&self, config: &QuizConfig) -> QuizResult<StartedQuiz> {
        self.quota.admit().await?;

        let filters = config.movie_filters();
        let movie = self.ports.catalog.random_movie(&filters).await.map_err(|e| {
            info!("Could not find movie with quiz config {:?}: {}", config, e);
            QuizError::from(e)
        })?;

        let prompt = self
            .ports
            .prompts
            .render_question_prompt(&movie, &config.prompt_style())?;
        debug!("Generated question prompt: {}", prompt);

        let prompt = prompt.as_str();
        let question = self
            .with_retry(move || self.generate_question(prompt))
            .await?;

        let session = QuizSession::new(question.clone(), movie.clone());
        let id = session.id;
        self.sessions.put(id, session, self.session_ttl).await;
        self.stats.on_start().await;
        info!("Started quiz {} about '{}'", id, movie.title);

        Ok(StartedQuiz {
            id,
            question,
            movie,
        })
    }

    /// Grades `user_answer` for the session `id`. A session can be finished once.
    pub async fn finish_quiz(&self, id: Uuid, user_answer: &str) -> QuizResult<FinishedQuiz> {
        let session = self.sessions.take(&id).await.ok_or_else(|| {
            info!("Session not found: {}", id);
            QuizError::NotFound(format!("session {}", id))
        })?;

        let prompt = self
            .ports
            .prompts
            .render_answer_prompt(&session.movie, user_answer)?;
        debug!("Evaluating quiz answer with prompt: {}", prompt);

        let prompt = prompt.as_str();
        let result = self.with_retry(move || self.grade_answer(prompt)).await?;

        self.stats.on_finish(result.points).await;
        info!("Finished quiz {} with {} points", id, result.points);

        Ok(FinishedQuiz {
            id,
            question: session.question,
            movie: session.movie,
            user_answer: user_answer.to_string(),
            result,
        })
    }

    /// Live sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<QuizSession> {
        self.sessions.entries().await
    }

    pub async fn quota(&self) -> QuotaSnapshot {
        self.quota.snapshot().await
    }

    pub async fn stats(&self) -> StatsReport {
        StatsReport {
            stats: self.stats.snapshot().await,
            quota: self.quota.snapshot().await,
        }
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    /// Runs a chat round-trip under the retry policy. A recoverable error that
    /// survives every attempt is reported as `ExhaustedRetries`.
    async fn with_retry<T, F, Fut>(&self, operation: F) -> QuizResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = QuizResult<T>>,
    {
        self.retry.execute(operation).await.map_err(|e| {
            if e.is_recoverable() {
                error!("Chat round-trip failed after retries: {}", e);
                QuizError::ExhaustedRetries {
                    attempts: self.retry.max_attempts(),
                    source: Box::new(e),
                }
            } else {
                e
            }
        })
    }

    async fn chat(&self, system_prompt: &str, instruction: &str) -> QuizResult<String> {
        let chat = self
            .ports
            .chat
            .start_chat()
            .await
            .map_err(|e| QuizError::Backend(e.to_string()))?;
        let reply = self
            .ports
            .chat
            .send(&chat, system_prompt, instruction)
            .await
            .map_err(|e| QuizError::Backend(e.to_string()))?;
        debug!("chat_reply ({}): {}", chat.model, reply);
        Ok(reply)
    }

    async fn generate_question(&self, prompt: &str) -> QuizResult<Question> {
        let reply = self.chat(prompt, QUESTION_REPLY_FORMAT).await?;
        parse_question(&reply)
    }

    async fn grade_answer(&self, prompt: &str) -> QuizResult<Answer> {
        let reply = self.chat(prompt, ANSWER_REPLY_FORMAT).await?;
        parse_answer(&reply)
    }
}
