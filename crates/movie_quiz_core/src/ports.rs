//! crates/movie_quiz_core/src/ports.rs
//!
//! Defines the service contracts (traits) the quiz core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of a specific chat vendor, movie catalog or storage format.

use async_trait::async_trait;

use crate::domain::{Movie, MovieFilters, MovieSummary, PromptStyle, StatsState};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, disk).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Identifies the conversation opened with a chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHandle {
    pub model: String,
}

/// A text-generation backend. Implementations are interchangeable and picked once
/// at startup.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens a conversation and returns the handle used for `send`.
    async fn start_chat(&self) -> PortResult<ChatHandle>;

    /// Sends a system prompt and a user instruction and returns the full reply.
    /// Streaming implementations concatenate all chunks before returning.
    async fn send(
        &self,
        chat: &ChatHandle,
        system_prompt: &str,
        instruction: &str,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Picks a random movie matching the filters.
    /// Returns `PortError::NotFound` when nothing matches.
    async fn random_movie(&self, filters: &MovieFilters) -> PortResult<Movie>;

    /// Lists one page of movies above the given rating thresholds.
    async fn movies(
        &self,
        page: u32,
        vote_avg_min: f64,
        vote_count_min: f64,
    ) -> PortResult<Vec<MovieSummary>>;
}

/// Pure templating of the prompts sent to the chat backend.
pub trait PromptRenderer: Send + Sync {
    fn render_question_prompt(&self, movie: &Movie, style: &PromptStyle) -> PortResult<String>;

    /// Renders the grading prompt; `movie` is the one the question was about.
    fn render_answer_prompt(&self, movie: &Movie, answer: &str) -> PortResult<String>;
}

/// Durable checkpoint of the running totals.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Returns `None` when no checkpoint has been written yet.
    async fn load(&self) -> PortResult<Option<StatsState>>;

    async fn save(&self, stats: &StatsState) -> PortResult<()>;
}
