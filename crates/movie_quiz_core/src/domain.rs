//! crates/movie_quiz_core/src/domain.rs
//!
//! Defines the pure, core data structures for the quiz.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Local, NaiveDate, Utc};
use uuid::Uuid;

/// A generated quiz question with two hints of increasing helpfulness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub hint1: String,
    pub hint2: String,
}

/// The graded result of a user's guess.
///
/// `points` is taken from the generated reply as-is; the grader is asked for
/// 0-3 but nothing clamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub points: i64,
    pub text: String,
}

/// The movie a quiz is about, as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Movie {
    pub id: u64,
    pub title: String,
    pub tagline: String,
    pub overview: String,
    pub genres: Vec<String>,
    pub budget: u64,
    pub revenue: u64,
    pub vote_average: f64,
    pub vote_count: u64,
    pub release_date: String,
    pub runtime: u32,
    pub poster_url: Option<String>,
    pub imdb_id: Option<String>,
}

/// A single row of a catalog listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub poster_url: Option<String>,
}

/// Filters passed to the catalog when picking a random movie.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFilters {
    pub page_min: u32,
    pub page_max: u32,
    pub vote_avg_min: f64,
    pub vote_count_min: f64,
}

/// Caller-supplied options for starting a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizConfig {
    /// 3 = blockbusters, 2 = well known, 1 = obscure.
    pub popularity: u8,
    pub vote_avg_min: f64,
    pub vote_count_min: f64,
    pub language: String,
    pub personality: String,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            popularity: 3,
            vote_avg_min: 5.0,
            vote_count_min: 1000.0,
            language: "default".to_string(),
            personality: "default".to_string(),
        }
    }
}

impl QuizConfig {
    /// Maps the popularity level to a range of catalog pages and builds the
    /// filters for a random movie lookup. Lower pages hold more popular titles.
    pub fn movie_filters(&self) -> MovieFilters {
        let (page_min, page_max) = match self.popularity {
            3 => (1, 5),
            2 => (10, 100),
            1 => (50, 300),
            _ => (1, 3),
        };
        MovieFilters {
            page_min,
            page_max,
            vote_avg_min: self.vote_avg_min,
            vote_count_min: self.vote_count_min,
        }
    }

    pub fn prompt_style(&self) -> PromptStyle {
        PromptStyle {
            language: self.language.clone(),
            personality: self.personality.clone(),
        }
    }
}

/// Names of the language and personality the question prompt should use.
/// Unknown names fall back to the renderer's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptStyle {
    pub language: String,
    pub personality: String,
}

/// The server-side record bridging a quiz's start and finish requests.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    pub id: Uuid,
    pub question: Question,
    pub movie: Movie,
    pub created_at: DateTime<Utc>,
    /// Stamped by the session store on insertion.
    pub expires_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(question: Question, movie: Movie) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            question,
            movie,
            created_at: now,
            expires_at: now,
        }
    }
}

/// Daily quota counter and the calendar day it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    pub count: u32,
    pub window_start: NaiveDate,
    pub last_reset_at: DateTime<Local>,
}

/// Read-only view of the quota for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub limit: u32,
    pub count: u32,
    pub window_start: NaiveDate,
    pub last_reset_at: DateTime<Local>,
    pub today: NaiveDate,
}

/// Running totals kept across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsState {
    pub quiz_count_total: u64,
    pub points_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub stats: StatsState,
    pub quota: QuotaSnapshot,
}

/// Result of a successful quiz start.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedQuiz {
    pub id: Uuid,
    pub question: Question,
    pub movie: Movie,
}

/// Result of a successful quiz finish.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedQuiz {
    pub id: Uuid,
    pub question: Question,
    pub movie: Movie,
    pub user_answer: String,
    pub result: Answer,
}
