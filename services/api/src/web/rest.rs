//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use movie_quiz_core::{
    Answer, FinishedQuiz, Movie, MovieFilters, MovieSummary, PortError, Question, QuizConfig,
    QuizError, QuizSession, QuotaSnapshot, StartedQuiz, StatsReport, StatsState,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

/// Status code and message returned by a failed handler.
pub type HandlerError = (StatusCode, String);

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        start_quiz_handler,
        finish_quiz_handler,
        list_sessions_handler,
        get_limit_handler,
        get_stats_handler,
        list_movies_handler,
        random_movie_handler,
    ),
    components(
        schemas(
            QuizConfigPayload,
            UserAnswerPayload,
            QuestionResponse,
            AnswerResponse,
            MovieResponse,
            MovieSummaryResponse,
            StartQuizResponse,
            FinishQuizResponse,
            SessionResponse,
            LimitResponse,
            StatsTotals,
            StatsResponse,
        )
    ),
    tags(
        (name = "Movie Quiz API", description = "Guess the movie from a generated question and two hints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request Payloads
//=========================================================================================

/// Options for a new quiz. Every field is optional.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(default)]
pub struct QuizConfigPayload {
    /// 3 = blockbusters, 2 = well known, 1 = obscure.
    pub popularity: u8,
    pub vote_avg_min: f64,
    pub vote_count_min: f64,
    /// `default`, `english` or `german`.
    pub language: String,
    /// `default`, `christmas`, `scientist` or `dad`.
    pub personality: String,
}

impl Default for QuizConfigPayload {
    fn default() -> Self {
        QuizConfig::default().into()
    }
}

impl From<QuizConfig> for QuizConfigPayload {
    fn from(config: QuizConfig) -> Self {
        Self {
            popularity: config.popularity,
            vote_avg_min: config.vote_avg_min,
            vote_count_min: config.vote_count_min,
            language: config.language,
            personality: config.personality,
        }
    }
}

impl From<QuizConfigPayload> for QuizConfig {
    fn from(payload: QuizConfigPayload) -> Self {
        Self {
            popularity: payload.popularity,
            vote_avg_min: payload.vote_avg_min,
            vote_count_min: payload.vote_count_min,
            language: payload.language,
            personality: payload.personality,
        }
    }
}

/// The participant's guess.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserAnswerPayload {
    pub answer: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MoviesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_vote_avg_min")]
    pub vote_avg_min: f64,
    #[serde(default = "default_vote_count_min")]
    pub vote_count_min: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RandomMovieQuery {
    #[serde(default = "default_page")]
    pub page_min: u32,
    #[serde(default = "default_page_max")]
    pub page_max: u32,
    #[serde(default = "default_vote_avg_min")]
    pub vote_avg_min: f64,
    #[serde(default = "default_vote_count_min")]
    pub vote_count_min: f64,
}

fn default_page() -> u32 {
    1
}

fn default_page_max() -> u32 {
    3
}

fn default_vote_avg_min() -> f64 {
    5.0
}

fn default_vote_count_min() -> f64 {
    1000.0
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub question: String,
    pub hint1: String,
    pub hint2: String,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            question: question.text,
            hint1: question.hint1,
            hint2: question.hint2,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerResponse {
    pub points: i64,
    pub answer: String,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            points: answer.points,
            answer: answer.text,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieResponse {
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

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            tagline: movie.tagline,
            overview: movie.overview,
            genres: movie.genres,
            budget: movie.budget,
            revenue: movie.revenue,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            release_date: movie.release_date,
            runtime: movie.runtime,
            poster_url: movie.poster_url,
            imdb_id: movie.imdb_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieSummaryResponse {
    pub id: u64,
    pub title: String,
    pub overview: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: u64,
    pub poster_url: Option<String>,
}

impl From<MovieSummary> for MovieSummaryResponse {
    fn from(summary: MovieSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            overview: summary.overview,
            release_date: summary.release_date,
            vote_average: summary.vote_average,
            vote_count: summary.vote_count,
            poster_url: summary.poster_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StartQuizResponse {
    pub quiz_id: Uuid,
    pub question: QuestionResponse,
    pub movie: MovieResponse,
}

impl From<StartedQuiz> for StartQuizResponse {
    fn from(started: StartedQuiz) -> Self {
        Self {
            quiz_id: started.id,
            question: started.question.into(),
            movie: started.movie.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinishQuizResponse {
    pub quiz_id: Uuid,
    pub question: QuestionResponse,
    pub movie: MovieResponse,
    pub user_answer: String,
    pub result: AnswerResponse,
}

impl From<FinishedQuiz> for FinishQuizResponse {
    fn from(finished: FinishedQuiz) -> Self {
        Self {
            quiz_id: finished.id,
            question: finished.question.into(),
            movie: finished.movie.into(),
            user_answer: finished.user_answer,
            result: finished.result.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub quiz_id: Uuid,
    pub question: QuestionResponse,
    pub movie: MovieResponse,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<QuizSession> for SessionResponse {
    fn from(session: QuizSession) -> Self {
        Self {
            quiz_id: session.id,
            question: session.question.into(),
            movie: session.movie.into(),
            started_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LimitResponse {
    pub daily_limit: u32,
    pub quiz_count: u32,
    pub last_reset_time: DateTime<Local>,
    pub last_reset_date: NaiveDate,
    pub current_date: NaiveDate,
}

impl From<QuotaSnapshot> for LimitResponse {
    fn from(quota: QuotaSnapshot) -> Self {
        Self {
            daily_limit: quota.limit,
            quiz_count: quota.count,
            last_reset_time: quota.last_reset_at,
            last_reset_date: quota.window_start,
            current_date: quota.today,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsTotals {
    pub quiz_count_total: u64,
    pub points_total: i64,
}

impl From<StatsState> for StatsTotals {
    fn from(stats: StatsState) -> Self {
        Self {
            quiz_count_total: stats.quiz_count_total,
            points_total: stats.points_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub stats: StatsTotals,
    pub limit: LimitResponse,
}

impl From<StatsReport> for StatsResponse {
    fn from(report: StatsReport) -> Self {
        Self {
            stats: report.stats.into(),
            limit: report.quota.into(),
        }
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a failed quiz operation onto the status codes clients rely on.
pub fn quiz_error_response(err: QuizError) -> HandlerError {
    match err {
        QuizError::QuotaExceeded { .. } => {
            info!("Rejected quiz start: {}", err);
            (StatusCode::BAD_REQUEST, "Daily limit reached".to_string())
        }
        QuizError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        other => {
            error!("Quiz request failed: {}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn port_error_response(err: PortError) -> HandlerError {
    quiz_error_response(err.into())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/api",
    responses((status = 200, description = "The service is up"))
)]
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "Hello": "World" }))
}

/// Start a quiz about a random movie.
///
/// The body is optional; an empty body uses the default quiz config.
#[utoipa::path(
    post,
    path = "/api/quiz",
    request_body(content = QuizConfigPayload, description = "Optional quiz options."),
    responses(
        (status = 200, description = "Quiz started", body = StartQuizResponse),
        (status = 400, description = "Daily limit reached"),
        (status = 404, description = "No movie found with the given criteria"),
        (status = 422, description = "The body is not a valid quiz config"),
        (status = 500, description = "Question generation failed")
    )
)]
pub async fn start_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StartQuizResponse>, HandlerError> {
    let config: QuizConfig = if body.iter().all(u8::is_ascii_whitespace) {
        QuizConfig::default()
    } else {
        serde_json::from_slice::<QuizConfigPayload>(&body)
            .map_err(|e| {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Invalid quiz config: {}", e),
                )
            })?
            .into()
    };

    let started = app_state
        .quiz
        .start_quiz(&config)
        .await
        .map_err(quiz_error_response)?;
    Ok(Json(started.into()))
}

/// Submit a guess for a running quiz. Each quiz can be answered once.
#[utoipa::path(
    post,
    path = "/api/quiz/{quiz_id}/answer",
    request_body = UserAnswerPayload,
    params(
        ("quiz_id" = String, Path, description = "The id returned when the quiz was started.")
    ),
    responses(
        (status = 200, description = "Answer graded", body = FinishQuizResponse),
        (status = 404, description = "Session not found or expired"),
        (status = 500, description = "Grading failed")
    )
)]
pub async fn finish_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    Json(payload): Json<UserAnswerPayload>,
) -> Result<Json<FinishQuizResponse>, HandlerError> {
    let id = Uuid::parse_str(&quiz_id).map_err(|_| {
        info!("Session not found: {}", quiz_id);
        (
            StatusCode::NOT_FOUND,
            format!("Not found: session {}", quiz_id),
        )
    })?;

    let finished = app_state
        .quiz
        .finish_quiz(id, &payload.answer)
        .await
        .map_err(quiz_error_response)?;
    Ok(Json(finished.into()))
}

/// List the quizzes that are waiting for an answer.
#[utoipa::path(
    get,
    path = "/api/sessions",
    responses((status = 200, description = "Live sessions, oldest first", body = [SessionResponse]))
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<SessionResponse>> {
    let sessions = app_state.quiz.list_sessions().await;
    Json(sessions.into_iter().map(SessionResponse::from).collect())
}

/// Report today's quiz quota.
#[utoipa::path(
    get,
    path = "/api/limit",
    responses((status = 200, description = "Current quota", body = LimitResponse))
)]
pub async fn get_limit_handler(State(app_state): State<Arc<AppState>>) -> Json<LimitResponse> {
    Json(app_state.quiz.quota().await.into())
}

/// Report the running totals together with the quota.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Totals and quota", body = StatsResponse))
)]
pub async fn get_stats_handler(State(app_state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(app_state.quiz.stats().await.into())
}

/// Browse one page of the movie catalog.
#[utoipa::path(
    get,
    path = "/api/movies",
    params(MoviesQuery),
    responses(
        (status = 200, description = "One page of movies", body = [MovieSummaryResponse]),
        (status = 500, description = "Catalog lookup failed")
    )
)]
pub async fn list_movies_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<MoviesQuery>,
) -> Result<Json<Vec<MovieSummaryResponse>>, HandlerError> {
    let movies = app_state
        .catalog
        .movies(query.page, query.vote_avg_min, query.vote_count_min)
        .await
        .map_err(port_error_response)?;
    Ok(Json(movies.into_iter().map(MovieSummaryResponse::from).collect()))
}

/// Pick a random movie from a range of catalog pages.
#[utoipa::path(
    get,
    path = "/api/movies/random",
    params(RandomMovieQuery),
    responses(
        (status = 200, description = "A random movie", body = MovieResponse),
        (status = 404, description = "No movie matched"),
        (status = 500, description = "Catalog lookup failed")
    )
)]
pub async fn random_movie_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RandomMovieQuery>,
) -> Result<Json<MovieResponse>, HandlerError> {
    let filters = MovieFilters {
        page_min: query.page_min,
        page_max: query.page_max,
        vote_avg_min: query.vote_avg_min,
        vote_count_min: query.vote_count_min,
    };
    let movie = app_state
        .catalog
        .random_movie(&filters)
        .await
        .map_err(port_error_response)?;
    Ok(Json(movie.into()))
}
