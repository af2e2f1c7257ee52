use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use movie_quiz_core::{
    ChatBackend, ChatHandle, Movie, MovieCatalog, MovieFilters, MovieSummary, PortError,
    PortResult, QuizPorts, QuizService, QuizSettings, StatsRepository, StatsState,
};
use quiz_api_lib::adapters::TemplatePromptRenderer;
use quiz_api_lib::web::rest::{
    finish_quiz_handler, get_limit_handler, get_stats_handler, health_handler,
    list_movies_handler, list_sessions_handler, random_movie_handler, start_quiz_handler,
    MoviesQuery, RandomMovieQuery, UserAnswerPayload,
};
use quiz_api_lib::web::state::AppState;

const QUESTION_REPLY: &str = "问题: Which heist film?\n提示1: Los Angeles\n提示2: De Niro";
const ANSWER_REPLY: &str = "分数: 3 分\n答案: Exactly right!";

//=========================================================================================
// Fakes
//=========================================================================================

/// Replies in order; the last reply repeats once the script runs out.
struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedChat {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
        })
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn start_chat(&self) -> PortResult<ChatHandle> {
        Ok(ChatHandle {
            model: "scripted".to_string(),
        })
    }

    async fn send(&self, _chat: &ChatHandle, _system: &str, _instruction: &str) -> PortResult<String> {
        let mut last = self.last.lock().unwrap();
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            *last = reply;
        }
        Ok(last.clone())
    }
}

struct FakeCatalog {
    movie: Option<Movie>,
}

#[async_trait]
impl MovieCatalog for FakeCatalog {
    async fn random_movie(&self, _filters: &MovieFilters) -> PortResult<Movie> {
        self.movie
            .clone()
            .ok_or_else(|| PortError::NotFound("no movie matched".to_string()))
    }

    async fn movies(&self, page: u32, _avg: f64, _count: f64) -> PortResult<Vec<MovieSummary>> {
        if page > 500 {
            return Err(PortError::Unexpected("page must be less than or equal to 500".into()));
        }
        Ok(vec![MovieSummary {
            id: 949,
            title: "Heat".to_string(),
            overview: String::new(),
            release_date: "1995-12-15".to_string(),
            vote_average: 7.9,
            vote_count: 7000,
            poster_url: None,
        }])
    }
}

#[derive(Default)]
struct MemoryStats {
    stored: Mutex<Option<StatsState>>,
}

#[async_trait]
impl StatsRepository for MemoryStats {
    async fn load(&self) -> PortResult<Option<StatsState>> {
        Ok(*self.stored.lock().unwrap())
    }

    async fn save(&self, stats: &StatsState) -> PortResult<()> {
        *self.stored.lock().unwrap() = Some(*stats);
        Ok(())
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn heat() -> Movie {
    Movie {
        id: 949,
        title: "Heat".to_string(),
        genres: vec!["Crime".to_string()],
        ..Movie::default()
    }
}

fn app_state(replies: &[&str], movie: Option<Movie>, daily_limit: u32) -> State<Arc<AppState>> {
    let catalog = Arc::new(FakeCatalog { movie });
    let quiz = QuizService::new(
        QuizPorts {
            chat: ScriptedChat::new(replies),
            catalog: catalog.clone(),
            prompts: Arc::new(TemplatePromptRenderer::default()),
            stats_repo: Arc::new(MemoryStats::default()),
        },
        QuizSettings {
            daily_limit,
            max_attempts: 2,
            retry_interval: Duration::from_millis(1),
            session_ttl: Duration::from_secs(600),
            session_capacity: 100,
        },
    );
    State(Arc::new(AppState {
        quiz: Arc::new(quiz),
        catalog,
    }))
}

fn answer(text: &str) -> Json<UserAnswerPayload> {
    Json(UserAnswerPayload {
        answer: text.to_string(),
    })
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn health_says_hello() {
    let Json(body) = health_handler().await;
    assert_eq!(body["Hello"], "World");
}

#[tokio::test]
async fn quiz_round_trip_uses_the_public_field_names() {
    let state = app_state(&[QUESTION_REPLY, ANSWER_REPLY], Some(heat()), 10);

    let Json(started) = start_quiz_handler(state.clone(), Bytes::new()).await.unwrap();
    let json = serde_json::to_value(&started).unwrap();
    assert_eq!(json["question"]["question"], "Which heist film?");
    assert_eq!(json["question"]["hint1"], "Los Angeles");
    assert_eq!(json["movie"]["title"], "Heat");

    let quiz_id = started.quiz_id.to_string();
    let Json(finished) = finish_quiz_handler(state.clone(), Path(quiz_id.clone()), answer("heat"))
        .await
        .unwrap();
    let json = serde_json::to_value(&finished).unwrap();
    assert_eq!(json["quiz_id"], quiz_id.as_str());
    assert_eq!(json["user_answer"], "heat");
    assert_eq!(json["result"]["points"], 3);
    assert_eq!(json["result"]["answer"], "Exactly right!");

    let (status, _) = finish_quiz_handler(state, Path(quiz_id), answer("heat"))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_accepts_a_partial_config_body() {
    let state = app_state(&[QUESTION_REPLY], Some(heat()), 10);
    let body = Bytes::from_static(br#"{"popularity": 1, "language": "german"}"#);

    assert!(start_quiz_handler(state, body).await.is_ok());
}

#[tokio::test]
async fn malformed_config_body_is_unprocessable() {
    let state = app_state(&[QUESTION_REPLY], Some(heat()), 10);
    let body = Bytes::from_static(br#"{"popularity": "very"}"#);

    let (status, message) = start_quiz_handler(state.clone(), body).await.unwrap_err();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(message.starts_with("Invalid quiz config"));

    let Json(limit) = get_limit_handler(state).await;
    assert_eq!(limit.quiz_count, 0);
}

#[tokio::test]
async fn quota_exhaustion_is_a_bad_request() {
    let state = app_state(&[QUESTION_REPLY], Some(heat()), 1);

    assert!(start_quiz_handler(state.clone(), Bytes::new()).await.is_ok());
    let (status, message) = start_quiz_handler(state.clone(), Bytes::new())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message, "Daily limit reached");

    let Json(limit) = get_limit_handler(state).await;
    assert_eq!(limit.daily_limit, 1);
    assert_eq!(limit.quiz_count, 1);
    assert_eq!(limit.last_reset_date, limit.current_date);
}

#[tokio::test]
async fn missing_movie_is_not_found() {
    let state = app_state(&[QUESTION_REPLY], None, 10);

    let (status, _) = start_quiz_handler(state, Bytes::new()).await.unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unparseable_replies_end_in_a_server_error() {
    let state = app_state(&["I'd rather not."], Some(heat()), 10);

    let (status, message) = start_quiz_handler(state.clone(), Bytes::new())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(message.contains("unexpected format"));

    let Json(sessions) = list_sessions_handler(state).await;
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn answering_a_malformed_quiz_id_is_not_found() {
    let state = app_state(&[ANSWER_REPLY], Some(heat()), 10);

    let (status, _) = finish_quiz_handler(state, Path("not-a-uuid".to_string()), answer("Heat"))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_and_stats_reflect_started_quizzes() {
    let state = app_state(&[QUESTION_REPLY, QUESTION_REPLY, ANSWER_REPLY], Some(heat()), 10);

    let Json(first) = start_quiz_handler(state.clone(), Bytes::new()).await.unwrap();
    let Json(second) = start_quiz_handler(state.clone(), Bytes::new()).await.unwrap();
    finish_quiz_handler(state.clone(), Path(first.quiz_id.to_string()), answer("Heat"))
        .await
        .unwrap();

    let Json(sessions) = list_sessions_handler(state.clone()).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].quiz_id, second.quiz_id);

    let Json(stats) = get_stats_handler(state).await;
    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["stats"]["quiz_count_total"], 2);
    assert_eq!(json["stats"]["points_total"], 3);
    assert_eq!(json["limit"]["quiz_count"], 2);
}

#[tokio::test]
async fn movie_endpoints_go_straight_to_the_catalog() {
    let state = app_state(&[], Some(heat()), 10);

    let Json(movies) = list_movies_handler(
        state.clone(),
        Query(MoviesQuery {
            page: 1,
            vote_avg_min: 5.0,
            vote_count_min: 1000.0,
        }),
    )
    .await
    .unwrap();
    assert_eq!(movies[0].title, "Heat");

    let (status, _) = list_movies_handler(
        state.clone(),
        Query(MoviesQuery {
            page: 501,
            vote_avg_min: 5.0,
            vote_count_min: 1000.0,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let query = || RandomMovieQuery {
        page_min: 1,
        page_max: 3,
        vote_avg_min: 5.0,
        vote_count_min: 1000.0,
    };
    let Json(movie) = random_movie_handler(state, Query(query())).await.unwrap();
    assert_eq!(movie.id, 949);

    let (status, _) = random_movie_handler(app_state(&[], None, 10), Query(query()))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}
