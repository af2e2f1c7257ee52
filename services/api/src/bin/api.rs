//! services/api/src/bin/api.rs

use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use movie_quiz_core::{ChatBackend, QuizPorts, QuizService};
use quiz_api_lib::{
    adapters::{
        FileStatsRepository, OllamaChatAdapter, OpenAiChatAdapter, TemplatePromptRenderer,
        TmdbCatalogAdapter,
    },
    config::{ChatBackendKind, Config},
    error::ApiError,
    web::{
        finish_quiz_handler, get_limit_handler, get_stats_handler, health_handler,
        list_movies_handler, list_sessions_handler, random_movie_handler, rest::ApiDoc,
        start_quiz_handler, state::AppState,
    },
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();
    let chat = build_chat_backend(&config, http_client.clone())?;
    let catalog = Arc::new(TmdbCatalogAdapter::new(
        http_client,
        config.tmdb_api_key.clone(),
        config.tmdb_api_base.clone(),
        config.tmdb_image_base_url.clone(),
    ));
    let prompts = Arc::new(TemplatePromptRenderer::from_dir(&config.prompts_path)?);
    let stats_repo = Arc::new(FileStatsRepository::new(config.stats_path.clone()));

    // --- 3. Build the Quiz Service & Restore Stats ---
    let quiz = Arc::new(QuizService::new(
        QuizPorts {
            chat,
            catalog: catalog.clone(),
            prompts,
            stats_repo,
        },
        config.quiz_settings(),
    ));
    quiz.restore_stats().await;

    let app_state = Arc::new(AppState {
        quiz: quiz.clone(),
        catalog,
    });

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/api", get(health_handler))
        .route("/api/quiz", post(start_quiz_handler))
        .route("/api/quiz/{quiz_id}/answer", post(finish_quiz_handler))
        .route("/api/sessions", get(list_sessions_handler))
        .route("/api/limit", get(get_limit_handler))
        .route("/api/stats", get(get_stats_handler))
        .route("/api/movies", get(list_movies_handler))
        .route("/api/movies/random", get(random_movie_handler))
        .layer(cors_layer(&config))
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let served = async {
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
    .await;

    // --- 6. Checkpoint Stats, Whatever Ended the Server ---
    quiz.persist_stats().await;
    info!("Server stopped.");

    served?;
    Ok(())
}

/// Picks the chat backend named by `CHAT_BACKEND`.
fn build_chat_backend(
    config: &Config,
    http_client: reqwest::Client,
) -> Result<Arc<dyn ChatBackend>, ApiError> {
    match config.chat_backend {
        ChatBackendKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            if let Some(api_base) = &config.openai_api_base {
                openai_config = openai_config.with_api_base(api_base);
            }
            info!(
                "Using OpenAI-compatible chat backend with model {}",
                config.chat_model
            );
            Ok(Arc::new(OpenAiChatAdapter::new(
                Client::with_config(openai_config),
                config.chat_model.clone(),
                config.chat_streaming,
            )))
        }
        ChatBackendKind::Ollama => {
            info!(
                "Using Ollama chat backend at {} with model {}",
                config.ollama_base_url, config.ollama_model
            );
            Ok(Arc::new(OllamaChatAdapter::new(
                http_client,
                config.ollama_base_url.clone(),
                config.ollama_model.clone(),
            )))
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, finishing in-flight requests...");
}
