//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use movie_quiz_core::QuizSettings;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which chat backend answers the prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatBackendKind {
    /// Any OpenAI-compatible chat completion endpoint.
    OpenAi,
    /// A local or remote Ollama server.
    Ollama,
}

impl FromStr for ChatBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("'{}' is not a known chat backend (openai, ollama)", other)),
        }
    }
}

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost,http://localhost:5173,http://localhost:9091,https://movie.qianniu.city";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub cors_origins: Vec<String>,
    // --- Chat backend ---
    pub chat_backend: ChatBackendKind,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub chat_model: String,
    pub chat_streaming: bool,
    pub ollama_base_url: String,
    pub ollama_model: String,
    // --- Movie catalog ---
    pub tmdb_api_key: String,
    pub tmdb_api_base: String,
    pub tmdb_image_base_url: String,
    // --- Quiz policy ---
    pub quiz_rate_limit: u32,
    pub quiz_max_retries: u32,
    pub quiz_retry_interval: Duration,
    pub session_ttl: Duration,
    pub session_capacity: usize,
    pub stats_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = PathBuf::from(var_or("PROMPTS_PATH", "./prompts"));

        let cors_origins = var_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        // --- Load Chat Backend Settings ---
        let chat_backend = parse_var("CHAT_BACKEND", "openai")?;
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE").ok();
        let chat_model = var_or("CHAT_MODEL", "gpt-4o-mini");
        let chat_streaming = parse_var("CHAT_STREAMING", "false")?;
        let ollama_base_url = var_or("OLLAMA_BASE_URL", "http://localhost:11434");
        let ollama_model = var_or("OLLAMA_MODEL", "llama3");

        if chat_backend == ChatBackendKind::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()));
        }

        // --- Load Movie Catalog Settings ---
        let tmdb_api_key = std::env::var("TMDB_API_KEY")
            .map_err(|_| ConfigError::MissingVar("TMDB_API_KEY".to_string()))?;
        let tmdb_api_base = var_or("TMDB_API_BASE", "https://api.themoviedb.org/3");
        let tmdb_image_base_url = var_or("TMDB_IMAGE_BASE_URL", "https://image.tmdb.org/t/p/w500");

        // --- Load Quiz Policy ---
        let quiz_rate_limit = parse_var("QUIZ_RATE_LIMIT", "100")?;
        let quiz_max_retries = parse_var("QUIZ_MAX_RETRIES", "3")?;
        let quiz_retry_interval =
            Duration::from_millis(parse_var("QUIZ_RETRY_INTERVAL_MS", "1000")?);
        let session_ttl = Duration::from_secs(parse_var("SESSION_TTL_SECS", "600")?);
        let session_capacity = parse_var("SESSION_CAPACITY", "100")?;
        let stats_path = PathBuf::from(var_or("STATS_PATH", "./data/stats.json"));

        Ok(Self {
            bind_address,
            log_level,
            prompts_path,
            cors_origins,
            chat_backend,
            openai_api_key,
            openai_api_base,
            chat_model,
            chat_streaming,
            ollama_base_url,
            ollama_model,
            tmdb_api_key,
            tmdb_api_base,
            tmdb_image_base_url,
            quiz_rate_limit,
            quiz_max_retries,
            quiz_retry_interval,
            session_ttl,
            session_capacity,
            stats_path,
        })
    }

    /// The quota, retry and session settings handed to the quiz core.
    pub fn quiz_settings(&self) -> QuizSettings {
        QuizSettings {
            daily_limit: self.quiz_rate_limit,
            max_attempts: self.quiz_max_retries,
            retry_interval: self.quiz_retry_interval,
            session_ttl: self.session_ttl,
            session_capacity: self.session_capacity,
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = var_or(name, default);
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "BIND_ADDRESS",
        "RUST_LOG",
        "PROMPTS_PATH",
        "CORS_ORIGINS",
        "CHAT_BACKEND",
        "OPENAI_API_KEY",
        "OPENAI_API_BASE",
        "CHAT_MODEL",
        "CHAT_STREAMING",
        "OLLAMA_BASE_URL",
        "OLLAMA_MODEL",
        "TMDB_API_KEY",
        "TMDB_API_BASE",
        "TMDB_IMAGE_BASE_URL",
        "QUIZ_RATE_LIMIT",
        "QUIZ_MAX_RETRIES",
        "QUIZ_RETRY_INTERVAL_MS",
        "SESSION_TTL_SECS",
        "SESSION_CAPACITY",
        "STATS_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_when_only_required_vars_are_set() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("TMDB_API_KEY", "tmdb-test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.chat_backend, ChatBackendKind::OpenAi);
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert!(!config.chat_streaming);
        assert_eq!(config.quiz_rate_limit, 100);
        assert_eq!(config.quiz_max_retries, 3);
        assert_eq!(config.quiz_retry_interval, Duration::from_secs(1));
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(config.session_capacity, 100);
        assert_eq!(config.stats_path, PathBuf::from("./data/stats.json"));
        assert_eq!(config.cors_origins.len(), 4);
        clear_env();
    }

    #[test]
    #[serial]
    fn ollama_backend_does_not_need_an_openai_key() {
        clear_env();
        std::env::set_var("CHAT_BACKEND", "Ollama");
        std::env::set_var("TMDB_API_KEY", "tmdb-test");
        std::env::set_var("QUIZ_RATE_LIMIT", "5");
        std::env::set_var("CORS_ORIGINS", "http://a.test, ,http://b.test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.chat_backend, ChatBackendKind::Ollama);
        assert_eq!(config.quiz_settings().daily_limit, 5);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_tmdb_key_is_reported() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref var) if var == "TMDB_API_KEY"));
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_numbers_are_reported_with_the_variable_name() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("TMDB_API_KEY", "tmdb-test");
        std::env::set_var("QUIZ_MAX_RETRIES", "many");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "QUIZ_MAX_RETRIES"));
        clear_env();
    }

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!("OpenAI".parse::<ChatBackendKind>(), Ok(ChatBackendKind::OpenAi));
        assert_eq!(" ollama ".parse::<ChatBackendKind>(), Ok(ChatBackendKind::Ollama));
        assert!("gemini".parse::<ChatBackendKind>().is_err());
    }
}
