pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{
    finish_quiz_handler, get_limit_handler, get_stats_handler, health_handler,
    list_movies_handler, list_sessions_handler, random_movie_handler, start_quiz_handler,
};
