//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request handler.

use movie_quiz_core::{MovieCatalog, QuizService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owns the quota, session store and stats; lives for the whole process.
    pub quiz: Arc<QuizService>,
    /// Backs the movie browsing endpoints directly, outside of any quiz.
    pub catalog: Arc<dyn MovieCatalog>,
}
