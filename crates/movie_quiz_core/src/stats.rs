//! crates/movie_quiz_core/src/stats.rs
//!
//! Running totals of quizzes started and points awarded.
//!
//! Totals live in memory and are checkpointed only at startup (`load`) and
//! shutdown (`save`); a crash loses whatever accumulated in between.
//!
//! When the checkpoint cannot be read, the aggregator runs in memory only and
//! `save_or_log` leaves the stored checkpoint untouched.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::StatsState;
use crate::error::{QuizError, QuizResult};
use crate::ports::StatsRepository;

#[derive(Debug, Default)]
pub struct StatsAggregator {
    state: Mutex<StatsState>,
    /// Set when the last `load_or_default` failed.
    in_memory_only: AtomicBool,
}

impl StatsAggregator {
    pub fn new(initial: StatsState) -> Self {
        Self {
            state: Mutex::new(initial),
            in_memory_only: AtomicBool::new(false),
        }
    }

    /// Records one successfully created session.
    pub async fn on_start(&self) {
        self.state.lock().await.quiz_count_total += 1;
    }

    /// Records the points of one successfully finished session.
    pub async fn on_finish(&self, points: i64) {
        let mut state = self.state.lock().await;
        state.points_total = state.points_total.saturating_add(points);
    }

    pub async fn snapshot(&self) -> StatsState {
        *self.state.lock().await
    }

    /// Replaces the in-memory totals with the stored checkpoint, or zero when
    /// none exists.
    pub async fn load(&self, repo: &dyn StatsRepository) -> QuizResult<StatsState> {
        let loaded = repo
            .load()
            .await
            .map_err(|e| QuizError::Persistence(e.to_string()))?
            .unwrap_or_default();
        *self.state.lock().await = loaded;
        Ok(loaded)
    }

    pub async fn save(&self, repo: &dyn StatsRepository) -> QuizResult<()> {
        let state = self.snapshot().await;
        repo.save(&state)
            .await
            .map_err(|e| QuizError::Persistence(e.to_string()))
    }

    /// True once a failed load switched the aggregator to in-memory-only mode.
    pub fn is_in_memory_only(&self) -> bool {
        self.in_memory_only.load(Ordering::SeqCst)
    }

    /// Like `load`, but a failure only logs, keeps in-memory totals at zero and
    /// stops later checkpoint writes.
    pub async fn load_or_default(&self, repo: &dyn StatsRepository) -> StatsState {
        match self.load(repo).await {
            Ok(stats) => {
                self.in_memory_only.store(false, Ordering::SeqCst);
                info!(
                    "Loaded stats: {} quizzes, {} points",
                    stats.quiz_count_total, stats.points_total
                );
                stats
            }
            Err(e) => {
                warn!("Could not load stats, keeping totals in memory only: {}", e);
                self.in_memory_only.store(true, Ordering::SeqCst);
                let zero = StatsState::default();
                *self.state.lock().await = zero;
                zero
            }
        }
    }

    /// Like `save`, but a failure is logged instead of returned. Skipped in
    /// in-memory-only mode so an unreadable checkpoint is never overwritten.
    pub async fn save_or_log(&self, repo: &dyn StatsRepository) {
        if self.is_in_memory_only() {
            warn!("Stats were never loaded, leaving the stored checkpoint untouched");
            return;
        }
        match self.save(repo).await {
            Ok(()) => info!("Stats saved"),
            Err(e) => error!("Could not save stats: {}", e),
        }
    }
}
