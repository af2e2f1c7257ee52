//! crates/movie_quiz_core/src/quota.rs
//!
//! Process-wide daily quota on quiz starts.
//!
//! The counter resets lazily: every admission attempt compares the stored
//! calendar day with today and starts a fresh window when the day has moved on.
//! There is no background timer.

use chrono::{DateTime, Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{QuotaSnapshot, QuotaState};
use crate::error::{QuizError, QuizResult};

/// Guards quiz starts with a per-day attempt budget.
#[derive(Debug)]
pub struct QuotaTracker {
    limit: u32,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    pub fn new(limit: u32) -> Self {
        let now = Local::now();
        Self {
            limit,
            state: Mutex::new(QuotaState {
                count: 0,
                window_start: now.date_naive(),
                last_reset_at: now,
            }),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Charges one attempt against today's budget.
    ///
    /// The attempt is charged before the caller knows whether generation will
    /// succeed, so failed starts still count.
    pub async fn admit(&self) -> QuizResult<()> {
        self.admit_at(Local::now()).await
    }

    pub(crate) async fn admit_at(&self, now: DateTime<Local>) -> QuizResult<()> {
        let mut state = self.state.lock().await;
        Self::roll_window(&mut state, now);

        if state.count >= self.limit {
            warn!(
                "Daily limit reached: {}/{} quizzes started on {}",
                state.count, self.limit, state.window_start
            );
            return Err(QuizError::QuotaExceeded { limit: self.limit });
        }

        state.count += 1;
        Ok(())
    }

    /// Current usage. Reading does not roll the window, so `count` may still
    /// belong to an earlier day than `today`.
    pub async fn snapshot(&self) -> QuotaSnapshot {
        self.snapshot_at(Local::now()).await
    }

    pub(crate) async fn snapshot_at(&self, now: DateTime<Local>) -> QuotaSnapshot {
        let state = self.state.lock().await;
        QuotaSnapshot {
            limit: self.limit,
            count: state.count,
            window_start: state.window_start,
            last_reset_at: state.last_reset_at,
            today: now.date_naive(),
        }
    }

    fn roll_window(state: &mut QuotaState, now: DateTime<Local>) {
        let today: NaiveDate = now.date_naive();
        if today > state.window_start {
            info!(
                "New quota window: {} -> {} ({} quizzes used yesterday)",
                state.window_start, today, state.count
            );
            state.count = 0;
            state.window_start = today;
            state.last_reset_at = now;
        }
    }
}
