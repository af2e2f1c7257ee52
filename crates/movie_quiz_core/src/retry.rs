//! crates/movie_quiz_core/src/retry.rs
//!
//! Bounded retry with a fixed pause for unreliable upstream calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::Recoverable;

/// Runs an operation up to `max_attempts` times, pausing `interval` between
/// recoverable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Executes `operation` until it succeeds, fails with a non-recoverable error,
    /// or runs out of attempts. The final error is returned unchanged.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Recoverable + Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_recoverable() => return Err(err),
                Err(err) if attempt >= self.max_attempts => {
                    error!("Attempt {}/{} failed, giving up: {}", attempt, self.max_attempts, err);
                    return Err(err);
                }
                Err(err) => {
                    warn!("Attempt {}/{} failed: {}", attempt, self.max_attempts, err);
                    warn!("Retrying in {:?}...", self.interval);
                    tokio::time::sleep(self.interval).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuizError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn succeeds_after_k_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(4, Duration::from_millis(20));

        let started = Instant::now();
        let result = policy
            .execute(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(QuizError::Format { raw: format!("try {n}") })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two pauses between three attempts.
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn first_success_returns_without_pausing() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(3, Duration::from_secs(30));

        let started = Instant::now();
        let result: Result<&str, QuizError> = policy
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn always_failing_operation_returns_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), QuizError> = fast(3)
            .execute(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(QuizError::Backend(format!("attempt {n}")))
            })
            .await;

        assert_eq!(result, Err(QuizError::Backend("attempt 3".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_recoverable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), QuizError> = fast(5)
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(QuizError::NotFound("movie".into()))
            })
            .await;

        assert_eq!(result, Err(QuizError::NotFound("movie".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = fast(0);
        assert_eq!(policy.max_attempts(), 1);

        let result: Result<(), QuizError> = policy
            .execute(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(QuizError::Backend("down".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
