//! Bounded retry with exponential backoff for transient SQLite failures.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let backoff_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;
        Duration::from_millis(backoff_ms.min(self.max_backoff_ms))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// BUSY and LOCKED come from concurrent writers holding the file lock and
/// clear on their own. Constraint and logic errors never do.
pub fn is_transient(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or the
/// policy is exhausted. The operation must be a whole unit of work (a full
/// transaction) so that a replay cannot partially re-apply effects.
pub fn with_retries<T>(
    policy: &RetryPolicy,
    operation: impl Fn() -> Result<T, rusqlite::Error>,
) -> Result<T, rusqlite::Error> {
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(error) if is_transient(&error) && policy.should_retry(attempt) => {
                let backoff = policy.backoff_duration(attempt);
                tracing::warn!(
                    "Transient db error on attempt {}, retrying in {:?}: {}",
                    attempt + 1,
                    backoff,
                    error
                );
                std::thread::sleep(backoff);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
