//! Bounded retry for transient token count failures

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::core::error::CountError;

/// Default delay before the first retry
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Retry schedule: `max_retries` extra attempts, delay doubling each time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out
    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, CountError>) -> Result<T, CountError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "transient count failure, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
