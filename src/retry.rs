//! Bounded retry for optimistic-concurrency conflicts.

use std::time::Duration;

use derive_getters::Getters;
use tracing::{debug, instrument, warn};

use crate::CampaignError;

/// How often and how patiently to retry a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. At least one attempt is always made.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only [`CampaignError::is_transient`] failures are retried. The delay
    /// grows linearly with the attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error from `op`.
    #[instrument(skip(self, op))]
    pub fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, CampaignError>
    where
        F: FnMut(u32) -> Result<T, CampaignError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt) {
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %err, "Retrying");
                    std::thread::sleep(self.base_delay * attempt);
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(attempt, error = %err, "Retries exhausted");
                    }
                    return Err(err);
                }
                Ok(value) => {
                    debug!(attempt, "Operation succeeded");
                    return Ok(value);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 10)
    }
}
