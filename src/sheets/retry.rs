use super::SheetsError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff settings.
///
/// `retryable` decides which failures are retried at all; a `Retry-After`
/// value carried by the failure replaces the computed delay for that attempt
/// and is not capped by `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub retryable: fn(&SheetsError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            multiplier: 2.0,
            retryable: SheetsError::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt and surfaces its error unchanged.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retryable: |_| false,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn is_retryable(&self, error: &SheetsError) -> bool {
        (self.retryable)(error)
    }

    /// `min(initial_delay * multiplier^attempt, max_delay)` for a 0-indexed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * factor;

        if !delay_secs.is_finite() || delay_secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    pub fn delay_for(&self, attempt: u32, error: &SheetsError) -> Duration {
        error.retry_after().unwrap_or_else(|| self.backoff(attempt))
    }
}

/// Runs an operation until it succeeds, fails permanently, or runs out of attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// `op` receives the 0-indexed attempt number.
    pub async fn execute<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, SheetsError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SheetsError>>,
    {
        let max_retries = self.policy.max_retries;
        let mut attempt = 0;

        loop {
            let error = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.policy.is_retryable(&error) {
                return Err(error);
            }

            if attempt >= max_retries {
                return Err(SheetsError::RetryExhausted {
                    attempts: attempt + 1,
                    last: Box::new(error),
                });
            }

            let delay = self.policy.delay_for(attempt, &error);
            warn!(
                code = %error.code(),
                attempt,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                endpoint,
                "Retrying Sheets API request"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
