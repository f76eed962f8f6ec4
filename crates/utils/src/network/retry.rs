//! Exponential backoff retry bounded by a deadline and a cancellation token

use keeper_core::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub max_retries: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Jitter factor for randomization (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Retry config with no jitter, for deterministic schedules
    #[must_use]
    pub fn fixed(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: base_delay.saturating_mul(2u32.saturating_pow(max_retries as u32)),
            jitter_factor: 0.0,
        }
    }

    /// Calculate delay for a given attempt with exponential backoff and jitter
    #[must_use]
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16) as u32);
        let capped_delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter_factor > 0.0 {
            // Spread retries of concurrent callers apart
            let jitter_range = capped_delay.as_millis() as f64 * self.jitter_factor;
            let normalized = (rand::random::<f64>() - 0.5) * 2.0;
            let final_millis = (capped_delay.as_millis() as f64 + normalized * jitter_range).max(0.0);
            Duration::from_millis(final_millis as u64)
        } else {
            capped_delay
        }
    }
}

/// About thirty years; stands in for "never" when a budget overflows
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// The instant `budget` from now, saturating instead of overflowing
#[must_use]
pub fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Execute `operation` with exponential backoff until it succeeds, fails with
/// a non-retryable error, runs out of attempts, or `deadline` passes.
///
/// The in-flight attempt and any backoff sleep are dropped as soon as the
/// deadline passes or `cancel` fires, so remaining retries are abandoned
/// immediately.
pub async fn retry_with_deadline<F, Fut, T>(
    config: &RetryConfig,
    deadline: Instant,
    cancel: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let budget = deadline.saturating_duration_since(started);

    let attempts = async {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::info!(operation = operation_name, attempt, "succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) if attempt < config.max_retries && error.is_retryable() => {
                    let delay = config.calculate_delay(attempt);
                    if deadline_after(delay) >= deadline {
                        tracing::warn!(
                            operation = operation_name,
                            attempt = attempt + 1,
                            error = %error,
                            "no time left for another attempt"
                        );
                        return Err(error);
                    }
                    tracing::warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_attempts = config.max_retries + 1,
                        ?delay,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled(operation_name)),
        outcome = tokio::time::timeout_at(deadline, attempts) => match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(operation_name, budget)),
        },
    }
}
