use std::future::Future;
use std::time::Duration;

/// Classifies an error as transient (worth retrying) or permanent.
///
/// Implemented by the network error taxonomies; the executor itself never
/// inspects statuses or error kinds.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff parameters shared by the redirect resolver and the
/// article fetcher.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(4000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay applied before attempt `n` (1-based):
    /// `min(initial_delay * multiplier^(n-1), max_delay)`, and no delay
    /// before the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = self.backoff_multiplier.powi(attempt as i32 - 1);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, returns a non-retryable error, or exhausts
/// `policy.max_attempts`. The last error observed is propagated; a
/// non-retryable error short-circuits immediately.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                tracing::debug!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
