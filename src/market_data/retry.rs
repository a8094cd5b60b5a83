use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::market_data::clock::Clock;
use crate::market_data::error::{FetchError, FetchResult};

/// Classification of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// Rejected for rate reasons (local governor or an HTTP 429).
    Throttled,
    /// Anything else that went wrong; never retried.
    Unexpected(String),
}

/// Exponential backoff applied to throttled attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay: Duration::from_secs(2), backoff_factor: 2.0 }
    }
}

impl RetryPolicy {
    /// Sleep taken before retry number `retry` (zero-based), i.e.
    /// `initial_delay * backoff_factor^retry`. Saturates at `Duration::MAX`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// The sleeps taken between attempts, in order. At most `max_retries` entries.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(move |retry| self.delay_for(retry))
    }

    /// Time spent sleeping when every attempt is throttled.
    pub fn total_backoff(&self) -> Duration {
        self.delays().fold(Duration::ZERO, Duration::saturating_add)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Run `operation` until it succeeds, backing off on throttles.
///
/// Each throttled attempt sleeps for the next entry of
/// [`RetryPolicy::delays`]; once `max_retries` retries have been used the next
/// throttle becomes [`FetchError::RateLimitExceeded`]. An unexpected outcome
/// fails straight away.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    endpoint: &str,
    mut operation: F,
) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AttemptOutcome<T>>,
{
    let mut retries = 0u32;

    loop {
        metrics::counter!("sorx_fetch_attempts_total", "endpoint" => endpoint.to_owned())
            .increment(1);
        match operation().await {
            AttemptOutcome::Success(payload) => {
                debug!(endpoint, attempt = retries + 1, "attempt succeeded");
                return Ok(payload);
            }
            AttemptOutcome::Unexpected(detail) => {
                warn!(
                    endpoint,
                    attempt = retries + 1,
                    %detail,
                    "unexpected response, not retrying"
                );
                return Err(FetchError::UnexpectedResponse {
                    endpoint: endpoint.to_owned(),
                    detail,
                });
            }
            AttemptOutcome::Throttled => {
                metrics::counter!("sorx_fetch_throttled_total", "endpoint" => endpoint.to_owned())
                    .increment(1);
                if retries >= policy.max_retries {
                    warn!(endpoint, attempts = retries + 1, "retries exhausted");
                    return Err(FetchError::RateLimitExceeded {
                        endpoint: endpoint.to_owned(),
                        attempts: retries + 1,
                    });
                }
                let delay = policy.delay_for(retries);
                warn!(
                    endpoint,
                    attempt = retries + 1,
                    max_attempts = policy.max_attempts(),
                    backoff_ms = delay.as_millis() as u64,
                    "throttled, backing off"
                );
                clock.sleep(delay).await;
                retries += 1;
            }
        }
    }
}
