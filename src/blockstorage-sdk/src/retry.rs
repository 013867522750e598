//! Retry with exponential backoff for throttled and server-side failures.
//!
//! A request is retried on 429, any 5xx, and transport errors, until either
//! `max_attempts` is used up or the next sleep would overrun `max_elapsed`.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::SdkError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per request including the first
    pub max_attempts: u32,
    /// Budget for one logical call, sleeps included
    pub max_elapsed: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            max_elapsed: Duration::from_secs(300),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, used where retries would only slow tests down.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Delay before retry number `attempt + 1` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Connection errors, timeouts, and other transient issues are retryable.
pub fn is_retryable_error(error: &SdkError) -> bool {
    match error {
        SdkError::Http(e) => {
            e.is_connect()
                || e.is_timeout()
                || e.is_request()
                || e.status()
                    .map(|s| s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS)
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/// Execute an async request with retry logic.
///
/// `make_request` is called once per attempt so each attempt gets a fresh
/// signature and date header. The final response is returned as-is, even when
/// its status is still retryable; callers map it to an error.
pub async fn with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    make_request: F,
) -> Result<reqwest::Response, SdkError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, SdkError>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let result = make_request().await;
        let delay = policy.delay_for_attempt(attempt);
        let can_retry =
            attempt + 1 < max_attempts && started.elapsed() + delay <= policy.max_elapsed;

        match result {
            Ok(response) => {
                let status = response.status();
                if policy.should_retry_status(status) && can_retry {
                    warn!(
                        operation,
                        status = %status,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status code, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                if attempt > 0 {
                    debug!(
                        operation,
                        status = %status,
                        attempt = attempt + 1,
                        "Request finished after retry"
                    );
                }
                return Ok(response);
            }
            Err(error) => {
                if is_retryable_error(&error) && can_retry {
                    warn!(
                        operation,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable error, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                if attempt > 0 {
                    warn!(
                        operation,
                        error = %error,
                        attempts = attempt + 1,
                        "Request failed after all retry attempts"
                    );
                }
                return Err(error);
            }
        }
    }
}
