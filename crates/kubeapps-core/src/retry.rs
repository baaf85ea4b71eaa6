//! Retry with exponential backoff for remote calls.
//!
//! Every outward call (database, queue, cluster API) is wrapped by [`retry`]. Attempts
//! run sequentially on the caller's task; the wait between attempts is a
//! `tokio::time::sleep`, so other requests keep being served while one backs off.
//!
//! [`retry`] does not classify errors: once an operation is wrapped, every failure
//! consumes budget. [`retry_recoverable`] is the variant for call sites whose error type
//! knows whether a retry can help (see [`ErrorMetadata::is_recoverable`]).
//!
//! A [`RetryPolicy`] is immutable once built and can be shared between any number of
//! concurrent invocations; attempt counters live on the stack of each call.

use std::fmt::{self, Debug, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ErrorMetadata;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// What the observer sees before each wait.
#[derive(Clone, Copy)]
pub struct RetryEvent<'a> {
    /// 1-indexed number of the attempt that just failed.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Wait before the next attempt.
    pub delay: Duration,
    pub error: &'a dyn Display,
}

/// Observer invoked synchronously between a failed attempt and the following wait.
///
/// The observer is infallible. A panic inside it unwinds through the executor and
/// aborts the remaining attempts.
pub type RetryObserver = Arc<dyn Fn(&RetryEvent<'_>) + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Option<Duration>,
    on_retry: Option<RetryObserver>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: None,
            on_retry: None,
        }
    }
}

impl Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Policy with a single attempt: failures are returned immediately.
    pub fn no_retry() -> Self {
        Self::default().max_attempts(1)
    }

    /// Total number of attempts, including the first. Clamped to at least 1.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Negative, NaN or infinite multipliers are treated as 1 (constant delay).
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier.is_finite() && multiplier >= 0.0 {
            multiplier
        } else {
            1.0
        };
        self
    }

    /// Upper bound on any single wait.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent<'_>) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn get_max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn get_base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn get_backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Wait after failed attempt `attempt` (1-indexed):
    /// `base_delay * backoff_multiplier^(attempt - 1)`, capped by `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exponent);
        let uncapped = Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(cap) => uncapped.min(cap),
            None => uncapped,
        }
    }
}

/// Run `operation` up to `policy.max_attempts` times, backing off between failures.
///
/// Returns the first success, or the error of the final attempt unchanged.
pub async fn retry<T, E, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    run_attempts(operation, policy, |_| true).await
}

/// Like [`retry`], but errors that report `is_recoverable() == false` are returned
/// immediately without consuming the remaining budget or notifying the observer.
pub async fn retry_recoverable<T, E, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display + ErrorMetadata,
{
    run_attempts(operation, policy, |e: &E| e.is_recoverable()).await
}

async fn run_attempts<T, E, F, Fut, P>(
    mut operation: F,
    policy: &RetryPolicy,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= max_attempts {
            if max_attempts > 1 {
                tracing::error!(
                    attempts = attempt,
                    error = %error,
                    "Operation failed after exhausting retries"
                );
            }
            return Err(error);
        }

        if !should_retry(&error) {
            tracing::debug!(
                attempt = attempt,
                error = %error,
                "Operation failed with non-recoverable error, not retrying"
            );
            return Err(error);
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::warn!(
            attempt = attempt,
            max_attempts = max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying operation after failure"
        );

        if let Some(observer) = &policy.on_retry {
            observer(&RetryEvent {
                attempt,
                max_attempts,
                delay,
                error: &error,
            });
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
