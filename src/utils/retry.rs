// src/utils/retry.rs

//! Retry with exponential backoff.
//!
//! Each attempt reports either [`Attempt::Retryable`] or [`Attempt::Fatal`].
//! Whether and how long to wait is decided by [`BackoffPolicy::decide`], a
//! pure function of the attempt number, so the schedule can be tested
//! without any I/O.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::models::HttpConfig;

/// Outcome of one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Transient; another attempt may succeed
    Retryable(E),
    /// Permanent; give up immediately
    Fatal(E),
}

impl<E> Attempt<E> {
    pub fn error(&self) -> &E {
        match self {
            Attempt::Retryable(e) | Attempt::Fatal(e) => e,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Attempt::Retryable(e) | Attempt::Fatal(e) => e,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Exponential backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_delay: Duration,
    /// Factor applied to the wait after each further failure
    pub multiplier: f64,
}

impl BackoffPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_delay: Duration::try_from_secs_f64(config.initial_backoff_secs)
                .unwrap_or(Duration::ZERO),
            multiplier: config.retry_backoff,
        }
    }

    /// Wait following failed attempt `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Decide what follows failed attempt `attempt` (1-based).
    pub fn decide<E>(&self, attempt: u32, failure: &Attempt<E>) -> RetryDecision {
        match failure {
            Attempt::Fatal(_) => RetryDecision::GiveUp,
            Attempt::Retryable(_) if attempt >= self.max_attempts => RetryDecision::GiveUp,
            Attempt::Retryable(_) => RetryDecision::RetryAfter(self.delay(attempt)),
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Run `operation` until it succeeds or the policy gives up.
///
/// The closure receives the 1-based attempt number. The last error is
/// returned once attempts are exhausted or a fatal error is reported.
pub async fn retry<T, E, F, Fut>(policy: &BackoffPolicy, mut operation: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
{
    let mut attempt = 1;
    loop {
        let failure = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        match policy.decide(attempt, &failure) {
            RetryDecision::GiveUp => return Err(failure.into_inner()),
            RetryDecision::RetryAfter(delay) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %failure.error(),
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}
