//! Bounded retry for transient failures.
//!
//! The policy is an explicit value and the combinator takes the sleep
//! function as a parameter, so tests can drive it without waiting.

use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),

    /// `base * 2^(retry - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before the given retry (1-based).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use ethics_harvester::retry::Backoff;
    ///
    /// let backoff = Backoff::Exponential {
    ///     base: Duration::from_millis(500),
    ///     max: Duration::from_secs(1),
    /// };
    /// assert_eq!(backoff.delay(1), Duration::from_millis(500));
    /// assert_eq!(backoff.delay(2), Duration::from_millis(1000));
    /// assert_eq!(backoff.delay(3), Duration::from_secs(1));
    /// ```
    #[must_use]
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let exponent = retry.saturating_sub(1).min(16);
                base.checked_mul(1u32 << exponent).unwrap_or(max).min(max)
            }
        }
    }
}

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, Backoff::Fixed(Duration::ZERO))
    }

    /// Total number of attempts allowed.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every allowed attempt failed with a retryable error.
    #[error("Giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// An attempt failed with an error that must not be retried.
    #[error("{error}")]
    Permanent { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Permanent { attempts, .. } => *attempts,
        }
    }

    /// The last error observed.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Permanent { error, .. } => error,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
///
/// `operation` receives the 1-based attempt number. `is_retryable` decides
/// per error whether another attempt is worth making. `sleep` is called with
/// the backoff delay before each retry.
///
/// # Arguments
/// * `policy` - Retry bound and backoff schedule
/// * `sleep` - Called once before each retry
/// * `operation` - The fallible operation
/// * `is_retryable` - Error classifier
pub fn retry_with<T, E, S, F, R>(
    policy: &RetryPolicy,
    mut sleep: S,
    mut operation: F,
    is_retryable: R,
) -> std::result::Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    S: FnMut(Duration),
    F: FnMut(u32) -> std::result::Result<T, E>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    error,
                });
            }
            Err(error) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                let delay = policy.backoff.delay(attempt);
                tracing::warn!(
                    error = %error,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, will retry"
                );
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// [`retry_with`] using `std::thread::sleep`.
pub fn retry<T, E, F, R>(
    policy: &RetryPolicy,
    operation: F,
    is_retryable: R,
) -> std::result::Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> std::result::Result<T, E>,
    R: Fn(&E) -> bool,
{
    retry_with(policy, thread::sleep, operation, is_retryable)
}
