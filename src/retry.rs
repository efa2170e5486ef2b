//! Retry policy for transient upstream failures.
//!
//! EmailBison regularly answers with 429s and 5xxs that clear on their own.
//! Requests get a fixed retry budget with a deterministic backoff schedule;
//! there is no jitter.

use http::StatusCode;
use std::time::Duration;

/// Returns `true` for the HTTP statuses worth asking again about.
///
/// The set is 429 plus the transient 5xxs (500, 502, 503, 504). Note 501 is
/// excluded: a missing endpoint does not come back on retry.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// How many times to retry and how long to wait in between.
///
/// Retry `n` (1-indexed) sleeps `min(2^n, 10) + n/10` backoff units before
/// the next attempt. With the default one-second unit that is 2.1s, 4.2s and
/// 8.3s across the default three retries.
///
/// # Examples
///
/// ```
/// use emailbison_mcp::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(2100)));
/// assert_eq!(policy.delay_for_attempt(4), None);
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and the default
    /// one-second backoff unit.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Rescales the whole backoff schedule.
    ///
    /// Tests pass a millisecond unit so exhausting the budget takes
    /// milliseconds instead of a quarter of a minute.
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// The maximum number of retries (attempts minus one).
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Returns the delay before the given retry, or `None` once the budget
    /// is spent.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry attempt number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt > self.max_retries {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt.min(30) as u32).min(10);
        let delay = self.backoff_unit * factor + self.backoff_unit.mul_f64(attempt as f64 * 0.1);
        Some(delay)
    }
}
