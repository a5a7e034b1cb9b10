//! Retry policy with exponential backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::secs;

/// Exponential backoff: `base * factor^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    /// Applies random jitter of +/- 50% to each delay.
    pub jitter: bool,
}

impl Backoff {
    /// Delay to wait after the given 0-based attempt failed.
    pub fn delay(self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt.min(i32::MAX as u32) as i32);
        let seconds = self.base.as_secs_f64() * scale;
        let capped_seconds = seconds.min(self.max.as_secs_f64());

        let mut delay = Duration::from_secs_f64(capped_seconds.max(0.0));

        if self.jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
            let random_offset = fastrand::u64(0..=(jitter_ms * 2));
            let total_ms = delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
            delay = Duration::from_millis(total_ms.max(0) as u64);
        }

        delay
    }
}

/// How often and how patiently a single page fetch is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, the first one included.
    pub max_retries: u32,
    /// Base of the exponential backoff; attempt `n` (0-based) waits
    /// `backoff_factor * 2^n` before the next try.
    #[serde(with = "secs")]
    pub backoff_factor: Duration,
    #[serde(with = "secs")]
    pub max_backoff: Duration,
    pub jitter: bool,
    /// Response statuses that are retried instead of failing immediately.
    pub status_forcelist: Vec<u16>,
    pub retry_on_timeout: bool,
    pub retry_on_connect: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            jitter: false,
            status_forcelist: vec![429, 500, 502, 503, 504],
            retry_on_timeout: true,
            retry_on_connect: true,
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32, backoff_factor: Duration) -> Self {
        Self {
            max_retries,
            backoff_factor,
            ..Self::default()
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: self.backoff_factor,
            factor: 2.0,
            max: self.max_backoff,
            jitter: self.jitter,
        }
    }

    /// Total attempts, never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Whether another attempt may follow the given 0-based attempt.
    pub fn has_attempt_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.attempts()
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff().delay(attempt)
    }
}
