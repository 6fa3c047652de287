use std::time::Duration;

use csvload_config::shared::RetryConfig;
use rand::Rng;

/// Bounded exponential backoff for insert attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_retry_delay_ms: u64,
    max_retry_delay_ms: u64,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Total number of attempts allowed for one row, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns whether another attempt is allowed after `attempts` failed ones.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Returns the delay to wait after the `attempt`-th failed attempt (1-based).
    ///
    /// Uses `initial * multiplier^(attempt - 1)`, capped at the maximum delay, plus up to 30%
    /// random jitter so workers failing together do not retry in lockstep.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let capped_delay_ms = self.base_delay_ms(attempt);

        let jitter_factor = rand::rng().random::<f64>() * 0.3;
        let jittered_delay_ms = capped_delay_ms * (1.0 + jitter_factor);

        Duration::from_millis(jittered_delay_ms as u64)
    }

    fn base_delay_ms(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_multiplier.powi(exponent);
        let base_delay_ms = self.initial_retry_delay_ms as f64 * multiplier;

        base_delay_ms.min(self.max_retry_delay_ms as f64)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_retry_delay_ms: config.initial_retry_delay_ms,
            max_retry_delay_ms: config.max_retry_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
