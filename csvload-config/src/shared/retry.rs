use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for retrying failed row inserts.
///
/// Controls how many times a single row insert is attempted and how long a worker
/// waits between attempts before the row is reported as permanently failed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total number of insert attempts for a row, including the first one.
    ///
    /// Default: 5
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    ///
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 100ms
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,

    /// Maximum delay between attempts.
    ///
    /// The backoff algorithm will not exceed this delay before jitter is applied.
    /// Specified in milliseconds for serialization compatibility.
    /// Default: 5000ms (5 seconds)
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Multiplier for exponential backoff between attempts.
    ///
    /// After each failed attempt, the delay is multiplied by this value.
    /// Must be >= 1.0.
    /// Default: 2.0
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_retry_delay_ms() -> u64 {
    100
}

fn default_max_retry_delay_ms() -> u64 {
    5000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Validates the retry settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::MaxAttemptsZero);
        }

        if self.backoff_multiplier < 1.0 || self.backoff_multiplier.is_nan() {
            return Err(ValidationError::BackoffMultiplierTooSmall(
                self.backoff_multiplier,
            ));
        }

        if self.initial_retry_delay_ms > self.max_retry_delay_ms {
            return Err(ValidationError::InitialDelayExceedsMax {
                initial: self.initial_retry_delay_ms,
                max: self.max_retry_delay_ms,
            });
        }

        Ok(())
    }
}
