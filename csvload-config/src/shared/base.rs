use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// The worker pool cannot be empty.
    #[error("`loader.worker_count` cannot be zero")]
    WorkerCountZero,
    /// The progress logging interval cannot be zero.
    #[error("`loader.progress_log_interval` cannot be zero")]
    ProgressLogIntervalZero,
    /// The target table name is empty.
    #[error("`loader.table` cannot be empty")]
    TableNameEmpty,
    /// The field delimiter must be a single byte.
    #[error("`loader.delimiter` must be a single ASCII character, got `{0}`")]
    InvalidDelimiter(String),
    /// The connection pool cannot hold zero connections.
    #[error("`pool.max_open_connections` cannot be zero")]
    MaxOpenConnectionsZero,
    /// Idle connections cannot exceed the open connections cap.
    #[error("`pool.max_idle_connections` ({idle}) cannot exceed `pool.max_open_connections` ({open})")]
    MaxIdleConnectionsExceedsOpen { idle: u32, open: u32 },
    /// At least one insert attempt is required.
    #[error("`retry.max_attempts` cannot be zero")]
    MaxAttemptsZero,
    /// Backoff must not shrink delays.
    #[error("`retry.backoff_multiplier` must be >= 1.0, got {0}")]
    BackoffMultiplierTooSmall(f64),
    /// The initial delay cannot exceed the maximum delay.
    #[error("`retry.initial_retry_delay_ms` ({initial}) cannot exceed `retry.max_retry_delay_ms` ({max})")]
    InitialDelayExceedsMax { initial: u64, max: u64 },
}
