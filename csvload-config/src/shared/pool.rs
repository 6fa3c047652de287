use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Connection pool limits for the target database.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PoolConfig {
    /// Hard cap on concurrently open connections.
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: u32,
    /// Number of connections kept open while idle.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: u32,
    /// Maximum time, in milliseconds, a worker waits for a free connection.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl PoolConfig {
    pub const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 100;

    pub const DEFAULT_MAX_IDLE_CONNECTIONS: u32 = 4;

    pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;

    /// Returns the acquire timeout as a [`Duration`].
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Validates pool limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_open_connections == 0 {
            return Err(ValidationError::MaxOpenConnectionsZero);
        }

        if self.max_idle_connections > self.max_open_connections {
            return Err(ValidationError::MaxIdleConnectionsExceedsOpen {
                idle: self.max_idle_connections,
                open: self.max_open_connections,
            });
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_connections: default_max_open_connections(),
            max_idle_connections: default_max_idle_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

fn default_max_open_connections() -> u32 {
    PoolConfig::DEFAULT_MAX_OPEN_CONNECTIONS
}

fn default_max_idle_connections() -> u32 {
    PoolConfig::DEFAULT_MAX_IDLE_CONNECTIONS
}

fn default_acquire_timeout_ms() -> u64 {
    PoolConfig::DEFAULT_ACQUIRE_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pool_is_valid() {
        assert_eq!(PoolConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_more_idle_than_open_connections() {
        let config = PoolConfig {
            max_open_connections: 2,
            max_idle_connections: 4,
            ..PoolConfig::default()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::MaxIdleConnectionsExceedsOpen { idle: 4, open: 2 })
        );
    }
}
