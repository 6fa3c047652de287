use serde::Deserialize;

use crate::Config;
use crate::shared::{LoaderConfig, MySqlConnectionConfig, PoolConfig, RetryConfig, ValidationError};

/// Complete configuration for the importer binary.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid accidentally
/// leaking the database password into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct ImporterConfig {
    /// Target database connection.
    pub database: MySqlConnectionConfig,
    /// Connection pool limits.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Source file and worker settings.
    pub loader: LoaderConfig,
    /// Insert retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Optional port for the Prometheus metrics listener.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl ImporterConfig {
    /// Validates the complete importer configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.loader.validate()?;
        self.pool.validate()?;
        self.retry.validate()
    }
}

impl Config for ImporterConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
