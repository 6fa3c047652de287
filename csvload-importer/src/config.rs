use csvload_config::load_config;
use csvload_config::shared::ImporterConfig;

use crate::error::{ImporterError, ImporterResult};

/// Loads and validates the importer configuration.
///
/// Uses the layered loader from [`csvload_config`] and validates the resulting
/// [`ImporterConfig`] before returning it.
pub fn load_importer_config() -> ImporterResult<ImporterConfig> {
    let config = load_config::<ImporterConfig>().map_err(ImporterError::config)?;
    config.validate().map_err(ImporterError::config)?;

    Ok(config)
}
