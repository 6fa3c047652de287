use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Settings for a single bulk load run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoaderConfig {
    /// Location of the delimited source file.
    pub input_path: PathBuf,
    /// Name of the target table.
    pub table: String,
    /// Exact number of concurrent insert workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Field delimiter of the source file.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Each worker logs its progress every this many inserts.
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: u64,
    /// Optional file receiving rows that permanently failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_path: Option<PathBuf>,
}

impl LoaderConfig {
    pub const DEFAULT_WORKER_COUNT: usize = 100;

    pub const DEFAULT_DELIMITER: &'static str = ",";

    pub const DEFAULT_PROGRESS_LOG_INTERVAL: u64 = 100;

    /// Returns the delimiter as the single byte expected by the reader.
    ///
    /// Falls back to `,` if the delimiter was not validated.
    pub fn delimiter_byte(&self) -> u8 {
        match self.delimiter.as_bytes() {
            [byte] => *byte,
            _ => b',',
        }
    }

    /// Validates loader settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_count == 0 {
            return Err(ValidationError::WorkerCountZero);
        }

        if self.progress_log_interval == 0 {
            return Err(ValidationError::ProgressLogIntervalZero);
        }

        if self.table.trim().is_empty() {
            return Err(ValidationError::TableNameEmpty);
        }

        if !matches!(self.delimiter.as_bytes(), [byte] if byte.is_ascii()) {
            return Err(ValidationError::InvalidDelimiter(self.delimiter.clone()));
        }

        Ok(())
    }
}

fn default_worker_count() -> usize {
    LoaderConfig::DEFAULT_WORKER_COUNT
}

fn default_delimiter() -> String {
    LoaderConfig::DEFAULT_DELIMITER.to_string()
}

fn default_progress_log_interval() -> u64 {
    LoaderConfig::DEFAULT_PROGRESS_LOG_INTERVAL
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader_config() -> LoaderConfig {
        LoaderConfig {
            input_path: PathBuf::from("majestic_million.csv"),
            table: "domain".to_string(),
            worker_count: default_worker_count(),
            delimiter: default_delimiter(),
            progress_log_interval: default_progress_log_interval(),
            dead_letter_path: None,
        }
    }

    #[test]
    fn default_loader_config_is_valid() {
        let config = loader_config();

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.delimiter_byte(), b',');
    }

    #[test]
    fn rejects_zero_workers() {
        let config = LoaderConfig {
            worker_count: 0,
            ..loader_config()
        };

        assert_eq!(config.validate(), Err(ValidationError::WorkerCountZero));
    }

    #[test]
    fn rejects_multi_character_delimiter() {
        let config = LoaderConfig {
            delimiter: "::".to_string(),
            ..loader_config()
        };

        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidDelimiter("::".to_string()))
        );
    }

    #[test]
    fn accepts_tab_delimiter() {
        let config = LoaderConfig {
            delimiter: "\t".to_string(),
            ..loader_config()
        };

        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.delimiter_byte(), b'\t');
    }
}
