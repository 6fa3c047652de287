//! Layered configuration: a base file, an environment file, then `APP_` variables.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding the configuration files, relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration file.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";
const LIST_SEPARATOR: &str = ",";

/// Implemented by top-level configuration types loadable with [`load_config`].
pub trait Config {
    /// Keys whose environment values are split on commas into lists.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// A file layer of the configuration; later layers override earlier ones.
#[derive(Debug, Clone, Copy)]
enum FileLayer {
    Base,
    Environment(Environment),
}

impl FileLayer {
    fn stem(self) -> String {
        match self {
            FileLayer::Base => "base".to_string(),
            FileLayer::Environment(environment) => environment.to_string(),
        }
    }

    /// Returns the first existing `{stem}.{extension}` file in `directory`.
    fn locate(self, directory: &Path) -> Result<PathBuf, LoadConfigError> {
        let stem = self.stem();
        let candidates: Vec<PathBuf> = CONFIG_FILE_EXTENSIONS
            .iter()
            .map(|extension| directory.join(format!("{stem}.{extension}")))
            .collect();

        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Ok(path.clone()),
            None => Err(LoadConfigError::ConfigurationFileMissing {
                layer: self.to_string(),
                directory: directory.to_path_buf(),
                attempted: candidates,
            }),
        }
    }
}

impl fmt::Display for FileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileLayer::Base => f.write_str("base configuration"),
            FileLayer::Environment(environment) => {
                write!(f, "{environment} environment configuration")
            }
        }
    }
}

/// Errors raised while locating, parsing or deserializing configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{}` does not exist", .0.display())]
    MissingConfigurationDirectory(PathBuf),

    #[error(
        "could not locate {layer} in `{}`; attempted: {}",
        .directory.display(),
        display_paths(.attempted)
    )]
    ConfigurationFileMissing {
        layer: String,
        directory: PathBuf,
        attempted: Vec<PathBuf>,
    },

    /// A file exists but could not be parsed.
    #[error("failed to load {layer} from `{}`: {source}", .path.display())]
    ConfigurationFileLoad {
        layer: String,
        path: PathBuf,
        source: config::ConfigError,
    },

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),

    /// `APP_ENVIRONMENT` is set to an unknown value.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("failed to build configuration: {0}")]
    Builder(#[source] config::ConfigError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Loads `T` from the `configuration` directory of the working directory.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let current_dir = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    load_config_from_dir(&current_dir.join(CONFIGURATION_DIR))
}

/// Loads `T` from `directory`.
///
/// Layers `base.{yaml,yml,json}`, then the file named after the runtime environment, then
/// `APP_`-prefixed variables. Nested keys are separated by `__` (`APP_DATABASE__USERNAME`).
/// Each file is parsed as soon as it is added so a broken file is reported with its path.
pub fn load_config_from_dir<T>(directory: &Path) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let environment = Environment::load()?;

    let mut builder = config::Config::builder();
    for layer in [FileLayer::Base, FileLayer::Environment(environment)] {
        let path = layer.locate(directory)?;
        builder = builder.add_source(config::File::from(path.as_path()));

        if let Err(source) = builder.build_cloned() {
            return Err(LoadConfigError::ConfigurationFileLoad {
                layer: layer.to_string(),
                path,
                source,
            });
        }
    }

    builder
        .add_source(environment_overrides::<T>())
        .build()
        .map_err(LoadConfigError::Builder)?
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn environment_overrides<T: Config>() -> config::Environment {
    let overrides = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    if T::LIST_PARSE_KEYS.is_empty() {
        return overrides;
    }

    T::LIST_PARSE_KEYS.iter().fold(
        overrides.list_separator(LIST_SEPARATOR),
        |overrides, key| overrides.with_list_parse_key(key),
    )
}
