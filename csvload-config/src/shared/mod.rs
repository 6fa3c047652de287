//! Shared configuration types for csvload services.

mod base;
mod connection;
mod importer;
mod loader;
mod pool;
mod retry;

pub use base::ValidationError;
pub use connection::{
    DEFAULT_DATABASE_HOST, DEFAULT_DATABASE_PORT, IntoConnectOptions, MySqlConnectionConfig,
};
pub use importer::ImporterConfig;
pub use loader::LoaderConfig;
pub use pool::PoolConfig;
pub use retry::RetryConfig;
