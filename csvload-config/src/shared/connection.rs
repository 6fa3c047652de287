use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

/// Host used when the configuration does not name one.
pub const DEFAULT_DATABASE_HOST: &str = "localhost";

/// Port used when the configuration does not name one.
pub const DEFAULT_DATABASE_PORT: u16 = 8080;

/// Connection settings for the target MySQL database.
///
/// The username and database name are expected from the environment
/// (`APP_DATABASE__USERNAME`, `APP_DATABASE__NAME`).
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub name: String,
    pub username: String,
    pub password: Option<SecretString>,
}

fn default_host() -> String {
    DEFAULT_DATABASE_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_DATABASE_PORT
}

/// Conversion of a connection config into driver connect options.
pub trait IntoConnectOptions<Output> {
    /// Options connecting to the server without selecting a database.
    fn without_db(&self) -> Output;
    /// Options connecting to the configured database.
    fn with_db(&self) -> Output;
}

impl IntoConnectOptions<MySqlConnectOptions> for MySqlConnectionConfig {
    fn without_db(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username);

        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }

        options
    }

    fn with_db(&self) -> MySqlConnectOptions {
        let options: MySqlConnectOptions = self.without_db();
        options.database(&self.name)
    }
}
