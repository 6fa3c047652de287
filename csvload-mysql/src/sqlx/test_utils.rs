use csvload_config::shared::{IntoConnectOptions, MySqlConnectionConfig};
use sqlx::{Connection, Executor, MySqlConnection, MySqlPool};

use crate::quote::quote_identifier;

/// Creates a new MySQL database and returns a connection pool to it.
///
/// # Panics
/// Panics if connection or database creation fails.
pub async fn create_mysql_database(config: &MySqlConnectionConfig) -> MySqlPool {
    let mut connection = MySqlConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to MySQL");

    connection
        .execute(&*format!(
            "CREATE DATABASE {}",
            quote_identifier(&config.name)
        ))
        .await
        .expect("Failed to create database");

    MySqlPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to MySQL database")
}

/// Drops a MySQL database if it exists.
///
/// Does not panic: cleanup must not fail a test when the database is already gone or the
/// server is unreachable.
pub async fn drop_mysql_database(config: &MySqlConnectionConfig) {
    let mut connection = match MySqlConnection::connect_with(&config.without_db()).await {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("warning: failed to connect to MySQL for cleanup: {e}");
            return;
        }
    };

    if let Err(e) = connection
        .execute(&*format!(
            "DROP DATABASE IF EXISTS {}",
            quote_identifier(&config.name)
        ))
        .await
    {
        eprintln!("warning: failed to drop database {}: {}", config.name, e);
    }
}
