use csvload_config::shared::{IntoConnectOptions, MySqlConnectionConfig, PoolConfig};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tracing::info;

/// How long a connection above the idle floor may sit unused before the pool closes it.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connects to the target database with a connection pool sized from `pool_config`.
///
/// `max_open_connections` caps concurrent connections, so workers beyond that number wait on
/// acquire. `max_idle_connections` is kept as the pool's floor of warm connections; any extra
/// connection is closed after it has been idle for [`IDLE_TIMEOUT`].
pub async fn connect_pool(
    config: &MySqlConnectionConfig,
    pool_config: &PoolConfig,
) -> Result<MySqlPool, sqlx::Error> {
    let options = config.with_db();

    let pool = MySqlPoolOptions::new()
        .max_connections(pool_config.max_open_connections)
        .min_connections(pool_config.max_idle_connections)
        .acquire_timeout(pool_config.acquire_timeout())
        .idle_timeout(Some(IDLE_TIMEOUT))
        .connect_with(options)
        .await?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        max_open_connections = pool_config.max_open_connections,
        max_idle_connections = pool_config.max_idle_connections,
        "connected to target database"
    );

    Ok(pool)
}
