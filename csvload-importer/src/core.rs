use std::io;

use csvload::error::LoadError;
use csvload::inserter::mysql::MySqlInserter;
use csvload::pipeline::LoadPipeline;
use csvload::report::write_dead_letters_file;
use csvload::source::RowSource;
use csvload::types::LoadSummary;
use csvload_config::shared::{
    ImporterConfig, LoaderConfig, MySqlConnectionConfig, PoolConfig, RetryConfig,
};
use csvload_mysql::db::connect_pool;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};

use crate::error::{ImporterError, ImporterResult};

/// Failed rows listed individually in the final log; the rest are only counted.
const MAX_LOGGED_FAILURES: usize = 100;

/// Runs one import with the provided configuration.
///
/// Connects to the target database, streams the source file through the load pipeline and
/// writes the dead-letter file if one is configured. The file is written even when a malformed
/// record stopped the scan, after which the scan error is returned. Returns
/// [`ImporterError::RowsFailed`] when the run completed but some rows could not be inserted.
pub async fn start_importer_with_config(config: ImporterConfig) -> ImporterResult<()> {
    info!("starting importer");

    log_config(&config);

    let pool = connect_pool(&config.database, &config.pool)
        .await
        .map_err(LoadError::from)?;

    let source = RowSource::open(&config.loader.input_path, config.loader.delimiter_byte())?;
    let inserter = MySqlInserter::new(pool.clone());
    let pipeline = LoadPipeline::new(&config.loader, &config.retry, inserter);

    let result = run_pipeline(pipeline, source).await;
    pool.close().await;
    let summary = result?;

    if summary.has_failures()
        && let (Some(path), Some(header)) = (&config.loader.dead_letter_path, &summary.header)
    {
        write_dead_letters_file(
            path,
            header,
            &summary.failed,
            config.loader.delimiter_byte(),
        )?;
    }

    log_summary(&summary);

    let summary = summary.into_result()?;
    if summary.has_failures() {
        return Err(ImporterError::RowsFailed {
            failed: summary.failed_count(),
            dispatched: summary.dispatched,
        });
    }

    Ok(())
}

fn log_config(config: &ImporterConfig) {
    log_connection_config(&config.database);
    log_pool_config(&config.pool);
    log_loader_config(&config.loader);
    log_retry_config(&config.retry);
}

fn log_connection_config(config: &MySqlConnectionConfig) {
    debug!(
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        password_set = config.password.is_some(),
        "target mysql connection config",
    );
}

fn log_pool_config(config: &PoolConfig) {
    debug!(
        max_open_connections = config.max_open_connections,
        max_idle_connections = config.max_idle_connections,
        acquire_timeout_ms = config.acquire_timeout_ms,
        "pool config"
    );
}

fn log_loader_config(config: &LoaderConfig) {
    debug!(
        input_path = %config.input_path.display(),
        table = config.table,
        worker_count = config.worker_count,
        delimiter = config.delimiter,
        progress_log_interval = config.progress_log_interval,
        dead_letter_path = ?config.dead_letter_path,
        "loader config"
    );
}

fn log_retry_config(config: &RetryConfig) {
    debug!(
        max_attempts = config.max_attempts,
        initial_retry_delay_ms = config.initial_retry_delay_ms,
        max_retry_delay_ms = config.max_retry_delay_ms,
        backoff_multiplier = config.backoff_multiplier,
        "retry config"
    );
}

/// Runs the pipeline while listening for shutdown signals.
///
/// SIGINT and SIGTERM stop the scan; rows already handed to workers are still inserted
/// before the pipeline returns.
#[tracing::instrument(skip_all)]
async fn run_pipeline<R: io::Read>(
    pipeline: LoadPipeline<MySqlInserter>,
    source: RowSource<R>,
) -> ImporterResult<LoadSummary> {
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        wait_for_signal().await;
        shutdown_tx.shutdown();
    });

    let result = pipeline.run(source).await;

    // Aborted when the load finishes without a signal.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    Ok(result?)
}

async fn wait_for_signal() {
    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to register sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("sigint (ctrl+c) received, stopping the import");
        }
        _ = sigterm => {
            info!("sigterm received, stopping the import");
        }
    }
}

fn log_summary(summary: &LoadSummary) {
    info!(
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "done in {} seconds",
        summary.elapsed_secs_ceil()
    );
    info!(
        dispatched = summary.dispatched,
        inserted = summary.inserted,
        failed = summary.failed_count(),
        interrupted = summary.interrupted,
        aborted = summary.aborted.is_some(),
        "import summary"
    );

    if summary.interrupted {
        warn!("import was interrupted before the whole source was read");
    }

    for dead_letter in summary.failed.iter().take(MAX_LOGGED_FAILURES) {
        error!(
            position = %dead_letter.position,
            attempts = dead_letter.attempts,
            error = %dead_letter.error.summary(),
            "row failed"
        );
    }

    let unlisted = summary.failed.len().saturating_sub(MAX_LOGGED_FAILURES);
    if unlisted > 0 {
        error!(unlisted, "more rows failed than are listed");
    }
}
