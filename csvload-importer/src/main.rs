//! Bulk importer binary.
//!
//! Loads the configuration, installs tracing and metrics, and streams one delimited file into
//! a MySQL table. Exits with a non-zero status if the import could not start, hit a malformed
//! record, or finished with rows that could not be inserted.

use std::process::ExitCode;

use csvload_config::shared::ImporterConfig;
use csvload_telemetry::metrics::init_metrics;
use csvload_telemetry::tracing::init_tracing;
use tracing::{Instrument, error, info_span};

use crate::config::load_importer_config;
use crate::core::start_importer_with_config;
use crate::error::{ImporterError, ImporterResult};

mod config;
mod core;
mod error;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration, initializes tracing and runs the import on a multi-threaded
/// runtime inside the `importer` root span.
///
/// The log flusher lives until this returns, so every log line is written before the report.
fn run() -> ImporterResult<()> {
    let importer_config = load_importer_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(ImporterError::config)?;

    let root_span = info_span!("importer", app = env!("CARGO_BIN_NAME"));
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(importer_config).instrument(root_span))?;

    Ok(())
}

async fn async_main(importer_config: ImporterConfig) -> ImporterResult<()> {
    // The exporter's listener runs on this runtime.
    if let Some(port) = importer_config.metrics_port {
        init_metrics(port, env!("CARGO_BIN_NAME")).map_err(ImporterError::config)?;
    }

    if let Err(err) = start_importer_with_config(importer_config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
