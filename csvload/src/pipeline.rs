//! Driver wiring the row source, the job queue, the insert workers and the completion
//! tracker into a single load.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use csvload_config::shared::{LoaderConfig, RetryConfig};
use tracing::{error, info, warn};

use crate::concurrency::completion::CompletionTracker;
use crate::concurrency::handoff::{JobQueueTx, SendError, create_job_queue};
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::concurrency::signal::{StatementTx, create_statement_signal};
use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::inserter::RowInserter;
use crate::load_error;
use crate::metrics::register_metrics;
use crate::source::RowSource;
use crate::types::{DeadLetter, Header, InsertStatement, Job, LoadSummary};
use crate::workers::backoff::RetryPolicy;
use crate::workers::executor::InsertExecutor;
use crate::workers::pool::InsertWorkerPool;

/// What the producer observed while scanning the source.
#[derive(Debug, Default)]
struct ScanOutcome {
    header: Option<Header>,
    interrupted: bool,
    aborted: Option<LoadError>,
}

/// A single bulk load of one source into one table.
///
/// Workers are started before the source is scanned. The scan runs on the calling task and
/// hands each row to a worker through a zero-capacity queue; once the source is exhausted the
/// queue is closed and [`LoadPipeline::run`] waits for every dispatched row to be
/// acknowledged before returning. A malformed record stops the scan, but rows already
/// dispatched are still drained and the summary carries the error in
/// [`LoadSummary::aborted`] next to the rows that failed before it.
#[derive(Debug)]
pub struct LoadPipeline<I> {
    table: String,
    worker_count: usize,
    progress_log_interval: u64,
    retry_policy: RetryPolicy,
    inserter: I,
    shutdown_tx: ShutdownTx,
}

impl<I> LoadPipeline<I>
where
    I: RowInserter + Send + Sync + 'static,
{
    pub fn new(loader_config: &LoaderConfig, retry_config: &RetryConfig, inserter: I) -> Self {
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            table: loader_config.table.clone(),
            worker_count: loader_config.worker_count,
            progress_log_interval: loader_config.progress_log_interval,
            retry_policy: RetryPolicy::from(retry_config),
            inserter,
            shutdown_tx,
        }
    }

    /// Returns a handle that stops the scan when triggered.
    ///
    /// Rows already handed to workers are still inserted and the summary is marked as
    /// interrupted.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Loads every record of `source` and returns the summary once all of them are
    /// acknowledged.
    ///
    /// Returns an error only when the workers themselves fail; an aborted scan is reported
    /// through the summary.
    pub async fn run<R: io::Read>(self, mut source: RowSource<R>) -> LoadResult<LoadSummary> {
        let started = Instant::now();
        register_metrics();

        info!(
            table = %self.table,
            worker_count = self.worker_count,
            inserter = I::name(),
            "starting load"
        );

        let tracker = Arc::new(CompletionTracker::new());
        let (queue_tx, queue_rx) = create_job_queue(self.worker_count);
        let (statement_tx, statement_rx) = create_statement_signal();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let executor = Arc::new(InsertExecutor::new(self.inserter, self.retry_policy));
        let mut pool = InsertWorkerPool::start(
            self.worker_count,
            executor,
            queue_rx,
            statement_rx,
            tracker.clone(),
            self.progress_log_interval,
        );

        let outcome = produce(
            &mut source,
            &self.table,
            statement_tx,
            queue_tx,
            &tracker,
            &shutdown_rx,
        )
        .await;

        if let Err(workers_err) = drain(&tracker, &mut pool).await {
            return match outcome.aborted {
                Some(scan_err) => Err(LoadError::from(vec![scan_err, workers_err])),
                None => Err(workers_err),
            };
        }

        let summary = LoadSummary {
            header: outcome.header,
            dispatched: tracker.dispatched(),
            inserted: tracker.inserted(),
            failed: tracker.dead_letters().await,
            interrupted: outcome.interrupted,
            aborted: outcome.aborted,
            elapsed: started.elapsed(),
        };

        match &summary.aborted {
            Some(err) => error!(
                error = %err.summary(),
                dispatched = summary.dispatched,
                inserted = summary.inserted,
                failed = summary.failed_count(),
                records_read = source.records_read(),
                "load aborted while scanning the source"
            ),
            None => info!(
                dispatched = summary.dispatched,
                inserted = summary.inserted,
                failed = summary.failed_count(),
                interrupted = summary.interrupted,
                "load finished"
            ),
        }

        Ok(summary)
    }
}

/// Scans the source, publishing the insert statement and dispatching one job per record.
///
/// Consumes the statement signal and the queue sender, so returning by any path releases
/// workers waiting on either. An error ends the scan and is kept in the outcome.
async fn produce<R: io::Read>(
    source: &mut RowSource<R>,
    table: &str,
    statement_tx: StatementTx,
    queue_tx: JobQueueTx<Job>,
    tracker: &CompletionTracker,
    shutdown_rx: &ShutdownRx,
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    if let Err(err) = scan(
        source,
        table,
        statement_tx,
        queue_tx,
        tracker,
        shutdown_rx,
        &mut outcome,
    )
    .await
    {
        outcome.aborted = Some(err);
    }

    outcome
}

async fn scan<R: io::Read>(
    source: &mut RowSource<R>,
    table: &str,
    statement_tx: StatementTx,
    mut queue_tx: JobQueueTx<Job>,
    tracker: &CompletionTracker,
    shutdown_rx: &ShutdownRx,
    outcome: &mut ScanOutcome,
) -> LoadResult<()> {
    let Some(header) = source.read_header()? else {
        info!("source is empty, nothing to load");
        return Ok(());
    };

    let statement = Arc::new(InsertStatement::new(table, header.clone()));
    outcome.header = Some(header);
    info!(sql = statement.sql(), "publishing insert statement");
    statement_tx.publish(statement);

    loop {
        if shutdown_rx.is_shutdown() {
            warn!(
                records_read = source.records_read(),
                "shutdown requested, stopping the scan"
            );
            outcome.interrupted = true;
            break;
        }

        let Some(job) = source.next_job()? else {
            break;
        };

        tracker.record_dispatched();
        if let Err(SendError(job)) = queue_tx.send(job).await {
            let err = load_error!(
                ErrorKind::WorkersUnavailable,
                "No insert worker is left to take the row",
                job.position
            );
            tracker
                .record_failed(DeadLetter::new(job, 0, err.clone()))
                .await;

            return Err(err);
        }
    }

    queue_tx.close();
    info!(records_read = source.records_read(), "source scan finished");

    Ok(())
}

/// Waits until every dispatched job is acknowledged, then joins the workers.
///
/// If every worker exits while jobs are still pending, those jobs can never be acknowledged;
/// this is reported as an error instead of waiting forever.
async fn drain(tracker: &CompletionTracker, pool: &mut InsertWorkerPool) -> LoadResult<()> {
    tokio::select! {
        biased;

        _ = tracker.wait_for_drain() => pool.wait_all().await,
        result = pool.wait_all() => {
            let pending = tracker.pending();
            if pending == 0 {
                return result;
            }

            error!(pending, "insert workers exited with unacknowledged jobs");
            let lost = load_error!(
                ErrorKind::InvalidState,
                "Insert workers exited with unacknowledged jobs",
                format!("{pending} jobs were never acknowledged")
            );

            match result {
                Ok(()) => Err(lost),
                Err(err) => Err(LoadError::from(vec![err, lost])),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inserter::memory::MemoryInserter;

    fn loader_config(worker_count: usize) -> LoaderConfig {
        LoaderConfig {
            input_path: "unused.csv".into(),
            table: "domain".to_string(),
            worker_count,
            delimiter: ",".to_string(),
            progress_log_interval: 1,
            dead_letter_path: None,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loads_every_row_into_memory() {
        let inserter = MemoryInserter::new();
        let pipeline = LoadPipeline::new(&loader_config(2), &RetryConfig::default(), inserter.clone());
        let source = RowSource::from_reader("domain,rank\na.com,1\nb.com,2\n".as_bytes(), b',');

        let summary = pipeline.run(source).await.unwrap();

        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.inserted, 2);
        assert!(!summary.has_failures());
        assert_eq!(inserter.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shutdown_before_run_dispatches_nothing() {
        let inserter = MemoryInserter::new();
        let pipeline = LoadPipeline::new(&loader_config(2), &RetryConfig::default(), inserter.clone());
        pipeline.shutdown_tx().shutdown();
        let source = RowSource::from_reader("domain,rank\na.com,1\n".as_bytes(), b',');

        let summary = pipeline.run(source).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.dispatched, 0);
        assert!(inserter.is_empty().await);
    }
}
