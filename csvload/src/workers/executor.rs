use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use metrics::{counter, histogram};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ErrorKind, LoadError, LoadResult};
use crate::inserter::RowInserter;
use crate::load_error;
use crate::metrics::{
    CSVLOAD_INSERT_DURATION_SECONDS, CSVLOAD_INSERT_RETRIES_TOTAL, ERROR_KIND_LABEL,
    INSERTER_LABEL, TABLE_NAME_LABEL,
};
use crate::types::{InsertStatement, Job};
use crate::workers::backoff::RetryPolicy;
use crate::workers::policy::{RetryDirective, build_error_handling_policy};

/// Terminal outcome of executing one job.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted { attempts: u32 },
    Failed { attempts: u32, error: LoadError },
}

/// Executes a job's insert, retrying failed attempts according to a [`RetryPolicy`].
#[derive(Debug)]
pub struct InsertExecutor<I> {
    inserter: I,
    retry_policy: RetryPolicy,
}

impl<I> InsertExecutor<I>
where
    I: RowInserter + Send + Sync,
{
    pub fn new(inserter: I, retry_policy: RetryPolicy) -> Self {
        Self {
            inserter,
            retry_policy,
        }
    }

    /// Inserts the job's row until it succeeds, fails with a non-retryable error, or runs
    /// out of attempts.
    ///
    /// A panic inside the inserter is caught and reported as a non-retryable
    /// [`ErrorKind::InsertPanicked`] failure so that the job is still acknowledged. A duplicate
    /// key reported right after an attempt whose outcome is unknown, such as a dropped
    /// connection, means that attempt committed, so the row counts as inserted.
    pub async fn execute(&self, statement: &InsertStatement, job: &Job) -> InsertOutcome {
        let mut attempts = 0;
        let mut previous_outcome_unknown = false;
        loop {
            attempts += 1;

            let error = match self.attempt(statement, job).await {
                Ok(()) => return InsertOutcome::Inserted { attempts },
                Err(error) => error,
            };

            // The previous attempt may have committed before its connection was lost.
            if previous_outcome_unknown && error.kind() == ErrorKind::DestinationDuplicateKey {
                warn!(
                    position = %job.position,
                    attempts,
                    "duplicate key after an attempt with unknown outcome, counting the row as inserted"
                );
                return InsertOutcome::Inserted { attempts };
            }

            let policy = build_error_handling_policy(&error);
            if policy.retry_directive() == RetryDirective::NoRetry {
                debug!(
                    position = %job.position,
                    attempts,
                    error = %error.summary(),
                    solution = policy.solution().unwrap_or_default(),
                    "insert failed with a non-retryable error"
                );
                return InsertOutcome::Failed { attempts, error };
            }

            if !self.retry_policy.allows_retry(attempts) {
                debug!(
                    position = %job.position,
                    attempts,
                    error = %error.summary(),
                    "insert attempts exhausted"
                );
                return InsertOutcome::Failed { attempts, error };
            }

            previous_outcome_unknown = matches!(
                error.kind(),
                ErrorKind::DestinationConnectionFailed | ErrorKind::IoError | ErrorKind::Unknown
            );

            let backoff = self.retry_policy.backoff(attempts);
            warn!(
                position = %job.position,
                attempt = attempts,
                max_attempts = self.retry_policy.max_attempts(),
                backoff_ms = backoff.as_millis() as u64,
                error = %error.summary(),
                "insert failed, backing off before retry"
            );
            counter!(
                CSVLOAD_INSERT_RETRIES_TOTAL,
                TABLE_NAME_LABEL => statement.table().to_string(),
                ERROR_KIND_LABEL => error.kind().as_label(),
            )
            .increment(1);

            sleep(backoff).await;
        }
    }

    async fn attempt(&self, statement: &InsertStatement, job: &Job) -> LoadResult<()> {
        let before_insert = Instant::now();

        let result = AssertUnwindSafe(self.inserter.insert_row(statement, &job.row))
            .catch_unwind()
            .await;

        histogram!(
            CSVLOAD_INSERT_DURATION_SECONDS,
            TABLE_NAME_LABEL => statement.table().to_string(),
            INSERTER_LABEL => I::name(),
        )
        .record(before_insert.elapsed().as_secs_f64());

        match result {
            Ok(result) => result,
            Err(panic) => Err(load_error!(
                ErrorKind::InsertPanicked,
                "Inserter panicked while inserting a row",
                panic_message(panic.as_ref())
            )),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use csvload_config::shared::RetryConfig;

    use super::*;
    use crate::types::{Header, Row, SourcePosition};

    /// Fails the first `failures` attempts with `kind`, then succeeds.
    #[derive(Debug, Clone)]
    struct FlakyInserter {
        failures: u32,
        kind: ErrorKind,
        calls: Arc<AtomicU32>,
    }

    impl RowInserter for FlakyInserter {
        fn name() -> &'static str {
            "flaky"
        }

        async fn insert_row(&self, _statement: &InsertStatement, _row: &Row) -> LoadResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(LoadError::from((self.kind, "injected failure")));
            }
            Ok(())
        }
    }

    /// Returns the scripted outcome for each call, succeeding once the script runs out.
    #[derive(Debug)]
    struct ScriptedInserter {
        script: Vec<ErrorKind>,
        calls: AtomicU32,
    }

    impl ScriptedInserter {
        fn new(script: Vec<ErrorKind>) -> Self {
            Self {
                script,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl RowInserter for ScriptedInserter {
        fn name() -> &'static str {
            "scripted"
        }

        async fn insert_row(&self, _statement: &InsertStatement, _row: &Row) -> LoadResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            match self.script.get(call) {
                Some(kind) => Err(LoadError::from((*kind, "scripted failure"))),
                None => Ok(()),
            }
        }
    }

    struct PanickingInserter;

    impl RowInserter for PanickingInserter {
        fn name() -> &'static str {
            "panicking"
        }

        async fn insert_row(&self, _statement: &InsertStatement, _row: &Row) -> LoadResult<()> {
            panic!("boom");
        }
    }

    fn fast_retries(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::from(&RetryConfig {
            max_attempts,
            initial_retry_delay_ms: 1,
            max_retry_delay_ms: 5,
            backoff_multiplier: 2.0,
        })
    }

    fn statement() -> InsertStatement {
        let header = Header::new(vec!["domain".to_string()]).unwrap();
        InsertStatement::new("domain", header)
    }

    fn job() -> Job {
        Job::new(
            SourcePosition { record: 1, line: 2 },
            Row::new(vec!["a.com".to_string()]),
        )
    }

    fn flaky(failures: u32, kind: ErrorKind) -> (FlakyInserter, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let inserter = FlakyInserter {
            failures,
            kind,
            calls: calls.clone(),
        };
        (inserter, calls)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn transient_failures_are_retried_until_success() {
        let (inserter, calls) = flaky(2, ErrorKind::DestinationConnectionFailed);
        let executor = InsertExecutor::new(inserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        assert!(matches!(outcome, InsertOutcome::Inserted { attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn retries_stop_at_max_attempts() {
        let (inserter, calls) = flaky(u32::MAX, ErrorKind::DestinationLockTimeout);
        let executor = InsertExecutor::new(inserter, fast_retries(4));

        let outcome = executor.execute(&statement(), &job()).await;

        match outcome {
            InsertOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 4);
                assert_eq!(error.kind(), ErrorKind::DestinationLockTimeout);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_retryable_errors_fail_on_first_attempt() {
        let (inserter, calls) = flaky(u32::MAX, ErrorKind::DestinationSchemaError);
        let executor = InsertExecutor::new(inserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        assert!(matches!(outcome, InsertOutcome::Failed { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn panics_become_failures() {
        let executor = InsertExecutor::new(PanickingInserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        match outcome {
            InsertOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 1);
                assert_eq!(error.kind(), ErrorKind::InsertPanicked);
                assert_eq!(error.detail(), Some("boom"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_key_is_not_retried() {
        let inserter = ScriptedInserter::new(vec![ErrorKind::DestinationDuplicateKey; 5]);
        let executor = InsertExecutor::new(inserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        match outcome {
            InsertOutcome::Failed { attempts, error } => {
                assert_eq!(attempts, 1);
                assert_eq!(error.kind(), ErrorKind::DestinationDuplicateKey);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_key_after_lost_connection_counts_as_inserted() {
        let inserter = ScriptedInserter::new(vec![
            ErrorKind::DestinationConnectionFailed,
            ErrorKind::DestinationDuplicateKey,
        ]);
        let executor = InsertExecutor::new(inserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        assert!(matches!(outcome, InsertOutcome::Inserted { attempts: 2 }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_key_after_lock_timeout_is_a_failure() {
        let inserter = ScriptedInserter::new(vec![
            ErrorKind::DestinationLockTimeout,
            ErrorKind::DestinationDuplicateKey,
        ]);
        let executor = InsertExecutor::new(inserter, fast_retries(5));

        let outcome = executor.execute(&statement(), &job()).await;

        assert!(matches!(outcome, InsertOutcome::Failed { attempts: 2, .. }));
    }
}
