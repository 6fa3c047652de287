use crate::error::{ErrorKind, LoadError};

/// Retry behavior for a classified error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RetryDirective {
    /// The attempt can be retried after a backoff delay.
    Timed,
    /// The row is dead-lettered without further attempts.
    NoRetry,
}

/// Policy describing how a failed insert attempt should be handled.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorHandlingPolicy {
    retry_directive: RetryDirective,
    solution: Option<&'static str>,
}

impl ErrorHandlingPolicy {
    const fn new(retry_directive: RetryDirective, solution: Option<&'static str>) -> Self {
        Self {
            retry_directive,
            solution,
        }
    }

    pub fn retry_directive(&self) -> RetryDirective {
        self.retry_directive
    }

    /// Returns an optional operator-facing solution message.
    pub fn solution(&self) -> Option<&'static str> {
        self.solution
    }
}

/// Builds an [`ErrorHandlingPolicy`] from a [`LoadError`].
pub fn build_error_handling_policy(error: &LoadError) -> ErrorHandlingPolicy {
    match error.kind() {
        // Failures that may go away on their own: connectivity, pool exhaustion, lock
        // contention, and generic server-side failures.
        ErrorKind::DestinationConnectionFailed
        | ErrorKind::DestinationLockTimeout
        | ErrorKind::DestinationQueryFailed
        | ErrorKind::IoError
        | ErrorKind::Unknown => ErrorHandlingPolicy::new(RetryDirective::Timed, None),

        // Rows are inserted in no particular order, so a referenced parent row may still be on
        // its way through another worker.
        ErrorKind::DestinationConstraintViolation => ErrorHandlingPolicy::new(
            RetryDirective::Timed,
            Some("Check that the rows referenced by this row's foreign keys exist."),
        ),

        ErrorKind::DestinationDuplicateKey => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("The table already holds a row with this key; remove the duplicate from the file."),
        ),

        ErrorKind::DestinationSchemaError => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Verify the target table exists and its columns match the header names."),
        ),
        ErrorKind::AuthenticationError => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Verify the database credentials and the user's insert privilege on the table."),
        ),
        ErrorKind::ConversionError | ErrorKind::InvalidData => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Fix the row values so they fit the column types, then re-import the row."),
        ),
        ErrorKind::InsertPanicked => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("The inserter panicked on this row; inspect the logs for the panic message."),
        ),

        _ => ErrorHandlingPolicy::new(RetryDirective::NoRetry, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(kind: ErrorKind) -> LoadError {
        LoadError::from((kind, "test error"))
    }

    #[test]
    fn classifies_transient_failures_as_timed_retry() {
        for kind in [
            ErrorKind::DestinationConnectionFailed,
            ErrorKind::DestinationLockTimeout,
            ErrorKind::DestinationQueryFailed,
            ErrorKind::DestinationConstraintViolation,
        ] {
            let policy = build_error_handling_policy(&err(kind));
            assert_eq!(policy.retry_directive(), RetryDirective::Timed, "{kind:?}");
        }
    }

    #[test]
    fn classifies_schema_error_as_no_retry() {
        let policy = build_error_handling_policy(&err(ErrorKind::DestinationSchemaError));
        assert_eq!(policy.retry_directive(), RetryDirective::NoRetry);
        assert!(policy.solution().is_some());
    }

    #[test]
    fn classifies_duplicate_key_as_no_retry() {
        let policy = build_error_handling_policy(&err(ErrorKind::DestinationDuplicateKey));
        assert_eq!(policy.retry_directive(), RetryDirective::NoRetry);
        assert!(policy.solution().is_some());
    }

    #[test]
    fn classifies_panic_as_no_retry() {
        let policy = build_error_handling_policy(&err(ErrorKind::InsertPanicked));
        assert_eq!(policy.retry_directive(), RetryDirective::NoRetry);
    }

    #[test]
    fn classifies_data_errors_as_no_retry() {
        for kind in [
            ErrorKind::ConversionError,
            ErrorKind::InvalidData,
            ErrorKind::AuthenticationError,
        ] {
            let policy = build_error_handling_policy(&err(kind));
            assert_eq!(policy.retry_directive(), RetryDirective::NoRetry, "{kind:?}");
        }
    }
}
