//! Error types and result definitions for load operations.
//!
//! [`LoadError`] carries a classification ([`ErrorKind`]), a static description, optional
//! dynamic detail, an optional source error, the caller location and a captured backtrace.
//! Errors coming from several workers can be aggregated into a single [`LoadError`].

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use sqlx::mysql::MySqlDatabaseError;

/// Result type used throughout the loader.
pub type LoadResult<T> = Result<T, LoadError>;

/// Detailed payload stored for single [`LoadError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for load operations.
#[derive(Debug, Clone)]
pub struct LoadError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    /// Multiple aggregated errors, mainly produced when joining workers.
    Many {
        errors: Vec<LoadError>,
        location: &'static Location<'static>,
    },
}

/// Categories of failures that can occur while loading a file.
///
/// The kind drives the retry decision in [`crate::workers::policy`], so insert failures are
/// classified as precisely as the driver reports them.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection Errors
    DestinationConnectionFailed,

    // Query & Execution Errors
    DestinationQueryFailed,
    DestinationLockTimeout,
    DestinationConstraintViolation,
    DestinationDuplicateKey,

    // Schema Errors
    DestinationSchemaError,

    // Data Errors
    ConversionError,
    InvalidData,
    MalformedRow,

    // Configuration Errors
    ConfigError,

    // IO Errors
    IoError,
    SourceIoError,

    // Authentication Errors
    AuthenticationError,

    // State & Workflow Errors
    InvalidState,
    InsertPanicked,
    InsertWorkerPanic,
    WorkersUnavailable,

    Unknown,
}

impl ErrorKind {
    /// Returns a stable, lowercase label for this kind, used in metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::DestinationConnectionFailed => "destination_connection_failed",
            ErrorKind::DestinationQueryFailed => "destination_query_failed",
            ErrorKind::DestinationLockTimeout => "destination_lock_timeout",
            ErrorKind::DestinationConstraintViolation => "destination_constraint_violation",
            ErrorKind::DestinationDuplicateKey => "destination_duplicate_key",
            ErrorKind::DestinationSchemaError => "destination_schema_error",
            ErrorKind::ConversionError => "conversion_error",
            ErrorKind::InvalidData => "invalid_data",
            ErrorKind::MalformedRow => "malformed_row",
            ErrorKind::ConfigError => "config_error",
            ErrorKind::IoError => "io_error",
            ErrorKind::SourceIoError => "source_io_error",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InsertPanicked => "insert_panicked",
            ErrorKind::InsertWorkerPanic => "insert_worker_panic",
            ErrorKind::WorkersUnavailable => "workers_unavailable",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl LoadError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregates.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the static description of this error.
    ///
    /// Aggregated errors return a fixed description.
    pub fn description(&self) -> &str {
        match self.repr {
            ErrorRepr::Single(ref payload) => &payload.description,
            ErrorRepr::Many { .. } => "Multiple errors occurred",
        }
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for single errors.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns a one-line rendering without location or backtrace, suitable for reports.
    pub fn summary(&self) -> String {
        match self.detail() {
            Some(detail) => format!("[{:?}] {}: {}", self.kind(), self.description(), detail),
            None => format!("[{:?}] {}", self.kind(), self.description()),
        }
    }

    /// Attaches an originating error to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        LoadError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for LoadError {
    fn eq(&self, other: &LoadError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f)?;
                write_backtrace(payload.backtrace.as_ref(), f)?;

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if errors.is_empty() {
                    write!(f, "\n  (no inner errors provided)")?;
                }

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        if line.is_empty() {
                            write!(f, "\n     ")?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered_backtrace = format!("{backtrace}");
    if rendered_backtrace.trim().is_empty() {
        return Ok(());
    }

    write!(f, "\n  Backtrace:")?;
    for line in rendered_backtrace.lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    if detail.trim().is_empty() {
        return write!(f, "\n  Detail: <empty>");
    }

    write!(f, "\n  Detail:")?;
    for line in detail.lines() {
        if line.trim().is_empty() {
            write!(f, "\n    ")?;
        } else {
            write!(f, "\n    {line}")?;
        }
    }

    Ok(())
}

/// Creates a [`LoadError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for LoadError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> LoadError {
        LoadError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`LoadError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for LoadError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> LoadError {
        LoadError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates errors. A vector with exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for LoadError
where
    E: Into<LoadError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> LoadError {
        let location = Location::caller();

        let mut errors: Vec<LoadError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        LoadError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`LoadError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for LoadError {
    #[track_caller]
    fn from(err: std::io::Error) -> LoadError {
        let detail = err.to_string();
        LoadError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`csv::Error`] to [`LoadError`].
///
/// Read failures map to [`ErrorKind::SourceIoError`]; records that cannot be decoded or whose
/// field count differs from the header map to [`ErrorKind::MalformedRow`].
impl From<csv::Error> for LoadError {
    #[track_caller]
    fn from(err: csv::Error) -> LoadError {
        let (kind, description) = match err.kind() {
            csv::ErrorKind::Io(_) => (ErrorKind::SourceIoError, "Failed to read source file"),
            csv::ErrorKind::Utf8 { .. } => (
                ErrorKind::MalformedRow,
                "Source record is not valid UTF-8",
            ),
            csv::ErrorKind::UnequalLengths { .. } => (
                ErrorKind::MalformedRow,
                "Source record field count does not match the header",
            ),
            csv::ErrorKind::Seek => (ErrorKind::SourceIoError, "Failed to seek source file"),
            csv::ErrorKind::Serialize(_) => (
                ErrorKind::IoError,
                "Failed to serialize delimited record",
            ),
            csv::ErrorKind::Deserialize { .. } => {
                (ErrorKind::MalformedRow, "Failed to decode source record")
            }
            _ => (ErrorKind::SourceIoError, "Delimited file operation failed"),
        };

        let detail = err.to_string();
        LoadError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`sqlx::Error`] to [`LoadError`] with the appropriate error kind.
///
/// Server errors are classified by their MySQL error number; transport and pool errors map to
/// [`ErrorKind::DestinationConnectionFailed`].
impl From<sqlx::Error> for LoadError {
    #[track_caller]
    fn from(err: sqlx::Error) -> LoadError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_err) => {
                match db_err.try_downcast_ref::<MySqlDatabaseError>() {
                    Some(mysql_err) => classify_mysql_error_number(mysql_err.number()),
                    None => (ErrorKind::DestinationQueryFailed, "Database query failed"),
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => (
                ErrorKind::DestinationConnectionFailed,
                "Database connection failed",
            ),
            sqlx::Error::PoolTimedOut => (
                ErrorKind::DestinationConnectionFailed,
                "Timed out waiting for a pooled connection",
            ),
            sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => (
                ErrorKind::DestinationConnectionFailed,
                "Connection pool is no longer available",
            ),
            sqlx::Error::Configuration(_) => {
                (ErrorKind::ConfigError, "Invalid database configuration")
            }
            sqlx::Error::Encode(_) | sqlx::Error::Decode(_) => (
                ErrorKind::ConversionError,
                "Failed to convert value for the database",
            ),
            _ => (ErrorKind::DestinationQueryFailed, "Database operation failed"),
        };

        let detail = err.to_string();
        LoadError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps a MySQL server error number to an error kind and description.
fn classify_mysql_error_number(number: u16) -> (ErrorKind, &'static str) {
    match number {
        // ER_LOCK_DEADLOCK, ER_LOCK_WAIT_TIMEOUT
        1213 => (ErrorKind::DestinationLockTimeout, "MySQL deadlock detected"),
        1205 => (ErrorKind::DestinationLockTimeout, "MySQL lock wait timeout"),

        // ER_DUP_ENTRY
        1062 => (ErrorKind::DestinationDuplicateKey, "MySQL duplicate key"),

        // ER_NO_REFERENCED_ROW_2, ER_ROW_IS_REFERENCED_2
        1452 | 1451 => (
            ErrorKind::DestinationConstraintViolation,
            "MySQL foreign key constraint violation",
        ),

        // ER_NO_SUCH_TABLE, ER_BAD_FIELD_ERROR, ER_BAD_DB_ERROR
        1146 | 1054 | 1049 => (
            ErrorKind::DestinationSchemaError,
            "MySQL schema object not found",
        ),

        // ER_ACCESS_DENIED_ERROR, ER_DBACCESS_DENIED_ERROR, ER_TABLEACCESS_DENIED_ERROR
        1045 | 1044 | 1142 => (
            ErrorKind::AuthenticationError,
            "MySQL authentication or access denied",
        ),

        // ER_DATA_TOO_LONG, ER_TRUNCATED_WRONG_VALUE_FOR_FIELD, ER_WARN_DATA_OUT_OF_RANGE,
        // ER_TRUNCATED_WRONG_VALUE, ER_BAD_NULL_ERROR
        1406 | 1366 | 1264 | 1292 | 1048 => (
            ErrorKind::ConversionError,
            "MySQL rejected a value for its column type",
        ),

        // ER_CON_COUNT_ERROR, ER_SERVER_SHUTDOWN
        1040 | 1053 => (
            ErrorKind::DestinationConnectionFailed,
            "MySQL server unavailable",
        ),

        _ => (ErrorKind::DestinationQueryFailed, "MySQL query failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_error;

    #[test]
    fn single_error_keeps_kind_and_detail() {
        let err = load_error!(ErrorKind::InvalidData, "Bad value", "row 3");

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), Some("row 3"));
        assert_eq!(err.summary(), "[InvalidData] Bad value: row 3");
    }

    #[test]
    fn aggregating_one_error_returns_it_unchanged() {
        let err = LoadError::from(vec![load_error!(ErrorKind::Unknown, "Only one")]);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.backtrace().is_some());
    }

    #[test]
    fn aggregated_errors_expose_all_kinds() {
        let err = LoadError::from(vec![
            load_error!(ErrorKind::InsertWorkerPanic, "First"),
            load_error!(ErrorKind::DestinationQueryFailed, "Second"),
        ]);

        assert_eq!(err.kind(), ErrorKind::InsertWorkerPanic);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::InsertWorkerPanic, ErrorKind::DestinationQueryFailed]
        );
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn mysql_error_numbers_are_classified() {
        assert_eq!(
            classify_mysql_error_number(1213).0,
            ErrorKind::DestinationLockTimeout
        );
        assert_eq!(
            classify_mysql_error_number(1062).0,
            ErrorKind::DestinationDuplicateKey
        );
        assert_eq!(
            classify_mysql_error_number(1048).0,
            ErrorKind::ConversionError
        );
        assert_eq!(
            classify_mysql_error_number(1452).0,
            ErrorKind::DestinationConstraintViolation
        );
        assert_eq!(
            classify_mysql_error_number(1146).0,
            ErrorKind::DestinationSchemaError
        );
        assert_eq!(
            classify_mysql_error_number(1045).0,
            ErrorKind::AuthenticationError
        );
        assert_eq!(
            classify_mysql_error_number(1366).0,
            ErrorKind::ConversionError
        );
        assert_eq!(
            classify_mysql_error_number(9999).0,
            ErrorKind::DestinationQueryFailed
        );
    }

    #[test]
    fn pool_timeout_is_a_connection_failure() {
        let err = LoadError::from(sqlx::Error::PoolTimedOut);

        assert_eq!(err.kind(), ErrorKind::DestinationConnectionFailed);
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn unequal_record_length_is_malformed_row() {
        let data = "a,b\n1,2,3\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());

        let mut record = csv::StringRecord::new();
        let mut result = Ok(true);
        while let Ok(true) = result {
            result = reader.read_record(&mut record);
        }

        let err = LoadError::from(result.unwrap_err());
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }
}
