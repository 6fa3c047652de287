use csvload::error::LoadError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for importer operations.
pub type ImporterResult<T> = Result<T, ImporterError>;

/// Captured backtrace wrapper to avoid thiserror's unstable feature detection.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the importer binary.
///
/// Wraps [`LoadError`] for load failures and adds variants for startup errors and for runs
/// that completed with permanently failed rows.
#[derive(Debug)]
pub enum ImporterError {
    /// Load or database error.
    Load(LoadError),
    /// Configuration or telemetry setup error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
    /// The load completed but some rows were never inserted.
    RowsFailed { failed: u64, dispatched: u64 },
}

impl ImporterError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            ImporterError::Load(_) => "load error",
            ImporterError::Config(_, _) => "configuration error",
            ImporterError::Io(_, _) => "i/o error",
            ImporterError::RowsFailed { .. } => "rows failed",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            ImporterError::Load(err) => err.backtrace(),
            ImporterError::Config(_, cb) => Some(&cb.0),
            ImporterError::Io(_, cb) => Some(&cb.0),
            ImporterError::RowsFailed { .. } => None,
        }
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ImporterError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("importer failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        if should_render_backtrace() {
            if let Some(backtrace) = self.backtrace() {
                out.push_str("backtrace:\n");
                out.push_str(&backtrace.to_string());
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl fmt::Display for ImporterError {
    /// Renders a one-line description for terminal and log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImporterError::Load(err) => write!(f, "{}", err.summary()),
            ImporterError::Config(source, _) => write!(f, "configuration error: {source}"),
            ImporterError::Io(source, _) => write!(f, "i/o error: {source}"),
            ImporterError::RowsFailed { failed, dispatched } => {
                write!(f, "{failed} of {dispatched} rows could not be inserted")
            }
        }
    }
}

impl Error for ImporterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImporterError::Load(err) => err.source(),
            ImporterError::Config(source, _) => Some(source.as_ref()),
            ImporterError::Io(source, _) => Some(source),
            ImporterError::RowsFailed { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImporterError {
    fn from(err: std::io::Error) -> Self {
        ImporterError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<LoadError> for ImporterError {
    fn from(err: LoadError) -> Self {
        ImporterError::Load(err)
    }
}
