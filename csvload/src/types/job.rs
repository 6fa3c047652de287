use std::fmt;

/// Field values of one data record, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Location of a record in the source file.
///
/// `record` counts data records from 1, excluding the header. `line` is the 1-based line on
/// which the record starts, which differs from `record + 1` once quoted fields span lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub record: u64,
    pub line: u64,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} (line {})", self.record, self.line)
    }
}

/// One row's pending insert, tracked from dispatch until it is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub position: SourcePosition,
    pub row: Row,
}

impl Job {
    pub fn new(position: SourcePosition, row: Row) -> Self {
        Self { position, row }
    }
}
