use std::collections::HashSet;
use std::fmt;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};

/// Ordered column names taken from the first record of the source file.
///
/// A [`Header`] is validated on construction and never changes afterwards: every later record
/// must have exactly [`Header::arity`] fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Builds a header, rejecting empty, blank, or duplicate column names.
    pub fn new(columns: Vec<String>) -> LoadResult<Header> {
        if columns.is_empty() {
            bail!(ErrorKind::MalformedRow, "Header record has no columns");
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                bail!(
                    ErrorKind::MalformedRow,
                    "Header column name is empty",
                    format!("column {} of the header is blank", index + 1)
                );
            }

            if !seen.insert(column.as_str()) {
                bail!(
                    ErrorKind::MalformedRow,
                    "Header column name is duplicated",
                    format!("column '{column}' appears more than once")
                );
            }
        }

        Ok(Header { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.columns.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn accepts_unique_columns() {
        let header = Header::new(columns(&["domain", "rank"])).unwrap();

        assert_eq!(header.arity(), 2);
        assert_eq!(header.columns(), &["domain", "rank"]);
    }

    #[test]
    fn rejects_empty_header() {
        let err = Header::new(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn rejects_blank_column() {
        let err = Header::new(columns(&["domain", " "])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn rejects_duplicate_column() {
        let err = Header::new(columns(&["domain", "rank", "domain"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert!(err.detail().unwrap().contains("domain"));
    }
}
