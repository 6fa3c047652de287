//! Streaming reader turning a delimited file into jobs.

use std::fs::File;
use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, LoadResult};
use crate::load_error;
use crate::types::{Header, Job, Row, SourcePosition};

/// Lazy, finite reader over a delimited source.
///
/// The first record becomes the [`Header`]; every later record is returned as a [`Job`] whose
/// field count must match it. Fields may be quoted as described in RFC 4180. Empty lines are
/// skipped. Any malformed record ends the scan with an [`ErrorKind::MalformedRow`] error.
#[derive(Debug)]
pub struct RowSource<R> {
    reader: csv::Reader<R>,
    header: Option<Header>,
    record: StringRecord,
    records_read: u64,
}

impl RowSource<File> {
    /// Opens the file at `path` for reading.
    pub fn open(path: &Path, delimiter: u8) -> LoadResult<Self> {
        info!(path = %path.display(), "opening source file");

        let file = File::open(path).map_err(|err| {
            load_error!(
                ErrorKind::SourceIoError,
                "Failed to open source file",
                format!("{}: {err}", path.display())
            )
            .with_source(err)
        })?;

        Ok(Self::from_reader(file, delimiter))
    }
}

impl<R: io::Read> RowSource<R> {
    /// Wraps any reader. The reader is buffered internally.
    pub fn from_reader(reader: R, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);

        Self {
            reader,
            header: None,
            record: StringRecord::new(),
            records_read: 0,
        }
    }

    /// Reads the header from the first record.
    ///
    /// Returns [`None`] if the source is empty. Calling it again returns the same header
    /// without reading.
    pub fn read_header(&mut self) -> LoadResult<Option<Header>> {
        if let Some(header) = &self.header {
            return Ok(Some(header.clone()));
        }

        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }

        let columns = self.record.iter().map(str::to_string).collect();
        let header = Header::new(columns)?;
        self.header = Some(header.clone());

        Ok(Some(header))
    }

    /// Returns the next data record as a job, or [`None`] at end of input.
    ///
    /// Reads the header first if that has not happened yet.
    pub fn next_job(&mut self) -> LoadResult<Option<Job>> {
        let arity = match self.read_header()? {
            Some(header) => header.arity(),
            None => return Ok(None),
        };

        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        self.records_read += 1;

        let position = SourcePosition {
            record: self.records_read,
            line: self
                .record
                .position()
                .map(|position| position.line())
                .unwrap_or_default(),
        };

        if self.record.len() != arity {
            bail!(
                ErrorKind::MalformedRow,
                "Source record field count does not match the header",
                format!(
                    "{position} has {} fields, expected {arity}",
                    self.record.len()
                )
            );
        }

        let row = Row::new(self.record.iter().map(str::to_string).collect());

        Ok(Some(Job::new(position, row)))
    }

    /// Number of data records returned so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(data: &str) -> RowSource<&[u8]> {
        RowSource::from_reader(data.as_bytes(), b',')
    }

    fn drain(source: &mut RowSource<&[u8]>) -> LoadResult<Vec<Job>> {
        let mut jobs = Vec::new();
        while let Some(job) = source.next_job()? {
            jobs.push(job);
        }
        Ok(jobs)
    }

    #[test]
    fn first_record_becomes_the_header() {
        let mut source = source("domain,rank\na.com,1\nb.com,2\n");

        let header = source.read_header().unwrap().unwrap();
        assert_eq!(header.columns(), &["domain", "rank"]);

        let jobs = drain(&mut source).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].row.values(), &["a.com", "1"]);
        assert_eq!(jobs[1].position, SourcePosition { record: 2, line: 3 });
    }

    #[test]
    fn next_job_reads_the_header_implicitly() {
        let mut source = source("domain,rank\na.com,1\n");

        let job = source.next_job().unwrap().unwrap();

        assert_eq!(job.position.record, 1);
        assert_eq!(source.read_header().unwrap().unwrap().arity(), 2);
    }

    #[test]
    fn empty_source_has_no_header() {
        let mut source = source("");

        assert_eq!(source.read_header().unwrap(), None);
        assert_eq!(source.next_job().unwrap(), None);
    }

    #[test]
    fn header_only_source_has_no_jobs() {
        let mut source = source("domain,rank\n");

        assert!(drain(&mut source).unwrap().is_empty());
    }

    #[test]
    fn quoted_fields_may_contain_delimiters_and_newlines() {
        let mut source = source("name,notes\n\"Doe, Jane\",\"line one\nline two\"\nnext,x\n");

        let jobs = drain(&mut source).unwrap();
        assert_eq!(jobs[0].row.values(), &["Doe, Jane", "line one\nline two"]);
        assert_eq!(jobs[1].position, SourcePosition { record: 2, line: 4 });
    }

    #[test]
    fn arity_mismatch_is_malformed() {
        let mut source = source("domain,rank\na.com,1\nb.com\n");

        assert!(source.next_job().unwrap().is_some());
        let err = source.next_job().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert!(err.detail().unwrap().contains("record 2"));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let data: &[u8] = b"domain,rank\n\xff\xfe,1\n";
        let mut source = RowSource::from_reader(data, b',');

        let err = source.next_job().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn honors_the_configured_delimiter() {
        let mut source = RowSource::from_reader("domain;rank\na.com;1\n".as_bytes(), b';');

        let job = source.next_job().unwrap().unwrap();
        assert_eq!(job.row.values(), &["a.com", "1"]);
    }

    #[test]
    fn duplicate_header_columns_are_rejected() {
        let mut source = source("domain,domain\na.com,b.com\n");

        let err = source.read_header().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
    }

    #[test]
    fn two_scans_yield_identical_rows() {
        let data = "domain,rank\na.com,1\nb.com,2\nc.com,3\n";

        let first = drain(&mut source(data)).unwrap();
        let second = drain(&mut source(data)).unwrap();

        assert_eq!(first, second);
    }
}
