//! Dead-letter report written after a load.
//!
//! Permanently failed rows are written back out as a delimited file starting with the source
//! header, so the file can be fixed up and loaded again as is.

use std::fs::File;
use std::io;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::error::{ErrorKind, LoadResult};
use crate::load_error;
use crate::types::{DeadLetter, Header};

/// Writes `dead_letters` with `header` as the first record.
pub fn write_dead_letters<W: io::Write>(
    writer: W,
    header: &Header,
    dead_letters: &[DeadLetter],
    delimiter: u8,
) -> LoadResult<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    writer.write_record(header.columns())?;
    for dead_letter in dead_letters {
        writer.write_record(&dead_letter.values)?;
    }
    writer.flush()?;

    Ok(())
}

/// Creates or truncates the file at `path` and writes the dead letters into it.
pub fn write_dead_letters_file(
    path: &Path,
    header: &Header,
    dead_letters: &[DeadLetter],
    delimiter: u8,
) -> LoadResult<()> {
    let file = File::create(path).map_err(|err| {
        load_error!(
            ErrorKind::IoError,
            "Failed to create dead-letter file",
            format!("{}: {err}", path.display())
        )
        .with_source(err)
    })?;

    write_dead_letters(file, header, dead_letters, delimiter)?;
    info!(
        path = %path.display(),
        rows = dead_letters.len(),
        "wrote dead-letter file"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::source::RowSource;
    use crate::types::{Job, Row, SourcePosition};

    fn dead_letter(record: u64, values: &[&str]) -> DeadLetter {
        let job = Job::new(
            SourcePosition {
                record,
                line: record + 1,
            },
            Row::new(values.iter().map(|value| value.to_string()).collect()),
        );
        DeadLetter::new(
            job,
            3,
            LoadError::from((ErrorKind::DestinationQueryFailed, "failed")),
        )
    }

    #[test]
    fn written_report_can_be_read_back_as_a_source() {
        let header = Header::new(vec!["domain".to_string(), "notes".to_string()]).unwrap();
        let dead_letters = vec![
            dead_letter(2, &["b.com", "has, comma"]),
            dead_letter(5, &["e.com", "plain"]),
        ];

        let mut buffer = Vec::new();
        write_dead_letters(&mut buffer, &header, &dead_letters, b',').unwrap();

        let mut source = RowSource::from_reader(buffer.as_slice(), b',');
        assert_eq!(source.read_header().unwrap(), Some(header));

        let first = source.next_job().unwrap().unwrap();
        assert_eq!(first.row.values(), &["b.com", "has, comma"]);
        let second = source.next_job().unwrap().unwrap();
        assert_eq!(second.row.values(), &["e.com", "plain"]);
        assert_eq!(source.next_job().unwrap(), None);
    }

    #[test]
    fn empty_report_contains_only_the_header() {
        let header = Header::new(vec!["domain".to_string()]).unwrap();

        let mut buffer = Vec::new();
        write_dead_letters(&mut buffer, &header, &[], b';').unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "domain\n");
    }
}
