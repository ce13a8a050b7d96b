//! Record loader.
//!
//! Opens a CSV source, checks the header against the declared schema once,
//! then hands out rows lazily as [`RawRecord`]s. Cell contents are not
//! looked at here; that is the normalizer's job.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use tracing::{debug, info, warn};

use crate::config::Schema;
use crate::error::{IngestionError, RowError};
use crate::normalizer::{Normalizer, RejectionSummary};
use crate::types::RecordSet;

/// One input row: the header's column names paired with this row's cells.
#[derive(Debug, Clone)]
pub struct RawRecord {
    line: u64,
    columns: Rc<[String]>,
    values: StringRecord,
}

impl RawRecord {
    pub fn new(line: u64, columns: Rc<[String]>, values: StringRecord) -> Self {
        Self {
            line,
            columns,
            values,
        }
    }

    /// 1-based source line, header included.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Cell for `column`, or `None` if the column is unknown or the row is
    /// shorter than the header.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }
}

/// Lazy, single-pass sequence of raw rows.
pub struct RawRecords<R: Read> {
    rows: StringRecordsIntoIter<R>,
    columns: Rc<[String]>,
    next_line: u64,
}

impl<R: Read> RawRecords<R> {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl<R: Read> Iterator for RawRecords<R> {
    type Item = Result<RawRecord, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.rows.next()?;
        let fallback_line = self.next_line;
        self.next_line += 1;
        Some(match result {
            Ok(values) => {
                let line = values
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                self.next_line = line + 1;
                Ok(RawRecord::new(line, Rc::clone(&self.columns), values))
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                Err(RowError::Malformed {
                    line,
                    message: e.to_string(),
                })
            }
        })
    }
}

/// Open a CSV file and validate its header.
pub fn open(path: &Path, schema: &Schema) -> Result<RawRecords<File>, IngestionError> {
    let file = File::open(path).map_err(|source| IngestionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_reader(file, schema)
}

/// Wrap any reader as a raw-record source, validating its header.
pub fn from_reader<R: Read>(rdr: R, schema: &Schema) -> Result<RawRecords<R>, IngestionError> {
    schema.validate()?;

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(rdr);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestionError::Empty);
    }

    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let missing: Vec<String> = schema
        .required_columns()
        .iter()
        .filter(|name| !columns.iter().any(|c| c == *name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngestionError::MissingColumns(missing));
    }
    debug!("Header columns: {:?}", columns);

    Ok(RawRecords {
        rows: reader.into_records(),
        columns: columns.into(),
        next_line: 2,
    })
}

/// Result of a full load: the valid records plus what was thrown out.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub records: RecordSet,
    pub rejections: RejectionSummary,
}

pub fn load(path: &Path, schema: &Schema) -> Result<LoadOutcome, IngestionError> {
    info!("Loading {}", path.display());
    let raw = open(path, schema)?;
    Ok(collect(raw, schema))
}

pub fn load_from_reader<R: Read>(rdr: R, schema: &Schema) -> Result<LoadOutcome, IngestionError> {
    let raw = from_reader(rdr, schema)?;
    Ok(collect(raw, schema))
}

fn collect<R: Read>(raw: RawRecords<R>, schema: &Schema) -> LoadOutcome {
    let has_recovered = raw.has_column(&schema.recovered_column);
    let mut normalizer = Normalizer::new(raw, schema, has_recovered);
    let records: Vec<_> = normalizer.by_ref().collect();
    let rejections = normalizer.into_summary();

    info!(
        "Loaded {} rows ({} accepted, {} rejected)",
        rejections.total_rows,
        rejections.accepted,
        rejections.rejected()
    );
    if rejections.rejected() > 0 {
        for (kind, count) in rejections.counts_by_kind() {
            warn!("{count} row(s) rejected: {kind}");
        }
    }

    LoadOutcome {
        records: RecordSet::new(records, schema.bucket, has_recovered),
        rejections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = include_str!("../fixtures/covid_sample.csv");

    #[test]
    fn raw_records_pair_cells_with_columns() {
        let src = "date,state,cases_new,deaths_new\n2021-01-01, Johor ,5,0\n";
        let mut rows = from_reader(src.as_bytes(), &Schema::default()).unwrap();
        let row = rows.next().unwrap().unwrap();
        assert_eq!(row.line(), 2);
        assert_eq!(row.get("state"), Some(" Johor "));
        assert_eq!(row.get("date"), Some("2021-01-01"));
        assert_eq!(row.get("nope"), None);
        assert!(rows.next().is_none());
    }

    #[test]
    fn missing_columns_are_fatal_and_named() {
        let src = "date,state,cases_new\n2021-01-01,Johor,5\n";
        match from_reader(src.as_bytes(), &Schema::default()) {
            Err(IngestionError::MissingColumns(cols)) => assert_eq!(cols, vec!["deaths_new"]),
            other => panic!("expected MissingColumns, got {:?}", other.err()),
        }
    }

    #[test]
    fn empty_source_is_fatal() {
        assert!(matches!(
            from_reader("".as_bytes(), &Schema::default()),
            Err(IngestionError::Empty)
        ));
    }

    #[test]
    fn header_only_source_loads_nothing() {
        let out = load_from_reader("date,state,cases_new,deaths_new\n".as_bytes(), &Schema::default())
            .unwrap();
        assert!(out.records.is_empty());
        assert_eq!(out.rejections.total_rows, 0);
    }

    #[test]
    fn undecodable_row_is_skipped_and_load_continues() {
        let src: &[u8] = b"date,state,cases_new,deaths_new\n\
2021-01-01,Jo\xffhor,1,0\n\
2021-01-02,Johor,2,0\n";
        let out = load_from_reader(src, &Schema::default()).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records.records()[0].new_cases(), 2.0);
        assert_eq!(out.rejections.total_rows, 2);
        assert_eq!(out.rejections.rejected(), 1);
        assert!(matches!(
            out.rejections.rejections[0],
            RowError::Malformed { line: 2, .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Path::new("/definitely/not/here.csv"), &Schema::default()).unwrap_err();
        assert!(matches!(err, IngestionError::Io { .. }));
    }

    #[test]
    fn loads_fixture_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(SAMPLE.as_bytes()).unwrap();
        let out = load(tmp.path(), &Schema::default()).unwrap();

        assert_eq!(out.rejections.total_rows, 12);
        assert_eq!(out.rejections.rejected(), 2);
        assert_eq!(out.records.len(), 10);
        assert!(out.records.has_metric(crate::types::Metric::CasesRecovered));
        assert_eq!(out.records.regions(), vec!["Johor", "Selangor"]);
    }
}
