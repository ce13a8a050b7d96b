//! Error types for the ingest/aggregate/forecast pipeline.
//!
//! Errors come in two weights:
//! - dataset-level ([`IngestionError`]) aborts a load,
//! - row-level ([`RowError`]) skips one row and is tallied in the
//!   rejection summary while the load carries on.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Metric;

/// Fatal problems with the tabular source itself.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source is empty (no header row)")]
    Empty,

    #[error("malformed source: {0}")]
    Malformed(#[from] csv::Error),

    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Why a metric cell could not be turned into a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricProblem {
    Missing,
    NotNumeric,
    Negative,
}

impl fmt::Display for MetricProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricProblem::Missing => "missing value",
            MetricProblem::NotNumeric => "not numeric",
            MetricProblem::Negative => "negative value",
        };
        f.write_str(s)
    }
}

/// A single input row that was excluded during normalization.
///
/// `line` is the 1-based line in the source, header included.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("line {line}: invalid date '{value}' (expected format {format})")]
    InvalidDate {
        line: u64,
        value: String,
        format: String,
    },

    #[error("line {line}: invalid {column} '{value}': {problem}")]
    InvalidMetric {
        line: u64,
        column: String,
        value: String,
        problem: MetricProblem,
    },

    #[error("line {line}: empty region")]
    MissingRegion { line: u64 },

    #[error("line {line}: unreadable row: {message}")]
    Malformed { line: u64, message: String },
}

/// Coarse category of a [`RowError`], used as the tally key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectionKind {
    InvalidDate,
    InvalidMetric,
    MissingRegion,
    Malformed,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionKind::InvalidDate => "InvalidDate",
            RejectionKind::InvalidMetric => "InvalidMetric",
            RejectionKind::MissingRegion => "MissingRegion",
            RejectionKind::Malformed => "Malformed",
        };
        f.write_str(s)
    }
}

impl RowError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            RowError::InvalidDate { .. } => RejectionKind::InvalidDate,
            RowError::InvalidMetric { .. } => RejectionKind::InvalidMetric,
            RowError::MissingRegion { .. } => RejectionKind::MissingRegion,
            RowError::Malformed { .. } => RejectionKind::Malformed,
        }
    }

    pub fn line(&self) -> u64 {
        match self {
            RowError::InvalidDate { line, .. }
            | RowError::InvalidMetric { line, .. }
            | RowError::MissingRegion { line }
            | RowError::Malformed { line, .. } => *line,
        }
    }
}

/// Forecast preconditions that were not met.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("insufficient data: need at least 2 distinct periods, got {distinct_periods}")]
    InsufficientData { distinct_periods: usize },

    #[error("period {0} appears more than once; aggregate the series first")]
    DuplicatePeriod(i32),

    #[error("forecast horizon must be at least 1")]
    InvalidHorizon,

    #[error("horizon {horizon} runs past the last representable period after {last}")]
    HorizonOutOfRange { last: i32, horizon: u32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("metric '{0}' is not available in this dataset")]
    MetricUnavailable(Metric),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_are_named() {
        let err = IngestionError::MissingColumns(vec!["cases_new".into(), "deaths_new".into()]);
        assert_eq!(
            err.to_string(),
            "missing required column(s): cases_new, deaths_new"
        );
    }

    #[test]
    fn row_error_kind_and_line() {
        let err = RowError::InvalidMetric {
            line: 7,
            column: "cases_new".into(),
            value: "abc".into(),
            problem: MetricProblem::NotNumeric,
        };
        assert_eq!(err.kind(), RejectionKind::InvalidMetric);
        assert_eq!(err.line(), 7);
        assert!(err.to_string().contains("not numeric"));
    }
}
