//! Field normalizer.
//!
//! Turns raw rows into [`Record`]s one at a time. Rules, in order:
//! 1. parse the date with the schema's single format,
//! 2. derive the period from that date,
//! 3. coerce the metric cells to non-negative numbers,
//! 4. trim the region.
//!
//! A row failing any rule is skipped and its reason kept in a
//! [`RejectionSummary`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::Schema;
use crate::error::{RejectionKind, RowError};
use crate::loader::RawRecord;
use crate::types::Record;
use crate::util::{parse_count, parse_date};

/// Validate one raw row.
pub fn normalize(raw: &RawRecord, schema: &Schema, has_recovered: bool) -> Result<Record, RowError> {
    let line = raw.line();

    let date_cell = raw.get(&schema.date_column);
    let date = parse_date(date_cell, &schema.date_format).ok_or_else(|| RowError::InvalidDate {
        line,
        value: date_cell.unwrap_or_default().to_string(),
        format: schema.date_format.clone(),
    })?;

    let metric = |column: &str| {
        let cell = raw.get(column);
        parse_count(cell).map_err(|problem| RowError::InvalidMetric {
            line,
            column: column.to_string(),
            value: cell.unwrap_or_default().to_string(),
            problem,
        })
    };
    let new_cases = metric(&schema.new_cases_column)?;
    let new_deaths = metric(&schema.new_deaths_column)?;
    let cases_recovered = if has_recovered {
        Some(metric(&schema.recovered_column)?)
    } else {
        None
    };

    let region = raw.get(&schema.region_column).map(str::trim).unwrap_or("");
    if region.is_empty() {
        return Err(RowError::MissingRegion { line });
    }

    // Record::new derives the period from the date via the bucket.
    Ok(Record::new(
        region,
        date,
        schema.bucket,
        new_cases,
        new_deaths,
        cases_recovered,
    ))
}

/// Counts and reasons for rows excluded during normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RejectionSummary {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejections: Vec<RowError>,
}

impl RejectionSummary {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    pub fn counts_by_kind(&self) -> BTreeMap<RejectionKind, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.rejections {
            *counts.entry(r.kind()).or_insert(0) += 1;
        }
        counts
    }

    fn reject(&mut self, err: RowError) {
        debug!("Rejected {}", err);
        self.rejections.push(err);
    }
}

/// Streaming adapter: yields only valid records, tallying the rest.
pub struct Normalizer<'a, I> {
    rows: I,
    schema: &'a Schema,
    has_recovered: bool,
    summary: RejectionSummary,
}

impl<'a, I> Normalizer<'a, I>
where
    I: Iterator<Item = Result<RawRecord, RowError>>,
{
    pub fn new(rows: I, schema: &'a Schema, has_recovered: bool) -> Self {
        Self {
            rows,
            schema,
            has_recovered,
            summary: RejectionSummary::default(),
        }
    }

    pub fn into_summary(self) -> RejectionSummary {
        self.summary
    }
}

impl<'a, I> Iterator for Normalizer<'a, I>
where
    I: Iterator<Item = Result<RawRecord, RowError>>,
{
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let row = self.rows.next()?;
            self.summary.total_rows += 1;
            let result = row.and_then(|raw| normalize(&raw, self.schema, self.has_recovered));
            match result {
                Ok(record) => {
                    self.summary.accepted += 1;
                    return Some(record);
                }
                Err(e) => self.summary.reject(e),
            }
        }
    }
}
