use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One of the count columns carried by every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NewCases,
    NewDeaths,
    CasesRecovered,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Metric::NewCases => "new_cases",
            Metric::NewDeaths => "new_deaths",
            Metric::CasesRecovered => "cases_recovered",
        };
        f.write_str(s)
    }
}

/// How a calendar date is folded into an integer period.
///
/// Both variants give a contiguous numeric axis so consecutive buckets differ
/// by exactly one; the forecaster relies on this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    #[default]
    Year,
    /// `year * 12 + (month - 1)`
    Month,
}

impl Bucket {
    pub fn period_of(self, date: NaiveDate) -> i32 {
        match self {
            Bucket::Year => date.year(),
            Bucket::Month => date.year() * 12 + date.month0() as i32,
        }
    }

    /// Human-readable label for a period (`2021`, `2021-03`).
    pub fn label(self, period: i32) -> String {
        match self {
            Bucket::Year => period.to_string(),
            Bucket::Month => format!(
                "{:04}-{:02}",
                period.div_euclid(12),
                period.rem_euclid(12) + 1
            ),
        }
    }
}

/// A validated input row.
///
/// Only built inside the crate, from cells the normalizer has already
/// checked; `period` is always derived from `date` through the bucket,
/// never read from a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    region: String,
    date: NaiveDate,
    period: i32,
    new_cases: f64,
    new_deaths: f64,
    cases_recovered: Option<f64>,
}

impl Record {
    pub(crate) fn new(
        region: impl Into<String>,
        date: NaiveDate,
        bucket: Bucket,
        new_cases: f64,
        new_deaths: f64,
        cases_recovered: Option<f64>,
    ) -> Self {
        debug_assert!(
            [Some(new_cases), Some(new_deaths), cases_recovered]
                .into_iter()
                .flatten()
                .all(|v| v.is_finite() && v >= 0.0),
            "record metrics must be finite and non-negative"
        );
        Self {
            region: region.into(),
            date,
            period: bucket.period_of(date),
            new_cases,
            new_deaths,
            cases_recovered,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn period(&self) -> i32 {
        self.period
    }

    pub fn new_cases(&self) -> f64 {
        self.new_cases
    }

    pub fn new_deaths(&self) -> f64 {
        self.new_deaths
    }

    pub fn cases_recovered(&self) -> Option<f64> {
        self.cases_recovered
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::NewCases => Some(self.new_cases),
            Metric::NewDeaths => Some(self.new_deaths),
            Metric::CasesRecovered => self.cases_recovered,
        }
    }
}

/// The validated records of one load. Treated as an immutable snapshot;
/// a reload builds a new set.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    bucket: Bucket,
    has_recovered: bool,
}

impl RecordSet {
    pub fn new(records: Vec<Record>, bucket: Bucket, has_recovered: bool) -> Self {
        Self {
            records,
            bucket,
            has_recovered,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        metric != Metric::CasesRecovered || self.has_recovered
    }

    /// Distinct regions, sorted.
    pub fn regions(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.records.iter().map(|r| r.region.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct periods, ascending.
    pub fn periods(&self) -> Vec<i32> {
        let set: BTreeSet<i32> = self.records.iter().map(|r| r.period).collect();
        set.into_iter().collect()
    }

    /// Records of one region ordered by date (stable for equal dates).
    pub fn for_region(&self, region: &str) -> Vec<&Record> {
        let mut out: Vec<&Record> = self.records.iter().filter(|r| r.region == region).collect();
        out.sort_by_key(|r| r.date);
        out
    }
}

/// Summed metrics for one grouping key. `region == None` is the cross-region
/// (global) key, `period == None` means all periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub region: Option<String>,
    pub period: Option<i32>,
    pub total_new_cases: f64,
    pub total_new_deaths: f64,
    pub total_cases_recovered: Option<f64>,
    pub record_count: usize,
}

impl Aggregate {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::NewCases => Some(self.total_new_cases),
            Metric::NewDeaths => Some(self.total_new_deaths),
            Metric::CasesRecovered => self.total_cases_recovered,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PeriodValueRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionValueRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "SharePct")]
    #[tabled(rename = "SharePct")]
    pub share_pct: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForecastRow {
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Kind")]
    #[tabled(rename = "Kind")]
    pub kind: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RecordRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "NewCases")]
    pub new_cases: String,
    #[tabled(rename = "NewDeaths")]
    pub new_deaths: String,
    #[tabled(rename = "Recovered")]
    pub recovered: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RejectionRow {
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn yearly_period_is_calendar_year() {
        assert_eq!(Bucket::Year.period_of(date(2021, 12, 31)), 2021);
        assert_eq!(Bucket::Year.label(2021), "2021");
    }

    #[test]
    fn monthly_periods_are_contiguous() {
        let dec = Bucket::Month.period_of(date(2021, 12, 5));
        let jan = Bucket::Month.period_of(date(2022, 1, 5));
        assert_eq!(jan - dec, 1);
        assert_eq!(Bucket::Month.label(jan), "2022-01");
    }

    #[test]
    fn record_period_follows_date() {
        let r = Record::new("Johor", date(2020, 3, 1), Bucket::Year, 5.0, 0.0, None);
        assert_eq!(r.period(), 2020);
        assert_eq!(r.value(Metric::CasesRecovered), None);
        assert_eq!(r.value(Metric::NewCases), Some(5.0));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "finite and non-negative")]
    fn record_rejects_negative_metric() {
        Record::new("Johor", date(2020, 3, 1), Bucket::Year, -1.0, 0.0, None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "finite and non-negative")]
    fn record_rejects_nan_recovered() {
        Record::new("Johor", date(2020, 3, 1), Bucket::Year, 1.0, 0.0, Some(f64::NAN));
    }

    #[test]
    fn record_set_regions_and_filter() {
        let set = RecordSet::new(
            vec![
                Record::new("Selangor", date(2021, 2, 1), Bucket::Year, 2.0, 0.0, None),
                Record::new("Johor", date(2021, 1, 1), Bucket::Year, 1.0, 0.0, None),
                Record::new("Selangor", date(2021, 1, 1), Bucket::Year, 3.0, 0.0, None),
            ],
            Bucket::Year,
            false,
        );
        assert_eq!(set.regions(), vec!["Johor", "Selangor"]);
        assert_eq!(set.periods(), vec![2021]);
        let sel = set.for_region("Selangor");
        assert_eq!(sel.len(), 2);
        assert_eq!(sel[0].date(), date(2021, 1, 1));
        assert!(!set.has_metric(Metric::CasesRecovered));
        assert!(set.has_metric(Metric::NewDeaths));
    }
}
