//! View assembler.
//!
//! Reshapes aggregator output into plain ordered pairs for whatever draws
//! the charts. No view sums anything itself.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregator::{aggregate, region_by_period, series, GroupBy};
use crate::error::ViewError;
use crate::types::{Metric, RecordSet};

/// What the user picked.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub region: String,
    /// Period for the distribution view; latest in the data when `None`.
    pub period: Option<i32>,
    /// Metric for the time-series view and the forecast.
    pub metric: Metric,
    /// Metric for the trend-by-period view.
    pub secondary_metric: Metric,
    pub horizon: u32,
}

impl Selection {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            period: None,
            metric: Metric::NewCases,
            secondary_metric: Metric::NewDeaths,
            horizon: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Views {
    /// Selected region, `(period, value)` of the primary metric.
    pub time_series: Vec<(i32, f64)>,
    /// Period the distribution was taken for, if the data has any.
    pub distribution_period: Option<i32>,
    /// `(region, value)` of the primary metric for one period.
    pub distribution: Vec<(String, f64)>,
    /// Selected region, `(period, value)` of the secondary metric.
    pub trend_by_period: Vec<(i32, f64)>,
}

/// Per-region totals of `metric` within one period, ordered by region.
pub fn distribution(
    records: &RecordSet,
    period: i32,
    metric: Metric,
) -> Result<Vec<(String, f64)>, ViewError> {
    if !records.has_metric(metric) {
        return Err(ViewError::MetricUnavailable(metric));
    }
    aggregate(
        records.records().iter().filter(|r| r.period() == period),
        GroupBy::RegionPeriod,
    )
    .into_iter()
    .map(|a| {
        let v = a.value(metric).ok_or(ViewError::MetricUnavailable(metric))?;
        Ok((a.region.unwrap_or_default(), v))
    })
    .collect()
}

/// Build all three views for `selection`.
pub fn views(records: &RecordSet, selection: &Selection) -> Result<Views, ViewError> {
    for metric in [selection.metric, selection.secondary_metric] {
        if !records.has_metric(metric) {
            return Err(ViewError::MetricUnavailable(metric));
        }
    }

    let by_period = region_by_period(records.records(), &selection.region);
    let time_series = series(&by_period, selection.metric)?;
    let trend_by_period = series(&by_period, selection.secondary_metric)?;

    let distribution_period = selection
        .period
        .or_else(|| records.periods().last().copied());
    let distribution = match distribution_period {
        Some(p) => distribution(records, p, selection.metric)?,
        None => Vec::new(),
    };

    Ok(Views {
        time_series,
        distribution_period,
        distribution,
        trend_by_period,
    })
}

/// Headline numbers for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub total_new_cases: f64,
    pub total_new_deaths: f64,
    pub total_cases_recovered: Option<f64>,
    pub record_count: usize,
    pub periods: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// `None` when the region has no records.
pub fn region_summary(records: &RecordSet, region: &str) -> Option<RegionSummary> {
    let rows = records.for_region(region);
    let first_date = rows.first()?.date();
    let last_date = rows.last()?.date();
    let total = aggregate(rows.iter().copied(), GroupBy::Region).pop()?;
    let periods = region_by_period(records.records(), region).len();

    Some(RegionSummary {
        region: region.to_string(),
        total_new_cases: total.total_new_cases,
        total_new_deaths: total.total_new_deaths,
        total_cases_recovered: total.total_cases_recovered,
        record_count: total.record_count,
        periods,
        first_date,
        last_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Schema;
    use crate::loader::load_from_reader;

    const SAMPLE: &str = include_str!("../fixtures/covid_sample.csv");

    fn sample() -> RecordSet {
        load_from_reader(SAMPLE.as_bytes(), &Schema::default())
            .unwrap()
            .records
    }

    #[test]
    fn views_for_selangor() {
        let records = sample();
        let v = views(&records, &Selection::new("Selangor")).unwrap();
        assert_eq!(
            v.time_series,
            vec![(2020, 40.0), (2021, 400.0), (2022, 150.0)]
        );
        assert_eq!(v.trend_by_period, vec![(2020, 1.0), (2021, 7.0), (2022, 1.0)]);
        assert_eq!(v.distribution_period, Some(2022));
        assert_eq!(
            v.distribution,
            vec![("Johor".to_string(), 1270.0), ("Selangor".to_string(), 150.0)]
        );
    }

    #[test]
    fn distribution_sums_to_period_total() {
        let records = sample();
        let totals = aggregate(records.records(), GroupBy::Period);
        for metric in [Metric::NewCases, Metric::NewDeaths, Metric::CasesRecovered] {
            for t in &totals {
                let period = t.period.unwrap();
                let dist = distribution(&records, period, metric).unwrap();
                let sum: f64 = dist.iter().map(|(_, v)| v).sum();
                assert!((sum - t.value(metric).unwrap()).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn explicit_period_and_metrics() {
        let records = sample();
        let selection = Selection {
            period: Some(2020),
            metric: Metric::CasesRecovered,
            ..Selection::new("Johor")
        };
        let v = views(&records, &selection).unwrap();
        assert_eq!(v.time_series, vec![(2020, 1.0), (2021, 30.0), (2022, 955.0)]);
        assert_eq!(
            v.distribution,
            vec![("Johor".to_string(), 1.0), ("Selangor".to_string(), 22.0)]
        );
    }

    #[test]
    fn unknown_region_gives_empty_series() {
        let v = views(&sample(), &Selection::new("Penang")).unwrap();
        assert!(v.time_series.is_empty());
        assert!(v.trend_by_period.is_empty());
        assert_eq!(v.distribution.len(), 2);
    }

    #[test]
    fn missing_metric_is_reported() {
        let records = load_from_reader(
            "state,date,cases_new,deaths_new\nJohor,2021-01-01,1,0\n".as_bytes(),
            &Schema::default(),
        )
        .unwrap()
        .records;
        let selection = Selection {
            secondary_metric: Metric::CasesRecovered,
            ..Selection::new("Johor")
        };
        assert_eq!(
            views(&records, &selection),
            Err(ViewError::MetricUnavailable(Metric::CasesRecovered))
        );
    }

    #[test]
    fn summary_for_region() {
        let s = region_summary(&sample(), "Johor").unwrap();
        assert_eq!(s.total_new_cases, 1315.0);
        assert_eq!(s.total_new_deaths, 5.0);
        assert_eq!(s.total_cases_recovered, Some(986.0));
        assert_eq!(s.record_count, 5);
        assert_eq!(s.periods, 3);
        assert_eq!(s.first_date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert_eq!(s.last_date, NaiveDate::from_ymd_opt(2022, 9, 1).unwrap());
        assert!(region_summary(&sample(), "Penang").is_none());
    }
}
