use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ForecastError, ViewError};
use crate::forecast::{forecast, ForecastResult, TrendModel};
use crate::normalizer::RejectionSummary;
use crate::types::{
    Bucket, ForecastRow, Metric, PeriodValueRow, Record, RecordRow, RecordSet, RegionValueRow,
    RejectionRow,
};
use crate::util::format_number;
use crate::views::{region_summary, views, RegionSummary, Selection, Views};

/// Everything the presentation side needs for one selection.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub selection: Selection,
    pub bucket: Bucket,
    pub summary: Option<RegionSummary>,
    pub views: Views,
    /// An error here means "no forecast panel", not a failed run.
    pub forecast: Result<ForecastResult, ForecastError>,
    pub filtered: Vec<Record>,
}

/// Re-run the aggregate/forecast/view steps for one selection over the
/// loaded snapshot.
pub fn build_dashboard(records: &RecordSet, selection: &Selection) -> Result<Dashboard, ViewError> {
    let views = views(records, selection)?;
    let forecast = forecast(&views.time_series, selection.horizon);
    let filtered = records
        .for_region(&selection.region)
        .into_iter()
        .cloned()
        .collect();

    Ok(Dashboard {
        selection: selection.clone(),
        bucket: records.bucket(),
        summary: region_summary(records, &selection.region),
        views,
        forecast,
        filtered,
    })
}

pub fn period_rows(bucket: Bucket, points: &[(i32, f64)]) -> Vec<PeriodValueRow> {
    points
        .iter()
        .map(|&(p, v)| PeriodValueRow {
            period: bucket.label(p),
            value: format_number(v, 0),
        })
        .collect()
}

pub fn distribution_rows(points: &[(String, f64)]) -> Vec<RegionValueRow> {
    let total: f64 = points.iter().map(|(_, v)| v).sum();
    let mut rows: Vec<(f64, RegionValueRow)> = points
        .iter()
        .map(|(region, v)| {
            let share = if total > 0.0 { v / total * 100.0 } else { 0.0 };
            let row = RegionValueRow {
                region: region.clone(),
                value: format_number(*v, 0),
                share_pct: format_number(share, 2),
            };
            (*v, row)
        })
        .collect();
    // Largest slice first, region order kept among ties.
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));
    rows.into_iter().map(|(_, row)| row).collect()
}

pub fn forecast_rows(bucket: Bucket, result: &ForecastResult) -> Vec<ForecastRow> {
    let row = |&(p, v): &(i32, f64), kind: &str| ForecastRow {
        period: bucket.label(p),
        value: format_number(v, 2),
        kind: kind.to_string(),
    };
    result
        .historical
        .iter()
        .map(|pt| row(pt, "historical"))
        .chain(result.projected.iter().map(|pt| row(pt, "projected")))
        .collect()
}

pub fn record_rows(records: &[Record]) -> Vec<RecordRow> {
    records
        .iter()
        .map(|r| RecordRow {
            date: r.date().to_string(),
            region: r.region().to_string(),
            new_cases: format_number(r.new_cases(), 0),
            new_deaths: format_number(r.new_deaths(), 0),
            recovered: r
                .cases_recovered()
                .map(|v| format_number(v, 0))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn rejection_rows(summary: &RejectionSummary) -> Vec<RejectionRow> {
    summary
        .counts_by_kind()
        .into_iter()
        .map(|(kind, rows)| RejectionRow {
            reason: kind.to_string(),
            rows,
        })
        .collect()
}

/// Contents of `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub region: String,
    pub metric: Metric,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub rejections_by_kind: BTreeMap<String, usize>,
    pub summary: Option<RegionSummary>,
    pub trend: Option<TrendModel>,
    pub projected: Vec<(i32, f64)>,
    pub forecast_unavailable: Option<String>,
}

pub fn generate_summary(dashboard: &Dashboard, rejections: &RejectionSummary) -> SummaryStats {
    let (trend, projected, forecast_unavailable) = match &dashboard.forecast {
        Ok(f) => (Some(f.model), f.projected.clone(), None),
        Err(e) => (None, Vec::new(), Some(e.to_string())),
    };
    SummaryStats {
        region: dashboard.selection.region.clone(),
        metric: dashboard.selection.metric,
        rows_read: rejections.total_rows,
        rows_rejected: rejections.rejected(),
        rejections_by_kind: rejections
            .counts_by_kind()
            .into_iter()
            .map(|(k, n)| (k.to_string(), n))
            .collect(),
        summary: dashboard.summary.clone(),
        trend,
        projected,
        forecast_unavailable,
    }
}
