//! Linear trend forecaster.
//!
//! Fits `value = slope * period + intercept` by ordinary least squares on
//! an aggregated `(period, value)` series and extends it `horizon` periods
//! past the last observed one.
//!
//! Projected values are not clamped: a falling trend can go below zero.
//! That is a known limitation of a straight-line model and is left visible
//! to the caller rather than hidden.
//!
//! Nothing is cached between calls; every request refits.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::error::ForecastError;

/// A fitted straight line over one region's metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination over the fitted points. `1.0` when the
    /// values have no variance (a flat line fits exactly).
    pub r_squared: f64,
}

impl TrendModel {
    /// Closed-form OLS fit. Periods must be distinct; at least two needed.
    pub fn fit(points: &[(i32, f64)]) -> Result<Self, ForecastError> {
        let mut seen = HashSet::new();
        for &(p, _) in points {
            if !seen.insert(p) {
                return Err(ForecastError::DuplicatePeriod(p));
            }
        }
        if seen.len() < 2 {
            return Err(ForecastError::InsufficientData {
                distinct_periods: seen.len(),
            });
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|&(p, _)| p as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|&(_, v)| v).sum::<f64>() / n;

        // Centered sums keep precision with large period values (years).
        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for &(p, v) in points {
            let dx = p as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (v - mean_y);
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let ss_tot: f64 = points.iter().map(|&(_, v)| (v - mean_y).powi(2)).sum();
        let ss_res: f64 = points
            .iter()
            .map(|&(p, v)| (v - (slope * p as f64 + intercept)).powi(2))
            .sum();
        let r_squared = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

        Ok(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    pub fn predict(&self, period: i32) -> f64 {
        self.slope * period as f64 + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    /// Input series, sorted by period.
    pub historical: Vec<(i32, f64)>,
    /// `max(period)+1 ..= max(period)+horizon`, no gaps.
    pub projected: Vec<(i32, f64)>,
    pub model: TrendModel,
}

/// Fit a trend to `series` and project `horizon` further periods.
pub fn forecast(series: &[(i32, f64)], horizon: u32) -> Result<ForecastResult, ForecastError> {
    if horizon == 0 {
        return Err(ForecastError::InvalidHorizon);
    }
    let model = TrendModel::fit(series)?;

    let mut historical = series.to_vec();
    historical.sort_by_key(|&(p, _)| p);
    // fit() guarantees at least two points.
    let last = historical.last().map(|&(p, _)| p).unwrap_or_default();
    let steps = i32::try_from(horizon)
        .ok()
        .filter(|&h| last.checked_add(h).is_some())
        .ok_or(ForecastError::HorizonOutOfRange { last, horizon })?;

    let projected = (1..=steps)
        .map(|step| {
            let p = last + step;
            (p, model.predict(p))
        })
        .collect();

    debug!(
        "Trend fit: slope={:.4} intercept={:.4} r2={:.4}",
        model.slope, model.intercept, model.r_squared
    );

    Ok(ForecastResult {
        historical,
        projected,
        model,
    })
}
