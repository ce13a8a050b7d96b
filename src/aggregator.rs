//! Sum-reduction of records by region and/or period.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ViewError;
use crate::types::{Aggregate, Metric, Record};

/// Grouping key choice for [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Region,
    RegionPeriod,
    /// Cross-region totals per period.
    Period,
}

#[derive(Default)]
struct Acc {
    cases: f64,
    deaths: f64,
    recovered: f64,
    with_recovered: usize,
    count: usize,
}

/// Group `records` by `group_by` and sum their metrics.
///
/// Output is ordered by key ascending (region lexically, then period
/// numerically) and holds each key once. Empty input gives empty output.
/// `total_cases_recovered` is only set when every contributing record
/// carries that metric.
pub fn aggregate<'a, I>(records: I, group_by: GroupBy) -> Vec<Aggregate>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut map: BTreeMap<(Option<&'a str>, Option<i32>), Acc> = BTreeMap::new();
    for r in records {
        let key = match group_by {
            GroupBy::Region => (Some(r.region()), None),
            GroupBy::RegionPeriod => (Some(r.region()), Some(r.period())),
            GroupBy::Period => (None, Some(r.period())),
        };
        let e = map.entry(key).or_default();
        e.cases += r.new_cases();
        e.deaths += r.new_deaths();
        if let Some(v) = r.cases_recovered() {
            e.recovered += v;
            e.with_recovered += 1;
        }
        e.count += 1;
    }
    debug!("Aggregated into {} {:?} group(s)", map.len(), group_by);

    map.into_iter()
        .map(|((region, period), acc)| Aggregate {
            region: region.map(str::to_string),
            period,
            total_new_cases: acc.cases,
            total_new_deaths: acc.deaths,
            total_cases_recovered: (acc.with_recovered == acc.count).then_some(acc.recovered),
            record_count: acc.count,
        })
        .collect()
}

/// Per-period aggregates of a single region, ordered by period.
pub fn region_by_period(records: &[Record], region: &str) -> Vec<Aggregate> {
    aggregate(
        records.iter().filter(|r| r.region() == region),
        GroupBy::RegionPeriod,
    )
}

/// `(period, value)` pairs of one metric, in the aggregates' order.
/// Aggregates without a period key are skipped.
pub fn series(aggregates: &[Aggregate], metric: Metric) -> Result<Vec<(i32, f64)>, ViewError> {
    aggregates
        .iter()
        .filter_map(|a| a.period.map(|p| (p, a)))
        .map(|(p, a)| {
            a.value(metric)
                .map(|v| (p, v))
                .ok_or(ViewError::MetricUnavailable(metric))
        })
        .collect()
}
