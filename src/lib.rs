//! `covid_trends` library crate.
//!
//! Loads a regional case/death CSV, validates it against a declared schema,
//! aggregates by region and period, fits a linear trend and assembles plain
//! data views for a presentation layer. The binary is a thin menu over this.
//!
//! Pipeline: [`loader`] -> [`normalizer`] -> [`aggregator`] ->
//! {[`forecast`], [`views`]}.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod forecast;
pub mod loader;
pub mod normalizer;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;
pub mod views;

pub use aggregator::{aggregate, GroupBy};
pub use config::{Config, Schema};
pub use error::{ForecastError, IngestionError, RowError, ViewError};
pub use forecast::{forecast, ForecastResult, TrendModel};
pub use loader::{load, LoadOutcome};
pub use types::{Aggregate, Bucket, Metric, Record, RecordSet};
pub use views::{views, Selection, Views};
