//! Command-line interface argument parsing.

use clap::Parser;
use std::path::PathBuf;

use crate::types::Metric;

/// covid_trends - regional case/death aggregation and trend forecast
///
/// Without --region the program runs an interactive menu: load the CSV,
/// pick a region, generate reports. With --region it runs that selection
/// once and exits.
///
/// Examples:
///   covid_trends --input covid.csv
///   covid_trends --input covid.csv --region Selangor --horizon 3
///   covid_trends --region Johor --metric new-deaths --out-dir reports
///   covid_trends --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV file to load
    #[arg(short, long, default_value = "covid.csv", value_name = "FILE")]
    pub input: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for covid_trends.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Region to report on (runs non-interactively)
    #[arg(short, long, value_name = "NAME")]
    pub region: Option<String>,

    /// Period for the distribution view (defaults to the latest)
    #[arg(short, long, value_name = "PERIOD")]
    pub period: Option<i32>,

    /// Number of future periods to forecast
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub horizon: Option<u32>,

    /// Metric for the time series and forecast
    #[arg(short, long, value_enum)]
    pub metric: Option<Metric>,

    /// Directory for the report files
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write a default covid_trends.toml and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
