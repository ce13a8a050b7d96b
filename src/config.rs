//! Configuration file handling.
//!
//! Settings are read from `covid_trends.toml` (or `--config`). Every field
//! has a default so an empty file, or no file at all, is valid.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::IngestionError;
use crate::types::{Bucket, Metric};

pub const DEFAULT_CONFIG_FILE: &str = "covid_trends.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schema: Schema,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// The declared input schema: required column names, the single accepted
/// date format, and the bucket used to derive periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default = "default_region_column")]
    pub region_column: String,

    #[serde(default = "default_date_column")]
    pub date_column: String,

    #[serde(default = "default_new_cases_column")]
    pub new_cases_column: String,

    #[serde(default = "default_new_deaths_column")]
    pub new_deaths_column: String,

    /// Optional column; used only when present in the header.
    #[serde(default = "default_recovered_column")]
    pub recovered_column: String,

    /// chrono strftime pattern.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default)]
    pub bucket: Bucket,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            region_column: default_region_column(),
            date_column: default_date_column(),
            new_cases_column: default_new_cases_column(),
            new_deaths_column: default_new_deaths_column(),
            recovered_column: default_recovered_column(),
            date_format: default_date_format(),
            bucket: Bucket::Year,
        }
    }
}

fn default_region_column() -> String {
    "state".to_string()
}

fn default_date_column() -> String {
    "date".to_string()
}

fn default_new_cases_column() -> String {
    "cases_new".to_string()
}

fn default_new_deaths_column() -> String {
    "deaths_new".to_string()
}

fn default_recovered_column() -> String {
    "cases_recovered".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

impl Schema {
    pub fn required_columns(&self) -> [&str; 4] {
        [
            &self.region_column,
            &self.date_column,
            &self.new_cases_column,
            &self.new_deaths_column,
        ]
    }

    /// Checked once per load, before any row is read.
    pub fn validate(&self) -> Result<(), IngestionError> {
        let mut seen = HashSet::new();
        for name in self.required_columns() {
            if name.trim().is_empty() {
                return Err(IngestionError::InvalidSchema(
                    "column names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name) {
                return Err(IngestionError::InvalidSchema(format!(
                    "column '{name}' is declared twice"
                )));
            }
        }
        if self.date_format.is_empty()
            || StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(IngestionError::InvalidSchema(format!(
                "bad date format '{}'",
                self.date_format
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of future periods to project.
    #[serde(default = "default_horizon")]
    pub horizon: u32,

    #[serde(default = "default_metric")]
    pub metric: Metric,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            metric: default_metric(),
        }
    }
}

fn default_horizon() -> u32 {
    5
}

fn default_metric() -> Metric {
    Metric::NewCases
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the report files are written to.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Rows shown in each console table preview.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            preview_rows: default_preview_rows(),
        }
    }
}

fn default_directory() -> String {
    ".".to_string()
}

fn default_preview_rows() -> usize {
    5
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Returns `Ok(None)` if the default file doesn't exist.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// CLI arguments take precedence over the file, but only when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(horizon) = args.horizon {
            self.forecast.horizon = horizon;
        }
        if let Some(metric) = args.metric {
            self.forecast.metric = metric;
        }
        if let Some(ref dir) = args.out_dir {
            self.output.directory = dir.display().to_string();
        }
    }

    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema.region_column, "state");
        assert_eq!(config.schema.date_format, "%Y-%m-%d");
        assert_eq!(config.forecast.horizon, 5);
        assert_eq!(config.forecast.metric, Metric::NewCases);
        assert!(config.schema.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[schema]
region_column = "region"
date_format = "%d/%m/%Y"
bucket = "month"

[forecast]
horizon = 3
metric = "new_deaths"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.schema.region_column, "region");
        assert_eq!(config.schema.date_column, "date");
        assert_eq!(config.schema.bucket, Bucket::Month);
        assert_eq!(config.forecast.horizon, 3);
        assert_eq!(config.forecast.metric, Metric::NewDeaths);
        assert_eq!(config.output.preview_rows, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[schema]"));
        assert!(toml_str.contains("[forecast]"));
        assert!(toml_str.contains("[output]"));
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.schema, Schema::default());
    }

    #[test]
    fn schema_rejects_duplicate_columns() {
        let schema = Schema {
            new_deaths_column: "cases_new".to_string(),
            ..Schema::default()
        };
        assert!(matches!(
            schema.validate(),
            Err(IngestionError::InvalidSchema(_))
        ));
    }

    #[test]
    fn schema_rejects_bad_date_format() {
        let schema = Schema {
            date_format: "%Y-%Q".to_string(),
            ..Schema::default()
        };
        assert!(schema.validate().is_err());
    }
}
