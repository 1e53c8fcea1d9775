//! Pipeline configuration.
//!
//! Every path and table name the pipeline touches lives in [`PipelineConfig`].
//! Values are layered by the binary: built-in defaults, then an optional JSON
//! file, then `CARSALES_*` environment variables and command-line flags.
//!
//! ```json
//! {
//!   "input_path": "data/car_prices.csv",
//!   "db_path": "processed_data/car_prices.db",
//!   "null_policy": "required_columns"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sink::{CsvFileSink, Dataset, Sink, SinkPlan, SqliteTableSink};
use crate::transform::dates::SALE_DATE_COLUMN;
use crate::validation::NullPolicy;

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Raw sales file
    pub input_path: PathBuf,

    /// Converted (validated, date-normalized) rows as CSV
    pub output_csv_path: PathBuf,

    /// Per make/model averages as CSV
    pub output_aggregate_path: PathBuf,

    /// SQLite database holding both tables
    pub db_path: PathBuf,

    pub converted_table: String,
    pub summary_table: String,

    /// Column holding the sale date
    pub date_column: String,

    /// Input delimiter; detected from the header when unset
    pub delimiter: Option<char>,

    pub null_policy: NullPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/car_prices.csv"),
            output_csv_path: PathBuf::from("processed_data/converted_car_prices.csv"),
            output_aggregate_path: PathBuf::from("processed_data/aggregated_car_prices.csv"),
            db_path: PathBuf::from("processed_data/car_prices.db"),
            converted_table: "converted_date_format".to_string(),
            summary_table: "car_summary".to_string(),
            date_column: SALE_DATE_COLUMN.to_string(),
            delimiter: None,
            null_policy: NullPolicy::AnyColumn,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, or the given file when there is one.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Default layout with every path rooted at `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            input_path: dir.join(&defaults.input_path),
            output_csv_path: dir.join(&defaults.output_csv_path),
            output_aggregate_path: dir.join(&defaults.output_aggregate_path),
            db_path: dir.join(&defaults.db_path),
            ..defaults
        }
    }

    /// Relational table name for a dataset.
    pub fn table_name(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Converted => &self.converted_table,
            Dataset::Summary => &self.summary_table,
        }
    }

    /// CSV file path for a dataset.
    pub fn csv_path(&self, dataset: Dataset) -> &Path {
        match dataset {
            Dataset::Converted => &self.output_csv_path,
            Dataset::Summary => &self.output_aggregate_path,
        }
    }

    /// Sinks a dataset is written to, in write order: CSV file, then SQLite.
    pub fn sinks_for(&self, dataset: Dataset) -> Vec<Box<dyn Sink>> {
        vec![
            Box::new(CsvFileSink::new(self.csv_path(dataset))),
            Box::new(SqliteTableSink::new(&self.db_path, self.table_name(dataset))),
        ]
    }

    pub fn sink_plan(&self) -> SinkPlan {
        SinkPlan {
            converted: self.sinks_for(Dataset::Converted),
            summary: self.sinks_for(Dataset::Summary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_path, PathBuf::from("data/car_prices.csv"));
        assert_eq!(config.table_name(Dataset::Converted), "converted_date_format");
        assert_eq!(config.table_name(Dataset::Summary), "car_summary");
        assert_eq!(config.date_column, "saledate");
        assert_eq!(config.null_policy, NullPolicy::AnyColumn);
        assert!(config.delimiter.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("carsales.json");
        fs::write(
            &path,
            r#"{ "db_path": "out/sales.db", "delimiter": ";", "null_policy": "required_columns" }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("out/sales.db"));
        assert_eq!(config.delimiter, Some(';'));
        assert_eq!(config.null_policy, NullPolicy::RequiredColumns);
        assert_eq!(config.summary_table, "car_summary");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("carsales.json");
        fs::write(&path, r#"{ "db_url": "postgres://" }"#).unwrap();

        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load(Some(Path::new("/nonexistent/carsales.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_in_dir() {
        let config = PipelineConfig::in_dir(Path::new("/work"));
        assert_eq!(config.input_path, PathBuf::from("/work/data/car_prices.csv"));
        assert_eq!(config.db_path, PathBuf::from("/work/processed_data/car_prices.db"));
        assert_eq!(config.converted_table, "converted_date_format");
    }

    #[test]
    fn test_sinks_for_dataset() {
        let config = PipelineConfig::default();
        let sinks = config.sinks_for(Dataset::Summary);
        assert_eq!(sinks.len(), 2);
        assert_eq!(
            sinks[0].describe(),
            "csv file processed_data/aggregated_car_prices.csv"
        );
        assert_eq!(
            sinks[1].describe(),
            "sqlite table car_summary in processed_data/car_prices.db"
        );

        let plan = config.sink_plan();
        assert_eq!(plan.for_dataset(Dataset::Converted).len(), 2);
    }
}
