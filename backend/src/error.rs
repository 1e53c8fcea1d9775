//! Error types for the vehicle sales pipeline.
//!
//! One error type per stage:
//!
//! - [`ExtractionError`] - Source unreadable or not valid delimited text
//! - [`SchemaError`] - Required columns absent
//! - [`AggregationError`] - Grouping input missing columns or non-numeric
//! - [`SinkError`] - Destination unwritable or store failure
//! - [`ConfigError`] - Configuration file unreadable or invalid
//! - [`PipelineError`] - Top-level orchestration errors, naming the stage
//!
//! Date parse failures are not errors: the date normalizer drops and counts
//! those rows instead.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors while reading the delimited source.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Failed to open or read the source.
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reader-level failure from the CSV tokenizer.
    #[error("invalid delimited data: {0}")]
    Csv(#[from] csv::Error),

    /// A data row has more fields than the header.
    #[error("malformed row at line {line}: expected {expected} fields, saw {found}")]
    Malformed {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// No header row.
    #[error("source is empty")]
    Empty,

    /// The delimiter must be a single ASCII character.
    #[error("unsupported delimiter {0:?}")]
    Delimiter(char),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors raised by the column contract.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// One or more required columns are absent. Names keep contract order.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors while grouping and averaging.
#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("aggregation input has no '{0}' column")]
    MissingColumn(String),

    /// An averaged column holds a value that is not a number.
    #[error("column '{column}' holds non-numeric value '{value}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors while persisting a table.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Connection, DDL or insert failure against the relational store.
    #[error("database error on {target}: {source}")]
    Database {
        target: String,
        #[source]
        source: rusqlite::Error,
    },
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// Returned by [`crate::transform::pipeline::run`]. Each variant names the
/// stage that failed; the run stops at the first one.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extract stage failed: {0}")]
    Extract(#[from] ExtractionError),

    #[error("validate stage failed: {0}")]
    Validate(#[from] SchemaError),

    #[error("normalize-dates stage failed: {0}")]
    NormalizeDates(#[source] SchemaError),

    #[error("aggregate stage failed: {0}")]
    Aggregate(#[from] AggregationError),

    #[error("persist stage failed for dataset '{dataset}' ({sink}): {source}")]
    Persist {
        dataset: String,
        sink: String,
        #[source]
        source: SinkError,
    },
}

impl PipelineError {
    /// Short stage name, used in logs and exit messages.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Extract(_) => "extract",
            PipelineError::Validate(_) => "validate",
            PipelineError::NormalizeDates(_) => "normalize-dates",
            PipelineError::Aggregate(_) => "aggregate",
            PipelineError::Persist { .. } => "persist",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type ExtractionResult<T> = Result<T, ExtractionError>;

pub type SinkResult<T> = Result<T, SinkError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_columns() {
        let err = SchemaError::MissingColumns(vec!["make".into(), "vin".into()]);
        assert_eq!(err.to_string(), "missing required columns: make, vin");
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let err: PipelineError = SchemaError::MissingColumns(vec!["make".into()]).into();
        assert_eq!(err.stage(), "validate");
        let msg = err.to_string();
        assert!(msg.contains("validate stage"));
        assert!(msg.contains("make"));

        let err: PipelineError = ExtractionError::Empty.into();
        assert_eq!(err.stage(), "extract");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_persist_error_format() {
        let err = PipelineError::Persist {
            dataset: "car_summary".into(),
            sink: "csv file out.csv".into(),
            source: SinkError::Io {
                path: PathBuf::from("out.csv"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("car_summary"));
        assert!(msg.contains("out.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_non_numeric_format() {
        let err = AggregationError::NonNumeric {
            column: "odometer".into(),
            row: 3,
            value: "lots".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("odometer"));
        assert!(msg.contains("lots"));
    }
}
