//! # Carsales - vehicle sales ETL
//!
//! Carsales reads a CSV of used-vehicle auction sales, drops incomplete rows,
//! parses the free-form sale dates, averages price and mileage per make and
//! model, and writes both the cleaned rows and the averages to CSV files and
//! a SQLite database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│ Validation  │────▶│    Dates    │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (14 columns)│     │ (permissive)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            │
//!                     │  CSV/SQLite │◀────│  Aggregate  │◀───────────┤
//!                     │  (summary)  │     │ (make/model)│            │
//!                     └─────────────┘     └─────────────┘            ▼
//!                                                             ┌─────────────┐
//!                                                             │  CSV/SQLite │
//!                                                             │ (converted) │
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carsales::{run, PipelineConfig};
//!
//! let report = run(&PipelineConfig::default())?;
//! println!("Wrote {} groups", report.groups);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types, one per stage
//! - [`models`] - Table, Value and SaleDate
//! - [`parser`] - CSV extraction with auto-detection
//! - [`validation`] - Required columns and missing-value filtering
//! - [`transform`] - Date parsing, aggregation and the pipeline
//! - [`sink`] - CSV file and SQLite table outputs
//! - [`config`] - Paths and table names
//! - [`logs`] - Logging helpers

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Stages
pub mod parser;
pub mod sink;
pub mod transform;
pub mod validation;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregationError, ConfigError, ExtractionError, PipelineError, PipelineResult, SchemaError,
    SinkError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{ColumnKind, Row, SaleDate, Table, Value};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use parser::{extract_bytes, extract_path, extract_reader, Extracted};
pub use validation::{validate, validate_with, Filtered, NullPolicy, REQUIRED_COLUMNS};
pub use transform::{aggregate, normalize_dates, parse_sale_date};
pub use sink::{write_csv, write_table, CsvFileSink, Dataset, Sink, SinkPlan, SqliteTableSink};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::PipelineConfig;
pub use transform::pipeline::{prepare, run, run_with_sinks, PipelineReport, Prepared};
