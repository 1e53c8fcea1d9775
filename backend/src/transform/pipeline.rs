//! End-to-end run: extract, validate, normalize dates, aggregate, persist.
//!
//! ```text
//! input csv ─▶ extract ─▶ validate ─▶ normalize dates ─┬─▶ converted sinks
//!                                                      │
//!                                                      └─▶ aggregate ─▶ summary sinks
//! ```
//!
//! The stages run in that fixed order and the first failure ends the run.
//! Sinks come from [`PipelineConfig::sink_plan`] or are passed in directly
//! with [`run_with_sinks`].
//!
//! # Example
//!
//! ```rust,ignore
//! use carsales::{run, PipelineConfig};
//!
//! let report = run(&PipelineConfig::default())?;
//! println!("{} groups from {} rows", report.groups, report.input_rows);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::aggregate::aggregate;
use super::dates::normalize_dates;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::Table;
use crate::parser::{extract_path, format_delimiter};
use crate::sink::{Dataset, SinkPlan};
use crate::validation::{validate_with, REQUIRED_COLUMNS};

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Detected input encoding
    pub encoding: String,
    /// Detected or configured input delimiter
    pub delimiter: char,

    /// Rows read from the input
    pub input_rows: usize,
    /// Rows removed for missing values
    pub validation_dropped: usize,
    /// Rows removed for an unparseable sale date
    pub date_dropped: usize,
    /// Rows in the converted dataset
    pub converted_rows: usize,
    /// Distinct (make, model) groups
    pub groups: usize,

    /// Every completed write, in order
    pub written: Vec<Written>,
}

/// One completed sink write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Written {
    pub dataset: String,
    pub destination: String,
    pub rows: usize,
}

/// Rows ready to persist, with what the filters removed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub converted: Table,
    pub validation_dropped: usize,
    pub date_dropped: usize,
}

/// Run the full pipeline with the sinks named by `config`.
pub fn run(config: &PipelineConfig) -> PipelineResult<PipelineReport> {
    run_with_sinks(config, &config.sink_plan())
}

/// Run the full pipeline, writing to `sinks` instead of the configured ones.
pub fn run_with_sinks(config: &PipelineConfig, sinks: &SinkPlan) -> PipelineResult<PipelineReport> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("pipeline", %run_id);
    let _enter = span.enter();

    let result = execute(run_id, config, sinks);
    if let Err(e) = &result {
        log_error(format!("Run failed in {} stage: {}", e.stage(), e));
    }
    result
}

fn execute(run_id: Uuid, config: &PipelineConfig, sinks: &SinkPlan) -> PipelineResult<PipelineReport> {
    let started_at = Utc::now();

    // Step 1: Extract
    log_info(format!("📖 Reading {}", config.input_path.display()));
    let extracted = extract_path(&config.input_path, config.delimiter)?;
    log_success(format!(
        "Read {} rows ({} columns, encoding {}, delimiter '{}')",
        extracted.table.len(),
        extracted.table.columns().len(),
        extracted.encoding,
        format_delimiter(extracted.delimiter)
    ));
    let input_rows = extracted.table.len();

    // Steps 2-3: Validate and normalize dates
    let prepared = prepare(extracted.table, config)?;

    // Step 4: Persist converted rows
    let mut written = Vec::new();
    persist(Dataset::Converted, &prepared.converted, sinks, &mut written)?;

    // Step 5: Aggregate
    log_info("📦 Grouping by make and model...");
    let summary = aggregate(&prepared.converted)?;
    log_success(format!("{} make/model groups", summary.len()));

    // Step 6: Persist aggregates
    persist(Dataset::Summary, &summary, sinks, &mut written)?;

    let report = PipelineReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        encoding: extracted.encoding,
        delimiter: extracted.delimiter,
        input_rows,
        validation_dropped: prepared.validation_dropped,
        date_dropped: prepared.date_dropped,
        converted_rows: prepared.converted.len(),
        groups: summary.len(),
        written,
    };
    log_success(format!(
        "✨ Done: {} rows in, {} converted, {} groups",
        report.input_rows, report.converted_rows, report.groups
    ));
    Ok(report)
}

/// Validate `table` and normalize its sale dates.
///
/// Covers everything between extraction and the first write, so callers that
/// only want the cleaned rows (or their aggregate) can skip the sinks.
pub fn prepare(table: Table, config: &PipelineConfig) -> PipelineResult<Prepared> {
    log_info("✔️  Validating required columns...");
    let validated = validate_with(table, &REQUIRED_COLUMNS, config.null_policy)?;
    if validated.dropped > 0 {
        log_warning(format!(
            "{} rows dropped for missing values",
            validated.dropped
        ));
    }
    log_success(format!("{} rows passed validation", validated.table.len()));

    log_info(format!("🔄 Parsing '{}' dates...", config.date_column));
    let normalized =
        normalize_dates(validated.table, &config.date_column).map_err(PipelineError::NormalizeDates)?;
    if normalized.dropped > 0 {
        log_warning(format!(
            "{} rows dropped for unparseable '{}'",
            normalized.dropped, config.date_column
        ));
    }
    log_success(format!("{} rows with parsed dates", normalized.table.len()));

    Ok(Prepared {
        converted: normalized.table,
        validation_dropped: validated.dropped,
        date_dropped: normalized.dropped,
    })
}

fn persist(
    dataset: Dataset,
    table: &Table,
    sinks: &SinkPlan,
    written: &mut Vec<Written>,
) -> PipelineResult<()> {
    for sink in sinks.for_dataset(dataset) {
        let destination = sink.describe();
        log_info(format!("💾 Writing {} rows to {}", table.len(), destination));

        sink.write(table).map_err(|source| PipelineError::Persist {
            dataset: dataset.name().to_string(),
            sink: destination.clone(),
            source,
        })?;

        written.push(Written {
            dataset: dataset.name().to_string(),
            destination,
            rows: table.len(),
        });
    }
    Ok(())
}
