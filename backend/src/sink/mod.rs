//! Persistence destinations.
//!
//! A [`Sink`] writes a whole [`Table`] to one destination, replacing whatever
//! was there. The pipeline only sees the trait, so adding a destination kind
//! means adding an implementation here and wiring it into
//! [`crate::config::PipelineConfig::sinks_for`].
//!
//! - [`CsvFileSink`] - Delimited text file
//! - [`SqliteTableSink`] - Named table in a SQLite database
//!
//! Sinks are independent: a failed write to one never undoes a completed
//! write to another.

pub mod csv_file;
pub mod sqlite;

use std::fmt;

use crate::error::SinkResult;
use crate::models::Table;

pub use csv_file::{write_csv, write_csv_to, CsvFileSink};
pub use sqlite::{write_table, SqliteTableSink};

/// A destination that fully replaces its contents on each write.
pub trait Sink {
    /// Human-readable destination, used in logs and errors.
    fn describe(&self) -> String;

    /// Replace the destination's contents with `table`.
    fn write(&self, table: &Table) -> SinkResult<()>;
}

/// Logical datasets the pipeline persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Validated rows with normalized sale dates.
    Converted,
    /// Per (make, model) averages.
    Summary,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Converted => "converted",
            Dataset::Summary => "summary",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sinks for every dataset of one run.
pub struct SinkPlan {
    pub converted: Vec<Box<dyn Sink>>,
    pub summary: Vec<Box<dyn Sink>>,
}

impl SinkPlan {
    pub fn for_dataset(&self, dataset: Dataset) -> &[Box<dyn Sink>] {
        match dataset {
            Dataset::Converted => &self.converted,
            Dataset::Summary => &self.summary,
        }
    }
}

impl fmt::Debug for SinkPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |sinks: &[Box<dyn Sink>]| sinks.iter().map(|s| s.describe()).collect::<Vec<_>>();
        f.debug_struct("SinkPlan")
            .field("converted", &names(&self.converted))
            .field("summary", &names(&self.summary))
            .finish()
    }
}
