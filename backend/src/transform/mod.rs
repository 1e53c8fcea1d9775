//! Transformation module.
//!
//! Everything between a validated table and the sinks:
//! - Dates: free-form sale dates to [`crate::SaleDate`]
//! - Aggregate: per make/model averages
//! - Pipeline: the stage sequence and run report

pub mod aggregate;
pub mod dates;
pub mod pipeline;

pub use aggregate::aggregate;
pub use dates::{normalize_dates, parse_sale_date, SALE_DATE_COLUMN};
pub use pipeline::{prepare, run, run_with_sinks, PipelineReport, Prepared, Written};
