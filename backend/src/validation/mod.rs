//! Column contract and missing-value filtering.
//!
//! [`validate`] checks that every name in [`REQUIRED_COLUMNS`] is present,
//! then drops rows holding a missing value. Which cells count is decided by
//! the [`NullPolicy`]: by default any missing cell disqualifies its row.
//!
//! # Example
//!
//! ```
//! use carsales::parser::extract_str;
//! use carsales::validation::validate_columns;
//! use carsales::SchemaError;
//!
//! let table = extract_str("make,model\nKia,Rio", ',').unwrap();
//! let err = validate_columns(&table, &["make", "model", "vin"]).unwrap_err();
//! assert_eq!(err, SchemaError::MissingColumns(vec!["vin".to_string()]));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::models::{Table, Value};

/// Columns every input must carry, in contract order.
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "year",
    "make",
    "model",
    "trim",
    "body",
    "vin",
    "state",
    "odometer",
    "color",
    "interior",
    "seller",
    "mmr",
    "sellingprice",
    "saledate",
];

/// Which cells are checked when removing rows with missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// A missing value in any column drops the row.
    #[default]
    AnyColumn,
    /// Only the required columns are checked.
    RequiredColumns,
}

/// A table after a row filter, with the number of rows it lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub table: Table,
    pub dropped: usize,
}

/// Validate against [`REQUIRED_COLUMNS`] with the default policy.
pub fn validate(table: Table) -> Result<Filtered, SchemaError> {
    validate_with(table, &REQUIRED_COLUMNS, NullPolicy::default())
}

/// Validate against an explicit column set and policy.
pub fn validate_with(
    mut table: Table,
    required: &[&str],
    policy: NullPolicy,
) -> Result<Filtered, SchemaError> {
    validate_columns(&table, required)?;

    let checked: Vec<usize> = match policy {
        NullPolicy::AnyColumn => (0..table.columns().len()).collect(),
        NullPolicy::RequiredColumns => required
            .iter()
            .filter_map(|name| table.column_index(name))
            .collect(),
    };

    let dropped = table.retain_rows(|row| checked.iter().all(|&i| !row[i].is_null()));

    Ok(Filtered { table, dropped })
}

/// Check column presence only.
///
/// Missing names are reported in the order given, each once.
pub fn validate_columns(table: &Table, required: &[&str]) -> Result<(), SchemaError> {
    let mut missing: Vec<String> = Vec::new();
    for &name in required {
        if !table.has_column(name) && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

/// True if no cell in the table is missing.
pub fn is_complete(table: &Table) -> bool {
    table.raw_rows().iter().all(|row| !row.iter().any(Value::is_null))
}
