//! Domain models for the vehicle sales pipeline.
//!
//! Every stage hands the next one a [`Table`]: an ordered list of column names
//! plus rows of [`Value`]s aligned positionally with those columns.
//!
//! - [`Table`] - The Record Table shared by all stages
//! - [`Row`] - Borrowed view of a single row, addressable by column name
//! - [`Value`] - A single scalar cell
//! - [`SaleDate`] - Canonical date-time produced by the date normalizer
//! - [`ColumnKind`] - Storage type inferred for a column

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

// =============================================================================
// Canonical date-time
// =============================================================================

/// A parsed sale date.
///
/// Sources that carry an offset produce an [`SaleDate::Aware`] value; anything
/// else stays [`SaleDate::Naive`]. The offset is kept as written, not shifted
/// to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleDate {
    /// Date-time with a fixed UTC offset.
    Aware(DateTime<FixedOffset>),
    /// Date-time without zone information.
    Naive(NaiveDateTime),
}

impl SaleDate {
    /// Canonical text form, e.g. `2014-12-16 12:30:00-08:00`.
    pub fn to_canonical(&self) -> String {
        match self {
            SaleDate::Aware(dt) => {
                if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S%:z").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string()
                }
            }
            SaleDate::Naive(dt) => {
                if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()
                }
            }
        }
    }

    pub fn is_aware(&self) -> bool {
        matches!(self, SaleDate::Aware(_))
    }
}

impl fmt::Display for SaleDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

// =============================================================================
// Scalar values
// =============================================================================

/// A single cell of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(SaleDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&SaleDate> {
        match self {
            Value::DateTime(d) => Some(d),
            _ => None,
        }
    }

    /// Text written to delimited output. Missing values become an empty field.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Text(s) => s.clone(),
            Value::DateTime(d) => d.to_canonical(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::DateTime(d) => serializer.serialize_str(&d.to_canonical()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<SaleDate> for Value {
    fn from(d: SaleDate) -> Self {
        Value::DateTime(d)
    }
}

/// Whole floats keep one decimal place (`21500.0`) so float columns stay
/// recognisable as floats when the file is read back.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

// =============================================================================
// Column kinds
// =============================================================================

/// Storage type of a column, derived from the values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Timestamp,
    Text,
}

impl ColumnKind {
    /// SQLite declared type for this kind.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Timestamp => "TIMESTAMP",
            ColumnKind::Text => "TEXT",
        }
    }
}

// =============================================================================
// Record Table
// =============================================================================

/// Ordered rows sharing one column set.
///
/// Column names are unique and every row holds exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from string column names and rows.
    ///
    /// # Panics
    /// Panics if a row's width differs from the column count.
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row.
    ///
    /// # Panics
    /// Panics if the row's width differs from the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width does not match column count"
        );
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            columns: &self.columns,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Raw row values in insertion order.
    pub fn raw_rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Keep only rows for which `keep` returns true. Returns how many were removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Value]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Replace every value of column `idx`, or drop the row when `f` returns `None`.
    /// Returns how many rows were dropped.
    pub fn rewrite_column<F>(&mut self, idx: usize, mut f: F) -> usize
    where
        F: FnMut(&Value) -> Option<Value>,
    {
        let before = self.rows.len();
        self.rows.retain_mut(|row| match f(&row[idx]) {
            Some(v) => {
                row[idx] = v;
                true
            }
            None => false,
        });
        before - self.rows.len()
    }

    /// Infer how column `idx` should be stored.
    ///
    /// Missing values are ignored; an all-missing column is text.
    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        let mut kind: Option<ColumnKind> = None;
        for row in &self.rows {
            let cell = match &row[idx] {
                Value::Null => continue,
                Value::Int(_) => ColumnKind::Integer,
                Value::Float(_) => ColumnKind::Real,
                Value::DateTime(_) => ColumnKind::Timestamp,
                Value::Text(_) => return ColumnKind::Text,
            };
            kind = Some(match (kind, cell) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnKind::Integer), ColumnKind::Real)
                | (Some(ColumnKind::Real), ColumnKind::Integer) => ColumnKind::Real,
                _ => return ColumnKind::Text,
            });
        }
        kind.unwrap_or(ColumnKind::Text)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json_records(&self) -> Vec<JsonValue> {
        self.rows()
            .map(|row| {
                let mut obj = Map::new();
                for (col, value) in row.iter() {
                    obj.insert(
                        col.to_string(),
                        serde_json::to_value(value).unwrap_or(JsonValue::Null),
                    );
                }
                JsonValue::Object(obj)
            })
            .collect()
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Table {
        Table::from_rows(
            vec!["make", "odometer", "price"],
            vec![
                vec!["Kia".into(), Value::Int(16639), Value::Float(21500.0)],
                vec!["BMW".into(), Value::Int(1331), Value::Int(30000)],
            ],
        )
    }

    #[test]
    fn test_row_lookup_by_name() {
        let table = sample();
        let row = table.row(1).unwrap();
        assert_eq!(row.get("make"), Some(&Value::from("BMW")));
        assert_eq!(row.get("odometer"), Some(&Value::Int(1331)));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_float_rendering_keeps_decimal() {
        assert_eq!(Value::Float(21500.0).render(), "21500.0");
        assert_eq!(Value::Float(13016.5).render(), "13016.5");
        assert_eq!(Value::Int(7).render(), "7");
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn test_canonical_date_forms() {
        let naive = NaiveDate::from_ymd_opt(2014, 12, 16)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(SaleDate::Naive(naive).to_canonical(), "2014-12-16 12:30:00");

        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let aware = naive.and_local_timezone(offset).unwrap();
        assert_eq!(
            SaleDate::Aware(aware).to_canonical(),
            "2014-12-16 12:30:00-08:00"
        );
    }

    #[test]
    fn test_column_kind_inference() {
        let table = sample();
        assert_eq!(table.column_kind(0), ColumnKind::Text);
        assert_eq!(table.column_kind(1), ColumnKind::Integer);
        // Int and Float mixed widens to Real.
        assert_eq!(table.column_kind(2), ColumnKind::Real);
    }

    #[test]
    fn test_rewrite_column_drops_rows() {
        let mut table = sample();
        let dropped = table.rewrite_column(1, |v| match v {
            Value::Int(i) if *i > 2000 => Some(Value::Int(i / 1000)),
            _ => None,
        });
        assert_eq!(dropped, 1);
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0).unwrap().get("odometer"), Some(&Value::Int(16)));
    }

    #[test]
    fn test_json_records() {
        let records = sample().to_json_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["make"], "Kia");
        assert_eq!(records[1]["price"], 30000);
    }

    #[test]
    #[should_panic(expected = "row width")]
    fn test_push_row_rejects_wrong_width() {
        let mut table = Table::new(vec!["a".to_string()]);
        table.push_row(vec![Value::Null, Value::Null]);
    }
}
