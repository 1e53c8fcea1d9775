//! Group sale rows by vehicle and average their numbers.
//!
//! ```text
//! Validated rows                           →  Aggregate
//! ┌──────────────────────────────────┐      ┌─────────────────────────────────┐
//! │ Kia  Sorento   21500   16639     │      │ Kia  Sorento   21500.0 13016.0  │
//! │ Kia  Sorento   21500    9393     │  →   ├─────────────────────────────────┤
//! │ BMW  3 Series  30000    1331     │      │ BMW  3 Series  30000.0  1331.0  │
//! └──────────────────────────────────┘      └─────────────────────────────────┘
//! ```
//!
//! Keys match exactly: no case folding, no trimming. Groups come out in the
//! order their first row appears.

use std::collections::HashMap;

use crate::error::AggregationError;
use crate::models::{SaleDate, Table, Value};

/// Grouping key columns.
pub const GROUP_COLUMNS: [&str; 2] = ["make", "model"];

/// Averaged input columns and the output columns they become.
pub const AVERAGED_COLUMNS: [(&str, &str); 2] = [
    ("sellingprice", "avg_sellingprice"),
    ("odometer", "avg_odometer"),
];

/// Group by (`make`, `model`) and average `sellingprice` and `odometer`.
///
/// Missing values in an averaged column are skipped; a group with no values
/// at all gets a missing average.
pub fn aggregate(table: &Table) -> Result<Table, AggregationError> {
    let make_idx = column(table, GROUP_COLUMNS[0])?;
    let model_idx = column(table, GROUP_COLUMNS[1])?;
    let avg_idx = [
        column(table, AVERAGED_COLUMNS[0].0)?,
        column(table, AVERAGED_COLUMNS[1].0)?,
    ];

    let mut index: HashMap<(KeyPart, KeyPart), usize> = HashMap::new();
    let mut groups: Vec<GroupBuilder> = Vec::new();

    for (row_no, row) in table.raw_rows().iter().enumerate() {
        let key = (KeyPart::from(&row[make_idx]), KeyPart::from(&row[model_idx]));
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(GroupBuilder::new(&row[make_idx], &row[model_idx]));
            groups.len() - 1
        });

        for (i, &col) in avg_idx.iter().enumerate() {
            let value = &row[col];
            if value.is_null() {
                continue;
            }
            let n = value.as_f64().ok_or_else(|| AggregationError::NonNumeric {
                column: AVERAGED_COLUMNS[i].0.to_string(),
                row: row_no,
                value: value.render(),
            })?;
            groups[slot].add(i, n);
        }
    }

    let mut columns: Vec<&str> = GROUP_COLUMNS.to_vec();
    columns.extend(AVERAGED_COLUMNS.iter().map(|(_, out)| *out));

    Ok(Table::from_rows(
        columns,
        groups.into_iter().map(GroupBuilder::build).collect(),
    ))
}

fn column(table: &Table, name: &str) -> Result<usize, AggregationError> {
    table
        .column_index(name)
        .ok_or_else(|| AggregationError::MissingColumn(name.to_string()))
}

/// Hashable form of a key cell. Floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Int(i64),
    Float(u64),
    Text(String),
    Date(SaleDate),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) => KeyPart::Float(f.to_bits()),
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::DateTime(d) => KeyPart::Date(*d),
        }
    }
}

/// Running sums for one (make, model) group.
struct GroupBuilder {
    make: Value,
    model: Value,
    sums: [f64; 2],
    counts: [usize; 2],
}

impl GroupBuilder {
    fn new(make: &Value, model: &Value) -> Self {
        Self {
            make: make.clone(),
            model: model.clone(),
            sums: [0.0; 2],
            counts: [0; 2],
        }
    }

    fn add(&mut self, slot: usize, n: f64) {
        self.sums[slot] += n;
        self.counts[slot] += 1;
    }

    fn mean(&self, slot: usize) -> Value {
        match self.counts[slot] {
            0 => Value::Null,
            count => Value::Float(self.sums[slot] / count as f64),
        }
    }

    fn build(self) -> Vec<Value> {
        let price = self.mean(0);
        let odometer = self.mean(1);
        vec![self.make, self.model, price, odometer]
    }
}
