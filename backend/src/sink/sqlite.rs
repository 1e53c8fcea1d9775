//! SQLite table output.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use super::Sink;
use crate::error::{SinkError, SinkResult};
use crate::models::{Table, Value};

/// Writes a table as a named table in a SQLite database file.
///
/// The connection is opened for a single write and closed before returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteTableSink {
    db_path: PathBuf,
    table: String,
}

impl SqliteTableSink {
    pub fn new(db_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            table: table.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }
}

impl Sink for SqliteTableSink {
    fn describe(&self) -> String {
        format!("sqlite table {} in {}", self.table, self.db_path.display())
    }

    fn write(&self, table: &Table) -> SinkResult<()> {
        if let Some(parent) = self.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let target = self.db_path.display().to_string();
        let mut conn = Connection::open(&self.db_path).map_err(|source| SinkError::Database {
            target: target.clone(),
            source,
        })?;

        write_table(table, &mut conn, &self.table)?;

        conn.close()
            .map_err(|(_, source)| SinkError::Database { target, source })
    }
}

/// Replace table `name` with the contents of `table`.
///
/// Drop, create and inserts run in one transaction, so on failure the
/// previous table is left as it was.
pub fn write_table(table: &Table, conn: &mut Connection, name: &str) -> SinkResult<()> {
    let target = format!("table {}", quote_ident(name));
    let db_error = |source| SinkError::Database {
        target: target.clone(),
        source,
    };

    let tx = conn.transaction().map_err(db_error)?;

    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} {}", quote_ident(col), table.column_kind(i).sql_type()))
        .collect();

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} ({cols});",
        name = quote_ident(name),
        cols = column_defs.join(", ")
    ))
    .map_err(db_error)?;

    {
        let placeholders: Vec<String> = (1..=table.columns().len())
            .map(|i| format!("?{}", i))
            .collect();
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(name),
                placeholders.join(", ")
            ))
            .map_err(db_error)?;

        for row in table.raw_rows() {
            stmt.execute(params_from_iter(row.iter().map(sql_value)))
                .map_err(db_error)?;
        }
    }

    tx.commit().map_err(db_error)
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::DateTime(d) => SqlValue::Text(d.to_canonical()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaleDate;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::tempdir;

    fn summary(rows: &[(&str, f64)]) -> Table {
        Table::from_rows(
            vec!["make", "avg_odometer"],
            rows.iter()
                .map(|(make, avg)| vec![Value::from(*make), Value::Float(*avg)])
                .collect(),
        )
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_write_and_read_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        write_table(&summary(&[("Kia", 13016.0), ("BMW", 1331.0)]), &mut conn, "car_summary").unwrap();

        assert_eq!(count(&conn, "car_summary"), 2);
        let (make, avg): (String, f64) = conn
            .query_row(
                "SELECT make, avg_odometer FROM car_summary WHERE make = 'Kia'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(make, "Kia");
        assert_eq!(avg, 13016.0);
    }

    #[test]
    fn test_write_replaces_existing_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE car_summary (legacy TEXT); INSERT INTO car_summary VALUES ('x');")
            .unwrap();

        write_table(&summary(&[("Kia", 1.0)]), &mut conn, "car_summary").unwrap();
        write_table(&summary(&[("Kia", 1.0), ("BMW", 2.0)]), &mut conn, "car_summary").unwrap();

        assert_eq!(count(&conn, "car_summary"), 2);
        let legacy: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('car_summary') WHERE name = 'legacy'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(legacy, 0);
    }

    #[test]
    fn test_column_types_and_dates() {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        let date = SaleDate::Aware(offset.with_ymd_and_hms(2014, 12, 16, 12, 30, 0).unwrap());
        let table = Table::from_rows(
            vec!["year", "sellingprice", "saledate", "odd \"name\""],
            vec![vec![Value::Int(2015), Value::Float(21500.0), date.into(), Value::Null]],
        );
        let mut conn = Connection::open_in_memory().unwrap();
        write_table(&table, &mut conn, "converted_date_format").unwrap();

        let types: Vec<(String, String)> = conn
            .prepare("SELECT name, type FROM pragma_table_info('converted_date_format')")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            types,
            vec![
                ("year".to_string(), "INTEGER".to_string()),
                ("sellingprice".to_string(), "REAL".to_string()),
                ("saledate".to_string(), "TIMESTAMP".to_string()),
                ("odd \"name\"".to_string(), "TEXT".to_string()),
            ]
        );

        let stored: String = conn
            .query_row("SELECT saledate FROM converted_date_format", [], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "2014-12-16 12:30:00-08:00");
    }

    #[test]
    fn test_sink_opens_file_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("processed_data").join("car_prices.db");
        let sink = SqliteTableSink::new(&db_path, "car_summary");

        sink.write(&summary(&[("Kia", 1.0)])).unwrap();
        sink.write(&summary(&[("BMW", 2.0), ("Audi", 3.0)])).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        assert_eq!(count(&conn, "car_summary"), 2);
        assert!(sink.describe().contains("car_summary"));
    }

    #[test]
    fn test_unopenable_database_fails() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let sink = SqliteTableSink::new(dir.path(), "car_summary");
        let err = sink.write(&summary(&[("Kia", 1.0)])).unwrap_err();
        assert!(matches!(err, SinkError::Database { .. }));
    }
}
