//! Delimited file output.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::Sink;
use crate::error::{SinkError, SinkResult};
use crate::models::{Table, Value};

/// Writes a table to a CSV file with a header row and no index column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for CsvFileSink {
    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }

    fn write(&self, table: &Table) -> SinkResult<()> {
        write_csv(table, &self.path)
    }
}

/// Write `table` to `path`, replacing any existing file.
///
/// Rows go to a hidden sibling file first, which is renamed over `path` once
/// it is complete, so readers never see a partial file. Missing parent
/// directories are created.
pub fn write_csv(table: &Table, path: &Path) -> SinkResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let tmp_path = tmp_sibling(path);
    let result = write_file(table, &tmp_path)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(io_error(path)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Write `table` as CSV to any writer. `label` names the destination in errors.
pub fn write_csv_to<W: Write>(table: &Table, writer: W, label: &Path) -> SinkResult<W> {
    let mut wtr = csv::Writer::from_writer(writer);
    let csv_error = |source| SinkError::Csv {
        path: label.to_path_buf(),
        source,
    };

    wtr.write_record(table.columns()).map_err(csv_error)?;
    for row in table.raw_rows() {
        wtr.write_record(row.iter().map(Value::render))
            .map_err(csv_error)?;
    }

    wtr.into_inner().map_err(|e| SinkError::Io {
        path: label.to_path_buf(),
        source: e.into_error(),
    })
}

fn write_file(table: &Table, path: &Path) -> SinkResult<()> {
    let file = File::create(path).map_err(io_error(path))?;
    let file = write_csv_to(table, file, path)?;
    file.sync_all().map_err(io_error(path))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn io_error(path: &Path) -> impl Fn(io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}
