//! Delimited-text extractor with encoding and delimiter auto-detection.
//!
//! Turns a CSV-like source into a typed [`Table`]. Column types are inferred
//! per column: all-integer columns become [`Value::Int`], all-numeric columns
//! become [`Value::Float`], everything else stays text. Missing-value markers
//! become [`Value::Null`].

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{ExtractionError, ExtractionResult};
use crate::models::{ColumnKind, Table, Value};

/// Cell contents treated as a missing value.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Result of extraction with parse metadata.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub table: Table,
    /// Detected encoding of the raw bytes
    pub encoding: String,
    /// Detected or configured delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8. A leading
/// byte order mark is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        // Latin-1 labels decode as Windows-1252, its superset.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to `,` when the header holds none of the candidates.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &CANDIDATE_DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Printable form of a delimiter, with tab shown as `\t`.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

/// Read and extract a file.
pub fn extract_path<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> ExtractionResult<Extracted> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract_bytes(&bytes, delimiter)
}

/// Read a stream to the end and extract it.
pub fn extract_reader<R: Read>(mut reader: R, delimiter: Option<char>) -> ExtractionResult<Extracted> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| ExtractionError::Io {
            path: PathBuf::from("<stream>"),
            source,
        })?;
    extract_bytes(&bytes, delimiter)
}

/// Extract raw bytes, detecting the encoding and (unless given) the delimiter.
pub fn extract_bytes(bytes: &[u8], delimiter: Option<char>) -> ExtractionResult<Extracted> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = extract_str(&content, delimiter)?;

    Ok(Extracted {
        table,
        encoding,
        delimiter,
    })
}

/// Extract already-decoded text with an explicit delimiter.
///
/// The first non-blank line is the header. Short rows are padded with nulls;
/// rows wider than the header are rejected.
///
/// # Example
/// ```
/// use carsales::parser::extract_str;
/// use carsales::Value;
///
/// let table = extract_str("make,odometer\nKia,16639\nBMW,1331", ',').unwrap();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.row(0).unwrap().get("odometer"), Some(&Value::Int(16639)));
/// ```
pub fn extract_str(content: &str, delimiter: char) -> ExtractionResult<Table> {
    if !delimiter.is_ascii() {
        return Err(ExtractionError::Delimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(ExtractionError::Empty),
    };
    let columns = dedupe_headers(header.iter().map(str::to_string).collect());
    let width = columns.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in records {
        let record = record?;
        if record.len() > width {
            return Err(ExtractionError::Malformed {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }

        let mut cells: Vec<Option<String>> = record.iter().map(cell).collect();
        cells.resize(width, None);
        raw_rows.push(cells);
    }

    let kinds: Vec<ColumnKind> = (0..width)
        .map(|idx| infer_kind(raw_rows.iter().map(|row| row[idx].as_deref())))
        .collect();

    let mut table = Table::new(columns);
    for row in raw_rows {
        let values = row
            .into_iter()
            .zip(&kinds)
            .map(|(cell, kind)| typed_value(cell, *kind))
            .collect();
        table.push_row(values);
    }

    Ok(table)
}

fn cell(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw.trim()) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Make header names unique: repeats become `name.1`, `name.2`, ...
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for name in raw {
        let mut candidate = name.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", name, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}

fn infer_kind<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut any = false;

    for cell in cells.flatten() {
        any = true;
        let s = cell.trim();
        if kind == ColumnKind::Integer && s.parse::<i64>().is_ok() {
            continue;
        }
        if s.parse::<f64>().is_ok() {
            kind = ColumnKind::Real;
        } else {
            return ColumnKind::Text;
        }
    }

    if any {
        kind
    } else {
        ColumnKind::Text
    }
}

fn typed_value(cell: Option<String>, kind: ColumnKind) -> Value {
    let Some(s) = cell else {
        return Value::Null;
    };
    match kind {
        ColumnKind::Integer => s.trim().parse().map(Value::Int).unwrap_or(Value::Text(s)),
        ColumnKind::Real => s.trim().parse().map(Value::Float).unwrap_or(Value::Text(s)),
        ColumnKind::Timestamp | ColumnKind::Text => Value::Text(s),
    }
}
