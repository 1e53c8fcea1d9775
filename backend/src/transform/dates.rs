//! Sale date normalization.
//!
//! [`normalize_dates`] replaces the free-form text of the date column with a
//! typed [`SaleDate`]. Rows whose value cannot be parsed are dropped and
//! counted, never reported as an error.
//!
//! Parsing is permissive. Before matching against the known layouts, the
//! input is cleaned up:
//!
//! ```text
//! "Tue Dec 16 2014 12:30:00 GMT-0800 (PST)"
//!   → drop weekday          "Dec 16 2014 12:30:00 GMT-0800 (PST)"
//!   → drop zone name        "Dec 16 2014 12:30:00 GMT-0800"
//!   → GMT/UTC offset prefix "Dec 16 2014 12:30:00 -0800"
//!   → %b %d %Y %H:%M:%S %z  2014-12-16 12:30:00-08:00
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SchemaError;
use crate::models::{SaleDate, Table, Value};
use crate::validation::Filtered;

/// Default date column.
pub const SALE_DATE_COLUMN: &str = "saledate";

static LEADING_WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?,?\s+").expect("valid regex")
});

static ZONE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("valid regex"));

static PREFIXED_OFFSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:GMT|UTC)\s*([+-]\d{2}:?\d{2})").expect("valid regex")
});

static BARE_UTC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(?:GMT|UTC|Z)$").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Layouts carrying an offset. `%z` accepts both `-0800` and `-08:00`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
    "%b %d %Y %H:%M:%S %z",
    "%b %d %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%B %d %Y %H:%M:%S %z",
    "%B %d %Y %H:%M %z",
    "%d %B %Y %H:%M:%S %z",
    "%m/%d/%Y %H:%M:%S %z",
    "%Y/%m/%d %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%d %B %Y %H:%M:%S",
];

// `%b` only takes three-letter names; `%B` covers the full ones.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d %Y",
    "%d %b %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// Parse a free-form date-time string.
///
/// Returns `None` when no known layout matches.
///
/// # Example
/// ```
/// use carsales::transform::dates::parse_sale_date;
///
/// let date = parse_sale_date("Tue Dec 16 2014 12:30:00 GMT-0800 (PST)").unwrap();
/// assert_eq!(date.to_canonical(), "2014-12-16 12:30:00-08:00");
/// assert!(parse_sale_date("invalid_date").is_none());
/// ```
pub fn parse_sale_date(raw: &str) -> Option<SaleDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(SaleDate::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(SaleDate::Aware(dt));
    }

    let cleaned = clean(raw);
    let s = cleaned.as_str();

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(SaleDate::Aware(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(SaleDate::Naive(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(SaleDate::Naive);
        }
    }

    None
}

fn clean(raw: &str) -> String {
    let s = LEADING_WEEKDAY.replace(raw, "");
    let s = ZONE_NAME.replace(&s, "");
    let s = PREFIXED_OFFSET.replace(&s, "${1}");
    let s = BARE_UTC.replace(&s, " +0000");
    let s = s.replace(',', " ");
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Parse every value of `column` into a [`SaleDate`].
///
/// Values that are already dates are kept as they are, so running this twice
/// gives the same table. Rows with an unparseable or missing date are dropped;
/// the count is returned in [`Filtered::dropped`].
pub fn normalize_dates(mut table: Table, column: &str) -> Result<Filtered, SchemaError> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| SchemaError::MissingColumns(vec![column.to_string()]))?;

    let mut row = 0usize;
    let dropped = table.rewrite_column(idx, |value| {
        let parsed = match value {
            Value::DateTime(d) => Some(*d),
            Value::Text(s) => parse_sale_date(s),
            _ => None,
        };
        if parsed.is_none() {
            tracing::debug!(row, value = %value, "unparseable {}", column);
        }
        row += 1;
        parsed.map(Value::DateTime)
    });

    Ok(Filtered { table, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn aware(y: i32, m: u32, d: u32, h: u32, min: u32, offset_hours: i32) -> SaleDate {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        SaleDate::Aware(offset.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> SaleDate {
        SaleDate::Naive(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, s)
                .unwrap(),
        )
    }

    #[test]
    fn test_browser_style_dates() {
        let d = parse_sale_date("Tue Dec 16 2014 12:30:00 GMT-0800 (PST)").unwrap();
        assert_eq!(d, aware(2014, 12, 16, 12, 30, -8));
        assert_eq!(d.to_canonical(), "2014-12-16 12:30:00-08:00");

        let d = parse_sale_date("Thu Jan 15 2015 04:30:00 GMT-0800 (PST)").unwrap();
        assert_eq!(d.to_canonical(), "2015-01-15 04:30:00-08:00");
    }

    #[test]
    fn test_weekday_mismatch_tolerated() {
        // Dec 16 2014 was a Tuesday.
        let d = parse_sale_date("Fri Dec 16 2014 12:30:00 GMT-0800 (PST)").unwrap();
        assert_eq!(d, aware(2014, 12, 16, 12, 30, -8));
    }

    #[test]
    fn test_offset_forms() {
        assert_eq!(
            parse_sale_date("2014-12-16T12:30:00Z").unwrap(),
            aware(2014, 12, 16, 12, 30, 0)
        );
        assert_eq!(
            parse_sale_date("Tue, 16 Dec 2014 12:30:00 -0800").unwrap(),
            aware(2014, 12, 16, 12, 30, -8)
        );
        assert_eq!(
            parse_sale_date("Dec 16 2014 12:30:00 UTC").unwrap(),
            aware(2014, 12, 16, 12, 30, 0)
        );
        assert_eq!(
            parse_sale_date("2014-12-16 12:30:00 UTC+05:30").unwrap().to_canonical(),
            "2014-12-16 12:30:00+05:30"
        );
    }

    #[test]
    fn test_naive_forms() {
        assert_eq!(
            parse_sale_date("2014-12-16 12:30:00").unwrap(),
            naive(2014, 12, 16, 12, 30, 0)
        );
        assert_eq!(
            parse_sale_date("12/16/2014 12:30").unwrap(),
            naive(2014, 12, 16, 12, 30, 0)
        );
        assert_eq!(
            parse_sale_date("December 16, 2014").unwrap(),
            naive(2014, 12, 16, 0, 0, 0)
        );
        assert_eq!(parse_sale_date("2014-12-16").unwrap(), naive(2014, 12, 16, 0, 0, 0));
        assert!(!parse_sale_date("16 Dec 2014").unwrap().is_aware());
    }

    #[test]
    fn test_full_month_names() {
        assert_eq!(
            parse_sale_date("16 December 2014").unwrap(),
            naive(2014, 12, 16, 0, 0, 0)
        );
        assert_eq!(
            parse_sale_date("January 15, 2015 04:30:00").unwrap(),
            naive(2015, 1, 15, 4, 30, 0)
        );
        assert_eq!(
            parse_sale_date("Tuesday, December 16, 2014 12:30:00 GMT-0800").unwrap(),
            aware(2014, 12, 16, 12, 30, -8)
        );
    }

    #[test]
    fn test_bare_zulu_suffix() {
        assert_eq!(
            parse_sale_date("Dec 16 2014 12:30:00 Z").unwrap(),
            aware(2014, 12, 16, 12, 30, 0)
        );
        assert_eq!(
            parse_sale_date("2014-12-16 12:30:00 z").unwrap().to_canonical(),
            "2014-12-16 12:30:00+00:00"
        );
    }

    #[test]
    fn test_fractional_seconds_round_trip() {
        let d = parse_sale_date("2014-12-16 12:30:00.250").unwrap();
        assert_eq!(d.to_canonical(), "2014-12-16 12:30:00.250");
        assert_eq!(parse_sale_date(&d.to_canonical()), Some(d));
    }

    #[test]
    fn test_unparseable() {
        assert!(parse_sale_date("invalid_date").is_none());
        assert!(parse_sale_date("").is_none());
        assert!(parse_sale_date("2014-13-45").is_none());
        assert!(parse_sale_date("12:30:00").is_none());
    }

    #[test]
    fn test_canonical_forms_reparse_identically() {
        for raw in [
            "Tue Dec 16 2014 12:30:00 GMT-0800 (PST)",
            "2014-12-16 12:30:00",
            "2015-01-15T04:30:00+09:00",
        ] {
            let d = parse_sale_date(raw).unwrap();
            let again = parse_sale_date(&d.to_canonical()).unwrap();
            assert_eq!(again, d);
            assert_eq!(again.to_canonical(), d.to_canonical());
        }
    }

    fn dated_table(dates: &[&str]) -> Table {
        Table::from_rows(
            vec!["make", "saledate"],
            dates
                .iter()
                .map(|d| vec![Value::from("Kia"), Value::from(*d)])
                .collect(),
        )
    }

    #[test]
    fn test_normalize_drops_only_bad_rows() {
        let table = dated_table(&[
            "invalid_date",
            "Tue Dec 16 2014 12:30:00 GMT-0800 (PST)",
            "Thu Jan 15 2015 04:30:00 GMT-0800 (PST)",
        ]);
        let out = normalize_dates(table, SALE_DATE_COLUMN).unwrap();
        assert_eq!(out.dropped, 1);
        assert_eq!(out.table.len(), 2);
        for row in out.table.rows() {
            assert!(row.get("saledate").unwrap().as_date().is_some());
            assert_eq!(row.get("make"), Some(&Value::from("Kia")));
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let table = dated_table(&["2014-12-16 12:30:00", "Dec 16 2014 12:30:00 GMT+0100", "nope"]);
        let once = normalize_dates(table, SALE_DATE_COLUMN).unwrap();
        let twice = normalize_dates(once.table.clone(), SALE_DATE_COLUMN).unwrap();
        assert_eq!(twice.dropped, 0);
        assert_eq!(twice.table, once.table);
    }

    #[test]
    fn test_normalize_drops_missing_and_non_text() {
        let table = Table::from_rows(
            vec!["saledate"],
            vec![vec![Value::Null], vec![Value::Int(20141216)], vec!["2014-12-16".into()]],
        );
        let out = normalize_dates(table, SALE_DATE_COLUMN).unwrap();
        assert_eq!(out.dropped, 2);
        assert_eq!(out.table.len(), 1);
    }

    #[test]
    fn test_normalize_requires_column() {
        let table = Table::from_rows(vec!["make"], vec![vec!["Kia".into()]]);
        let err = normalize_dates(table, "saledate").unwrap_err();
        assert_eq!(err, SchemaError::MissingColumns(vec!["saledate".to_string()]));
    }
}
