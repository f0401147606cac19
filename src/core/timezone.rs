//! Converts the `time_stamp` column to zoned instants.
//!
//! Values without an offset are read as UTC. Values carrying an offset are
//! first reduced to UTC, so every cell maps to one absolute instant before the
//! target zone's DST rules are applied.

use crate::domain::model::{Table, Value, TIME_STAMP};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses one timestamp cell into a UTC instant.
///
/// Tries RFC 3339 first, then a handful of offset-aware and naive layouts,
/// bare dates (midnight UTC), and finally integer epoch seconds.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // PurpleAir downloads sometimes spell UTC out instead of using `Z`
    let text = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed);

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    if text.len() >= 9 && text.chars().all(|c| c.is_ascii_digit()) {
        return text
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
    }

    None
}

/// Converts a single cell to the target zone. `row` is 1-based for error messages.
pub fn zone_value(value: &Value, tz: &Tz, row: usize) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Timestamp(ts) => Ok(Value::Timestamp(ts.with_timezone(tz))),
        Value::Text(raw) if raw.trim().is_empty() => Ok(Value::Null),
        Value::Text(raw) => parse_instant(raw)
            .map(|utc| Value::Timestamp(utc.with_timezone(tz)))
            .ok_or_else(|| EtlError::TimestampParseError {
                row,
                value: raw.clone(),
            }),
        Value::Number(n) => Err(EtlError::TimestampParseError {
            row,
            value: n.to_string(),
        }),
    }
}

/// Returns a copy of `table` whose `time_stamp` cells are zoned to `tz`.
///
/// Fails with `SchemaError` when the column is absent and with
/// `TimestampParseError` on the first unreadable cell.
pub fn normalize(table: &Table, tz: &Tz) -> Result<Table> {
    let mut out = table.clone();
    normalize_in_place(&mut out, tz)?;
    Ok(out)
}

pub(crate) fn normalize_in_place(table: &mut Table, tz: &Tz) -> Result<()> {
    let idx = table.require_column(TIME_STAMP)?;
    for (i, row) in table.rows.iter_mut().enumerate() {
        row[idx] = zone_value(&row[idx], tz, i + 1)?;
    }
    tracing::debug!("Normalized {} timestamps to {}", table.len(), tz.name());
    Ok(())
}
