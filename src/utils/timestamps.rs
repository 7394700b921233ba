use crate::utils::constants::EPOCH_MILLIS_THRESHOLD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const NAIVE_DATETIME_FORMATS: [&str; 10] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M %p",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parse a date-like cell into a UTC timestamp.
///
/// Strings are tried against RFC 3339, offset-carrying layouts, naive
/// date-times and plain dates (naive values are taken as UTC). Integers are
/// Unix epochs in seconds, or milliseconds above `EPOCH_MILLIS_THRESHOLD`;
/// floats follow the same rule.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => {
            if let Some(epoch) = n.as_i64() {
                from_epoch(epoch)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .and_then(from_epoch_float)
            }
        }
        _ => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    s.parse::<i64>().ok().and_then(from_epoch)
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.abs() > EPOCH_MILLIS_THRESHOLD {
        from_epoch_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

fn from_epoch_float(epoch: f64) -> Option<DateTime<Utc>> {
    if epoch.abs() > EPOCH_MILLIS_THRESHOLD as f64 {
        from_epoch_millis(epoch.round() as i64)
    } else {
        from_epoch_millis((epoch * 1000.0).round() as i64)
    }
}

fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Canonical timestamp string for a cell, or `Value::Null` when unparseable.
pub fn canonicalize_timestamp(value: &Value) -> Value {
    parse_timestamp(value)
        .map(|dt| Value::String(format_timestamp(&dt)))
        .unwrap_or(Value::Null)
}
