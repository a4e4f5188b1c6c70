//! Lossy date normalization.
//!
//! Upstream feeds hand these helpers dates in whatever shape the producing
//! system used: ISO strings, epoch seconds or milliseconds, Mongo-style
//! document objects, object ids. Normalizers are lossy by contract — input
//! that cannot be interpreted yields `None`, never an error, so a single bad
//! row does not abort a batch.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Default output format used across the toolkit.
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// String values treated as "no date".
const NULL_SENTINELS: [&str; 3] = ["nan", "NaT", "None"];

/// Candidate layouts for free-form ISO-ish strings, most specific first.
const ISO_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
];

/// Normalize a day-first date string ("31-01-2024") to "2024-01-31".
///
/// Non-empty input that is not day-first passes through trimmed; empty input
/// yields `None`.
pub fn normalize_day_first(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match NaiveDate::parse_from_str(trimmed, "%d-%m-%Y") {
        Ok(date) => Some(date.format("%Y-%m-%d").to_string()),
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Normalize a date of unknown shape to a formatted string.
///
/// Accepted shapes:
/// - ISO-8601-ish strings, with or without time, trailing `Z` tolerated
/// - epoch timestamps as numbers or numeric strings; values longer than ten
///   digits are truncated to seconds
/// - document objects `{"milliseconds": n}` or `{"$date": {"$numberLong": "n"}}`
///
/// Null, empty strings, and the sentinels "nan"/"NaT"/"None" yield `None`,
/// as does anything unparsable.
pub fn format_flexible(value: &JsonValue, fmt: &str) -> Option<String> {
    let formatted = match value {
        JsonValue::Null => None,
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ts| format_epoch(ts, fmt)),
        JsonValue::String(s) => format_str(s, fmt),
        JsonValue::Object(_) => epoch_from_document(value).and_then(|ts| format_epoch(ts, fmt)),
        _ => None,
    };

    if formatted.is_none() && !value.is_null() {
        tracing::debug!(value = %value, "unparsable date input");
    }
    formatted
}

fn format_str(raw: &str, fmt: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed) {
        return None;
    }

    if crate::numeric::is_numeric_value(trimmed) {
        let secs = truncate_to_seconds(trimmed).parse::<f64>().ok()? as i64;
        return format_epoch(secs, fmt);
    }

    let cleaned = trimmed.trim_end_matches('Z');
    for layout in ISO_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, layout) {
            return Some(dt.format(fmt).to_string());
        }
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, layout) {
            return Some(date.and_hms_opt(0, 0, 0)?.format(fmt).to_string());
        }
    }
    None
}

/// Epoch timestamps wider than ten digits carry sub-second precision; keep
/// the leading ten digits (seconds).
fn truncate_to_seconds(digits: &str) -> &str {
    if digits.len() > 10 {
        &digits[..10]
    } else {
        digits
    }
}

fn format_epoch(ts: i64, fmt: &str) -> Option<String> {
    let secs: i64 = truncate_to_seconds(&ts.to_string()).parse().ok()?;
    let dt = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(dt.format(fmt).to_string())
}

/// Pull an epoch value out of a document-shaped date.
fn epoch_from_document(value: &JsonValue) -> Option<i64> {
    let field = if value["milliseconds"] != JsonValue::Null {
        &value["milliseconds"]
    } else {
        &value["$date"]["$numberLong"]
    };

    match field {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Normalize an event-time string ("2024-01-31 10:15:00.123 GMT").
///
/// The zone marker and fractional seconds are dropped before parsing with
/// the target format.
pub fn from_event_time(raw: &str, fmt: &str) -> Option<String> {
    let cleaned = raw.replace("GMT", "");
    let cleaned = cleaned.trim();
    let cleaned = cleaned.split('.').next()?;

    if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
        return Some(dt.format(fmt).to_string());
    }
    let date = NaiveDate::parse_from_str(cleaned, fmt).ok()?;
    Some(date.format(fmt).to_string())
}

/// Normalize a Mongo extended-ISO timestamp ("2024-01-31T10:15:00.123+00:00").
pub fn from_mongo_iso(raw: &str, fmt: &str) -> Option<String> {
    let dt = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f+00:00").ok()?;
    Some(dt.format(fmt).to_string())
}

/// Creation time of a 24-hex-character object id.
///
/// The leading four bytes of an object id are its creation time as epoch
/// seconds; they are decoded directly rather than through a driver.
pub fn from_object_id(hex: &str, fmt: &str) -> Option<String> {
    let hex = hex.trim();
    if hex.len() != 24 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let secs = u32::from_str_radix(&hex[..8], 16).ok()?;
    format_epoch(i64::from(secs), fmt)
}

/// Error from [`date_range_from`].
#[derive(Error, Debug)]
#[error("invalid start date '{raw}': expected YYYY-MM-DD")]
pub struct DateRangeError {
    raw: String,
}

/// Daily "YYYY-MM-DD" strings from `start` through today (UTC), inclusive.
///
/// A start date in the future yields an empty list.
pub fn date_range_from(start: &str) -> Result<Vec<String>, DateRangeError> {
    let start_date = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| {
        DateRangeError {
            raw: start.to_string(),
        }
    })?;

    let today = Utc::now().date_naive();
    let mut dates = Vec::new();
    let mut current = start_date;
    while current <= today {
        dates.push(current.format("%Y-%m-%d").to_string());
        current = current + Duration::days(1);
    }

    Ok(dates)
}
