//! Date parsing and timestamp helpers shared by the pipeline crates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{ChartError, Result};
use crate::types::SECONDS_PER_DAY;

/// Epoch values above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Converts an epoch value in seconds or milliseconds to seconds.
pub const fn normalize_epoch(value: i64) -> i64 {
    if value.unsigned_abs() >= MILLIS_THRESHOLD as u64 {
        value / 1_000
    } else {
        value
    }
}

/// Normalises an epoch value, rejecting results outside the calendar range.
pub fn checked_epoch(value: i64) -> Option<i64> {
    let seconds = normalize_epoch(value);
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|_| seconds)
}

/// Truncates a timestamp in seconds to 00:00 UTC of the same day.
pub const fn start_of_utc_day(timestamp: i64) -> i64 {
    timestamp.div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
}

/// Parses the date formats the data API emits into unix seconds.
///
/// Accepts `YYYY-MM-DD`, RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and bare epoch numbers in seconds or milliseconds.
pub fn parse_date(input: &str) -> Result<i64> {
    let trimmed = input.trim();

    if let Ok(epoch) = trimmed.parse::<i64>() {
        return checked_epoch(epoch).ok_or_else(|| ChartError::parse("date out of range", input));
    }

    if let Ok(epoch) = trimmed.parse::<f64>() {
        if epoch.is_finite() {
            return checked_epoch(epoch.trunc() as i64)
                .ok_or_else(|| ChartError::parse("date out of range", input));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| ChartError::parse("date out of range", input));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc().timestamp());
    }

    Err(ChartError::parse("unrecognised date format", input))
}

/// Formats a timestamp in seconds as `YYYY-MM-DD` (UTC).
pub fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Current unix time in seconds.
pub fn now_seconds() -> i64 {
    Utc::now().timestamp()
}
