//! Date/time utilities for gator.
//!
//! Timestamps are stored as RFC 3339 UTC text with a fixed microsecond
//! precision, so lexical order in SQL matches chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

use crate::{GatorError, Result};

/// Render a timestamp in the storage format.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp read back from the database.
///
/// Accepts the storage format as well as the plain `YYYY-MM-DD HH:MM:SS`
/// that SQL `now()` helpers produce.
pub fn parse_db_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    Err(GatorError::Database(format!("invalid stored timestamp: {s}")))
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}
