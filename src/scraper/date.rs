//! Publish-date normalization.
//!
//! Feeds in the wild use a handful of RFC layouts for `pubDate`. Each raw
//! string is tried against a fixed, ordered list of layouts and the first
//! match wins.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use thiserror::Error;

/// A publish date that matched none of the supported layouts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to parse publish date {raw:?}: {reason}")]
pub struct DateParseError {
    /// The string exactly as it appeared in the feed.
    pub raw: String,
    /// Why the last candidate layout rejected it.
    pub reason: String,
}

/// Supported publish-date layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02T15:04:05.999999999Z07:00`
    Rfc3339Nano,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
    /// `Monday, 02-Jan-06 15:04:05 MST`
    Rfc850,
}

/// Layouts in the order they are tried.
pub const DATE_LAYOUTS: [DateLayout; 7] = [
    DateLayout::Rfc1123,
    DateLayout::Rfc1123Z,
    DateLayout::Rfc3339,
    DateLayout::Rfc3339Nano,
    DateLayout::Rfc822,
    DateLayout::Rfc822Z,
    DateLayout::Rfc850,
];

impl DateLayout {
    /// Conventional name of the layout.
    pub fn name(self) -> &'static str {
        match self {
            DateLayout::Rfc1123 => "RFC1123",
            DateLayout::Rfc1123Z => "RFC1123Z",
            DateLayout::Rfc3339 => "RFC3339",
            DateLayout::Rfc3339Nano => "RFC3339Nano",
            DateLayout::Rfc822 => "RFC822",
            DateLayout::Rfc822Z => "RFC822Z",
            DateLayout::Rfc850 => "RFC850",
        }
    }

    fn parse(self, s: &str) -> Result<DateTime<FixedOffset>, String> {
        match self {
            DateLayout::Rfc1123 => {
                parse_named_zone(strip_weekday(s, &SHORT_DAY_NAMES)?, "%d %b %Y %H:%M:%S")
            }
            DateLayout::Rfc1123Z => {
                parse_numeric_zone(strip_weekday(s, &SHORT_DAY_NAMES)?, "%d %b %Y %H:%M:%S %z")
            }
            DateLayout::Rfc3339 => {
                if has_fraction(s) {
                    return Err("fractional seconds present".to_string());
                }
                DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string())
            }
            DateLayout::Rfc3339Nano => {
                if !has_fraction(s) {
                    return Err("fractional seconds missing".to_string());
                }
                DateTime::parse_from_rfc3339(s).map_err(|e| e.to_string())
            }
            DateLayout::Rfc822 => parse_named_zone(s, "%d %b %y %H:%M"),
            DateLayout::Rfc822Z => parse_numeric_zone(s, "%d %b %y %H:%M %z"),
            DateLayout::Rfc850 => {
                parse_named_zone(strip_weekday(s, &LONG_DAY_NAMES)?, "%d-%b-%y %H:%M:%S")
            }
        }
    }
}

impl fmt::Display for DateLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalize a raw publish date.
///
/// Leading and trailing whitespace is ignored. The returned value keeps the
/// offset written in the feed; convert with `with_timezone(&Utc)` to store.
pub fn parse_publish_date(raw: &str) -> Result<DateTime<FixedOffset>, DateParseError> {
    parse_publish_date_with_layout(raw).map(|(dt, _)| dt)
}

/// Like [`parse_publish_date`], also reporting which layout matched.
pub fn parse_publish_date_with_layout(
    raw: &str,
) -> Result<(DateTime<FixedOffset>, DateLayout), DateParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateParseError {
            raw: raw.to_string(),
            reason: "empty date".to_string(),
        });
    }

    let mut reason = String::new();
    for layout in DATE_LAYOUTS {
        match layout.parse(trimmed) {
            Ok(dt) => return Ok((dt, layout)),
            Err(e) => reason = format!("{layout}: {e}"),
        }
    }

    Err(DateParseError {
        raw: raw.to_string(),
        reason,
    })
}

const SHORT_DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const LONG_DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Drop a leading `Day, ` prefix.
///
/// The name must be a real weekday but is not checked against the date;
/// feeds often get it wrong.
fn strip_weekday<'a>(s: &'a str, names: &[&str]) -> Result<&'a str, String> {
    let (day, rest) = s
        .split_once(", ")
        .ok_or_else(|| "missing weekday".to_string())?;
    if names.iter().any(|name| name.eq_ignore_ascii_case(day)) {
        Ok(rest)
    } else {
        Err(format!("unknown weekday {day:?}"))
    }
}

fn has_fraction(s: &str) -> bool {
    s.as_bytes().get(19) == Some(&b'.')
}

fn parse_numeric_zone(s: &str, layout: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_str(s, layout).map_err(|e| e.to_string())
}

fn parse_named_zone(s: &str, layout: &str) -> Result<DateTime<FixedOffset>, String> {
    let (head, zone) = s
        .rsplit_once(' ')
        .ok_or_else(|| "missing time zone".to_string())?;
    let offset = zone_offset(zone).ok_or_else(|| format!("unknown time zone {zone:?}"))?;
    let naive = NaiveDateTime::parse_from_str(head, layout).map_err(|e| e.to_string())?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| "ambiguous local time".to_string())
}

/// Offset for a zone abbreviation.
///
/// Abbreviations carry no offset of their own: every one of them, `EST`
/// and `PST` included, is read as UTC. Anything that is not a short
/// alphabetic name is rejected.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let known = matches!(zone.to_ascii_uppercase().as_str(), "UT" | "UTC" | "GMT" | "Z");
    let abbreviation =
        (3..=5).contains(&zone.len()) && zone.bytes().all(|b| b.is_ascii_alphabetic());
    if known || abbreviation {
        FixedOffset::east_opt(0)
    } else {
        None
    }
}
