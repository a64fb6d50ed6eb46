//! Interval parsing for the `agg` command.
//!
//! Accepts the compact duration syntax users know from Go tooling: one or
//! more decimal numbers each followed by a unit, such as `30s`, `1m`,
//! `1h30m` or `1.5h`. Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`
//! and `h`. A bare `0` is also accepted.

use std::time::Duration;

use crate::{GatorError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest duration accepted, in nanoseconds.
const MAX_NANOS: u128 = i64::MAX as u128;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a duration string such as `1m` or `2h45m30.5s`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |why: &str| GatorError::Validation(format!("invalid duration {input:?}: {why}"));

    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid("empty"));
    }

    let mut rest = s;
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(tail.len());
                tail.split_at(frac_len)
            }
            None => ("", after),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, tail) = after.split_at(unit_len);
        let per_unit = match unit_nanos(unit) {
            Some(n) => n,
            None if unit.is_empty() => return Err(invalid("missing unit")),
            None => return Err(invalid(&format!("unknown unit {unit:?}"))),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("number too large"))?
        };
        let mut nanos = whole
            .checked_mul(per_unit)
            .ok_or_else(|| invalid("too large"))?;

        if !frac_part.is_empty() {
            // Digits past nanosecond resolution cannot change the result.
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| invalid("bad fraction"))?;
            let scale = 10u128.pow(digits.len() as u32);
            nanos += numerator * per_unit / scale;
        }

        total = total
            .checked_add(nanos)
            .filter(|t| *t <= MAX_NANOS)
            .ok_or_else(|| invalid("too large"))?;
        rest = tail;
    }

    Ok(Duration::from_nanos(total as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_units() {
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("15us").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("15µs").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(
            parse_duration("2h45m30.5s").unwrap(),
            Duration::from_millis((2 * 3600 + 45 * 60 + 30) * 1000 + 500)
        );
    }

    #[test]
    fn test_fractions() {
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1.s").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_and_sign() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("+10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid() {
        for input in ["", "10", "abc", "-1s", "1d", "1.2.3s", ".s", "s", "1h-5m"] {
            assert!(
                matches!(parse_duration(input), Err(GatorError::Validation(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_error_names_input() {
        let err = parse_duration("5 minutes").unwrap_err();
        assert!(err.to_string().contains("5 minutes"));
    }

    #[test]
    fn test_overflow() {
        assert!(parse_duration("9999999999999999h").is_err());
    }
}
