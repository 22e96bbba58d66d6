//! Parsing of the flexible `start`/`end`/`step` encodings accepted by the
//! range endpoints.
//!
//! Timestamps are either Unix epoch seconds (with an optional fractional
//! part) or RFC3339 strings. Durations are either float seconds or the
//! compact Prometheus duration syntax such as `5m` or `1h30m`.

use chrono::{DateTime, Duration, Utc};

use crate::error::ParseError;

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000 * NANOS_PER_MILLI;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

/// Units of the compact duration syntax, in the order they must appear.
const DURATION_UNITS: [(&str, i64); 7] = [
    ("y", 365 * NANOS_PER_DAY),
    ("w", 7 * NANOS_PER_DAY),
    ("d", NANOS_PER_DAY),
    ("h", NANOS_PER_HOUR),
    ("m", NANOS_PER_MINUTE),
    ("s", NANOS_PER_SECOND),
    ("ms", NANOS_PER_MILLI),
];

/// Parses a timestamp. Numbers are epoch seconds and take precedence over
/// RFC3339.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, ParseError> {
    if let Ok(seconds) = s.parse::<f64>() {
        return from_epoch_seconds(seconds).ok_or_else(|| ParseError::Timestamp(s.to_string()));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    Err(ParseError::Timestamp(s.to_string()))
}

/// The fractional part is rounded to milliseconds so that float noise does
/// not show up as nanosecond jitter.
fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.trunc();
    let fraction = ((seconds - whole) * 1000.0).round() / 1000.0;
    let nanos = (fraction * NANOS_PER_SECOND as f64).round() as i64;

    DateTime::from_timestamp(whole as i64, 0)?.checked_add_signed(Duration::nanoseconds(nanos))
}

/// Parses a duration given as float seconds or in the compact syntax.
pub fn parse_duration(s: &str) -> Result<Duration, ParseError> {
    if let Ok(seconds) = s.parse::<f64>() {
        let nanos = seconds * NANOS_PER_SECOND as f64;
        if nanos > i64::MAX as f64 || nanos < i64::MIN as f64 {
            return Err(ParseError::DurationOverflow(s.to_string()));
        }
        return Ok(Duration::nanoseconds(nanos as i64));
    }
    parse_prometheus_duration(s).ok_or_else(|| ParseError::Duration(s.to_string()))
}

/// Parses `[Ny][Nw][Nd][Nh][Nm][Ns][Nms]`. Every unit may appear once, in
/// that order. A lone `0` is accepted.
pub fn parse_prometheus_duration(s: &str) -> Option<Duration> {
    if s == "0" {
        return Some(Duration::zero());
    }
    if s.is_empty() {
        return None;
    }

    let mut rest = s;
    let mut last_unit: Option<usize> = None;
    let mut total: i64 = 0;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: i64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let (index, nanos_per_unit) = DURATION_UNITS
            .iter()
            .enumerate()
            .find(|(_, (name, _))| *name == unit)
            .map(|(index, (_, nanos))| (index, *nanos))?;
        if last_unit.is_some_and(|last| index <= last) {
            return None;
        }
        last_unit = Some(index);

        total = total.checked_add(value.checked_mul(nanos_per_unit)?)?;
        rest = &rest[unit_len..];
    }

    Some(Duration::nanoseconds(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_epoch_seconds() {
        let t = assert_ok!(parse_time("0"));
        assert_eq!(t.timestamp(), 0);

        let t = assert_ok!(parse_time("1435781451"));
        assert_eq!(t.timestamp(), 1435781451);
        assert_eq!(t.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_epoch_fraction_rounds_to_millis() {
        let t = assert_ok!(parse_time("1600000000.1236"));
        assert_eq!(t.timestamp(), 1600000000);
        assert_eq!(t.timestamp_subsec_nanos(), 124_000_000);

        let t = assert_ok!(parse_time("1.5"));
        assert_eq!(t.timestamp_millis(), 1500);
    }

    #[test]
    fn test_negative_epoch_fraction() {
        let t = assert_ok!(parse_time("-1.5"));
        assert_eq!(t.timestamp_millis(), -1500);
    }

    #[test]
    fn test_epoch_round_trips_within_a_millisecond() {
        for input in ["0", "0.001", "12.345", "1435781451.781", "1700000000.9999", "-42.25"] {
            let t = assert_ok!(parse_time(input));
            let back = t.timestamp_millis() as f64 / 1000.0;
            let expected: f64 = input.parse().unwrap();
            assert!(
                (back - expected).abs() <= 0.001,
                "{input} came back as {back}"
            );
        }
    }

    #[test]
    fn test_rfc3339() {
        let t = assert_ok!(parse_time("2015-07-01T20:10:51.781Z"));
        assert_eq!(t.timestamp_millis(), 1435781451781);

        let t = assert_ok!(parse_time("2015-07-01T22:10:51+02:00"));
        assert_eq!(t.timestamp(), 1435781451);

        let t = assert_ok!(parse_time("2015-07-01T20:10:51.123456789Z"));
        assert_eq!(t.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_numbers_win_over_rfc3339() {
        // Exponent notation is a number, never a date.
        let t = assert_ok!(parse_time("1e3"));
        assert_eq!(t.timestamp(), 1000);
    }

    #[test]
    fn test_invalid_timestamps() {
        for input in ["", "yesterday", "2015-07-01", "inf", "NaN", "1e300"] {
            let err = assert_err!(parse_time(input));
            assert_eq!(err, ParseError::Timestamp(input.to_string()));
        }
    }

    #[test]
    fn test_float_durations() {
        assert_eq!(assert_ok!(parse_duration("5")), Duration::seconds(5));
        assert_eq!(assert_ok!(parse_duration("1.5")), Duration::milliseconds(1500));
        assert_eq!(assert_ok!(parse_duration("0")), Duration::zero());
        assert_eq!(assert_ok!(parse_duration("-5")), Duration::seconds(-5));
    }

    #[test]
    fn test_compact_durations() {
        assert_eq!(assert_ok!(parse_duration("5m")), Duration::minutes(5));
        assert_eq!(
            assert_ok!(parse_duration("1h30m")),
            Duration::minutes(90)
        );
        assert_eq!(assert_ok!(parse_duration("100ms")), Duration::milliseconds(100));
        assert_eq!(assert_ok!(parse_duration("1w2d")), Duration::days(9));
        assert_eq!(assert_ok!(parse_duration("1y")), Duration::days(365));
        assert_eq!(
            assert_ok!(parse_duration("1m30s500ms")),
            Duration::milliseconds(90_500)
        );
    }

    #[test]
    fn test_overflowing_durations() {
        for input in ["1e300", "-1e300", "inf", "-inf"] {
            let err = assert_err!(parse_duration(input));
            assert_eq!(err, ParseError::DurationOverflow(input.to_string()));
        }
    }

    #[test]
    fn test_invalid_durations() {
        for input in ["", "5x", "m", "30m1h", "1h1h", "1.5h", "5 m", "99999999999999999999y"] {
            let err = assert_err!(parse_duration(input));
            assert_eq!(err, ParseError::Duration(input.to_string()));
        }
    }

    #[test]
    fn test_overflow_message_differs_from_generic_failure() {
        let overflow = parse_duration("1e300").unwrap_err().to_string();
        let generic = parse_duration("abc").unwrap_err().to_string();
        assert!(overflow.contains("overflows int64"));
        assert!(!generic.contains("overflows"));
    }
}
