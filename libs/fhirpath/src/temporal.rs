//! Date/time parsing, rendering, and precision-aware comparison
//!
//! FHIR resources carry dates as strings; FHIRPath literals carry an explicit
//! precision. Comparison is component-wise: when two values agree on every
//! component they share but differ in precision, the order is undecidable and
//! the comparison yields empty.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use std::cmp::Ordering;

use crate::value::{DatePrecision, DateTimePrecision, TimePrecision, Value};

pub(crate) fn parse_date_value(input: &str) -> Option<Value> {
    let s = input.trim();
    match s.len() {
        4 => {
            let date = NaiveDate::parse_from_str(&format!("{s}-01-01"), "%Y-%m-%d").ok()?;
            Some(Value::date(date, DatePrecision::Year))
        }
        7 => {
            let date = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()?;
            Some(Value::date(date, DatePrecision::Month))
        }
        10 => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some(Value::date(date, DatePrecision::Day))
        }
        _ => None,
    }
}

pub(crate) fn parse_time_value(input: &str) -> Option<Value> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    let precision = if s.contains('.') {
        TimePrecision::Millisecond
    } else if s.matches(':').count() >= 2 {
        TimePrecision::Second
    } else if s.contains(':') {
        TimePrecision::Minute
    } else {
        TimePrecision::Hour
    };

    // Hour-only times carry too little for chrono's parser; build directly.
    if precision == TimePrecision::Hour {
        if s.len() != 2 || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let hour: u32 = s.parse().ok()?;
        return NaiveTime::from_hms_opt(hour, 0, 0)
            .map(|value| Value::time(value, TimePrecision::Hour));
    }

    let value = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()?;

    Some(Value::time(value, precision))
}

/// Parse a datetime string; date-only inputs become datetimes with date
/// precision so mixed comparisons stay decidable.
pub(crate) fn parse_datetime_value(input: &str) -> Option<Value> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }

    let Some((date_part, rest)) = raw.split_once('T') else {
        let date_value = parse_date_value(raw)?;
        let Value::Date { value, precision } = date_value else {
            return None;
        };
        return Some(date_to_datetime(value, precision));
    };

    let date_value = parse_date_value(date_part)?;
    let Value::Date {
        value: date,
        precision: date_precision,
    } = date_value
    else {
        return None;
    };

    let (time_part, tz_offset) = split_timezone(rest)?;
    let (time, mut precision) = parse_datetime_time(time_part)?;
    // A bare trailing T (e.g. `2015T`) keeps the date's own precision.
    if time_part.trim().is_empty() {
        precision = match date_precision {
            DatePrecision::Year => DateTimePrecision::Year,
            DatePrecision::Month => DateTimePrecision::Month,
            DatePrecision::Day => DateTimePrecision::Day,
        };
    }

    let local = NaiveDateTime::new(date, time);
    let offset = FixedOffset::east_opt(tz_offset.unwrap_or(0))?;
    let value = offset.from_local_datetime(&local).single()?;

    Some(Value::datetime(value, precision, tz_offset))
}

pub(crate) fn date_to_datetime(date: NaiveDate, precision: DatePrecision) -> Value {
    let local = NaiveDateTime::new(date, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let offset = FixedOffset::east_opt(0).unwrap();
    let value = offset.from_local_datetime(&local).single().unwrap();
    let precision = match precision {
        DatePrecision::Year => DateTimePrecision::Year,
        DatePrecision::Month => DateTimePrecision::Month,
        DatePrecision::Day => DateTimePrecision::Day,
    };
    Value::datetime(value, precision, None)
}

fn split_timezone(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return Some((stripped, Some(0)));
    }

    if let Some(pos) = rest.rfind(['+', '-']) {
        let (time, tz) = rest.split_at(pos);
        if tz.len() >= 6 && tz.as_bytes().get(3) == Some(&b':') {
            let sign = if tz.starts_with('-') { -1 } else { 1 };
            let hours: i32 = tz[1..3].parse().ok()?;
            let minutes: i32 = tz[4..6].parse().ok()?;
            return Some((time, Some(sign * (hours * 3600 + minutes * 60))));
        }
    }

    Some((rest, None))
}

fn parse_datetime_time(time_part: &str) -> Option<(NaiveTime, DateTimePrecision)> {
    let time_part = time_part.trim();
    if time_part.is_empty() {
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, DateTimePrecision::Day));
    }

    let (main, frac) = time_part
        .split_once('.')
        .map(|(a, b)| (a, Some(b)))
        .unwrap_or((time_part, None));

    let parts: Vec<&str> = main.split(':').collect();
    let (hour_str, minute_str, second_str, precision) = match parts.as_slice() {
        [hh] => (*hh, "0", "0", DateTimePrecision::Hour),
        [hh, mm] => (*hh, *mm, "0", DateTimePrecision::Minute),
        [hh, mm, ss] => (
            *hh,
            *mm,
            *ss,
            if frac.is_some() {
                DateTimePrecision::Millisecond
            } else {
                DateTimePrecision::Second
            },
        ),
        _ => return None,
    };

    let hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;
    let second: u32 = second_str.parse().ok()?;

    let nanos: u32 = if let Some(frac) = frac {
        let digits: String = frac.chars().take(3).collect();
        let padded = format!("{digits:0<3}");
        let ms: u32 = padded.parse().ok()?;
        ms * 1_000_000
    } else {
        0
    };

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some((time, precision))
}

fn date_components(date: NaiveDate, precision: DatePrecision) -> Vec<i64> {
    let mut out = vec![date.year() as i64];
    if precision >= DatePrecision::Month {
        out.push(date.month() as i64);
    }
    if precision >= DatePrecision::Day {
        out.push(date.day() as i64);
    }
    out
}

fn datetime_components(dt: DateTime<FixedOffset>, precision: DateTimePrecision) -> Vec<i64> {
    let utc = crate::value::to_utc(&dt);
    let mut out = vec![utc.year() as i64];
    let levels = [
        (DateTimePrecision::Month, utc.month() as i64),
        (DateTimePrecision::Day, utc.day() as i64),
        (DateTimePrecision::Hour, utc.hour() as i64),
        (DateTimePrecision::Minute, utc.minute() as i64),
        (DateTimePrecision::Second, utc.second() as i64),
        (
            DateTimePrecision::Millisecond,
            utc.timestamp_subsec_millis() as i64,
        ),
    ];
    for (level, component) in levels {
        if precision >= level {
            out.push(component);
        }
    }
    out
}

fn time_components(time: NaiveTime, precision: TimePrecision) -> Vec<i64> {
    let mut out = vec![time.hour() as i64];
    let levels = [
        (TimePrecision::Minute, time.minute() as i64),
        (TimePrecision::Second, time.second() as i64),
        (
            TimePrecision::Millisecond,
            (time.nanosecond() / 1_000_000) as i64,
        ),
    ];
    for (level, component) in levels {
        if precision >= level {
            out.push(component);
        }
    }
    out
}

/// Compare component lists up to the shared precision. Differing components
/// decide the order; agreement up to a precision mismatch is undecidable.
fn cmp_components(left: &[i64], right: &[i64]) -> Option<Ordering> {
    let shared = left.len().min(right.len());
    for i in 0..shared {
        match left[i].cmp(&right[i]) {
            Ordering::Equal => {}
            other => return Some(other),
        }
    }
    if left.len() == right.len() {
        Some(Ordering::Equal)
    } else {
        None
    }
}

pub(crate) fn date_cmp(
    a: NaiveDate,
    ap: DatePrecision,
    b: NaiveDate,
    bp: DatePrecision,
) -> Option<Ordering> {
    cmp_components(&date_components(a, ap), &date_components(b, bp))
}

pub(crate) fn datetime_cmp(
    a: DateTime<FixedOffset>,
    ap: DateTimePrecision,
    b: DateTime<FixedOffset>,
    bp: DateTimePrecision,
) -> Option<Ordering> {
    cmp_components(&datetime_components(a, ap), &datetime_components(b, bp))
}

pub(crate) fn time_cmp(
    a: NaiveTime,
    ap: TimePrecision,
    b: NaiveTime,
    bp: TimePrecision,
) -> Option<Ordering> {
    cmp_components(&time_components(a, ap), &time_components(b, bp))
}

fn format_timezone_suffix(offset_secs: i32) -> String {
    if offset_secs == 0 {
        return "Z".to_string();
    }
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.abs();
    format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// Canonical textual form of a temporal value (no `@` prefix).
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Date {
            value: d,
            precision,
        } => match precision {
            DatePrecision::Year => d.format("%Y").to_string(),
            DatePrecision::Month => d.format("%Y-%m").to_string(),
            DatePrecision::Day => d.format("%Y-%m-%d").to_string(),
        },
        Value::DateTime {
            value: dt,
            precision,
            timezone_offset,
        } => {
            let local = match timezone_offset {
                Some(offset_secs) => {
                    let offset = FixedOffset::east_opt(*offset_secs)
                        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
                    dt.with_timezone(&offset)
                }
                None => *dt,
            };
            let (body, include_tz) = match precision {
                DateTimePrecision::Year => (local.format("%Y").to_string(), false),
                DateTimePrecision::Month => (local.format("%Y-%m").to_string(), false),
                DateTimePrecision::Day => (local.format("%Y-%m-%d").to_string(), false),
                DateTimePrecision::Hour => (local.format("%Y-%m-%dT%H").to_string(), true),
                DateTimePrecision::Minute => (local.format("%Y-%m-%dT%H:%M").to_string(), true),
                DateTimePrecision::Second => (local.format("%Y-%m-%dT%H:%M:%S").to_string(), true),
                DateTimePrecision::Millisecond => (
                    format!(
                        "{}.{:03}",
                        local.format("%Y-%m-%dT%H:%M:%S"),
                        local.timestamp_subsec_millis()
                    ),
                    true,
                ),
            };
            match (include_tz, timezone_offset) {
                (true, Some(offset)) => format!("{body}{}", format_timezone_suffix(*offset)),
                _ => body,
            }
        }
        Value::Time {
            value: t,
            precision,
        } => match precision {
            TimePrecision::Hour => t.format("%H").to_string(),
            TimePrecision::Minute => t.format("%H:%M").to_string(),
            TimePrecision::Second => t.format("%H:%M:%S").to_string(),
            TimePrecision::Millisecond => {
                format!(
                    "{}.{:03}",
                    t.format("%H:%M:%S"),
                    t.nanosecond() / 1_000_000
                )
            }
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_precisions() {
        assert!(matches!(
            parse_date_value("2024"),
            Some(Value::Date {
                precision: DatePrecision::Year,
                ..
            })
        ));
        assert!(matches!(
            parse_date_value("2024-03"),
            Some(Value::Date {
                precision: DatePrecision::Month,
                ..
            })
        ));
        assert!(matches!(
            parse_date_value("2024-03-15"),
            Some(Value::Date {
                precision: DatePrecision::Day,
                ..
            })
        ));
        assert!(parse_date_value("2024-3").is_none());
    }

    #[test]
    fn test_precision_mismatch_is_undecidable() {
        let Some(Value::Date {
            value: a,
            precision: ap,
        }) = parse_date_value("2024")
        else {
            panic!("parse failed")
        };
        let Some(Value::Date {
            value: b,
            precision: bp,
        }) = parse_date_value("2024-03-15")
        else {
            panic!("parse failed")
        };
        // Same shared prefix, different precision: unknown order.
        assert_eq!(date_cmp(a, ap, b, bp), None);
        // Different year: decidable despite precision mismatch.
        let Some(Value::Date {
            value: c,
            precision: cp,
        }) = parse_date_value("2025-01-01")
        else {
            panic!("parse failed")
        };
        assert_eq!(date_cmp(a, ap, c, cp), Some(Ordering::Less));
    }

    #[test]
    fn test_datetime_timezone_normalization() {
        let Some(Value::DateTime {
            value: a,
            precision: ap,
            ..
        }) = parse_datetime_value("2024-01-01T12:00:00+02:00")
        else {
            panic!("parse failed")
        };
        let Some(Value::DateTime {
            value: b,
            precision: bp,
            ..
        }) = parse_datetime_value("2024-01-01T10:00:00Z")
        else {
            panic!("parse failed")
        };
        assert_eq!(datetime_cmp(a, ap, b, bp), Some(Ordering::Equal));
    }

    #[test]
    fn test_render_round_trips_precision() {
        let date = parse_date_value("2024-03").unwrap();
        assert_eq!(render_value(&date), "2024-03");

        let dt = parse_datetime_value("2024-01-01T10:30:00Z").unwrap();
        assert_eq!(render_value(&dt), "2024-01-01T10:30:00Z");

        let time = parse_time_value("14:30").unwrap();
        assert_eq!(render_value(&time), "14:30");
    }
}
