//! Conversion functions: `iif`, `toX()` and `convertsToX()`
//!
//! Conversions never fail: a value that cannot be converted yields empty,
//! and the `convertsTo…` variants report whether conversion would succeed.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::temporal;
use crate::value::{Collection, DatePrecision, DateTimePrecision, Value};

use super::helpers;

pub fn iif(cc: &mut CallContext, _focus: Collection, args: &[Argument]) -> Result<Collection> {
    let criterion = args[0].lazy(cc)?;
    let result = cc.eval(criterion, cc.ctx)?;

    if helpers::condition(&result) == Some(true) {
        cc.eval(args[1].lazy(cc)?, cc.ctx)
    } else {
        // A false or empty criterion selects the otherwise-branch.
        match args.get(2) {
            Some(otherwise) => cc.eval(otherwise.lazy(cc)?, cc.ctx),
            None => Ok(Collection::empty()),
        }
    }
}

fn convert(
    cc: &mut CallContext,
    focus: &Collection,
    conversion: fn(&Value) -> Option<Value>,
) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, focus)? else {
        return Ok(Collection::empty());
    };
    Ok(conversion(value)
        .map(Collection::singleton)
        .unwrap_or_default())
}

fn converts(
    cc: &mut CallContext,
    focus: &Collection,
    conversion: fn(&Value) -> Option<Value>,
) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, focus)? else {
        return Ok(Collection::empty());
    };
    Ok(helpers::boolean(conversion(value).is_some()))
}

fn string_of(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => None,
        other => Some(Value::string(other.to_string())),
    }
}

fn integer_of(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) => Some(value.clone()),
        Value::Boolean(b) => Some(Value::integer(if *b { 1 } else { 0 })),
        Value::String(s) => i64::from_str(s.trim()).ok().map(Value::integer),
        _ => None,
    }
}

fn decimal_of(value: &Value) -> Option<Value> {
    match value {
        Value::Decimal(_) => Some(value.clone()),
        Value::Integer(i) => Some(Value::decimal(Decimal::from(*i))),
        Value::Boolean(b) => Some(Value::decimal(Decimal::from(if *b { 1 } else { 0 }))),
        Value::String(s) => Decimal::from_str(s.trim()).ok().map(Value::decimal),
        _ => None,
    }
}

fn boolean_of(value: &Value) -> Option<Value> {
    match value {
        Value::Boolean(_) => Some(value.clone()),
        Value::Integer(1) => Some(Value::boolean(true)),
        Value::Integer(0) => Some(Value::boolean(false)),
        Value::Decimal(d) if *d == Decimal::ONE => Some(Value::boolean(true)),
        Value::Decimal(d) if *d == Decimal::ZERO => Some(Value::boolean(false)),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(Value::boolean(true)),
            "false" | "f" | "no" | "n" | "0" | "0.0" => Some(Value::boolean(false)),
            _ => None,
        },
        _ => None,
    }
}

fn date_of(value: &Value) -> Option<Value> {
    match value {
        Value::Date { .. } => Some(value.clone()),
        Value::DateTime {
            value: dt,
            precision,
            ..
        } => {
            let precision = match precision {
                DateTimePrecision::Year => DatePrecision::Year,
                DateTimePrecision::Month => DatePrecision::Month,
                _ => DatePrecision::Day,
            };
            Some(Value::date(dt.date_naive(), precision))
        }
        Value::String(s) => temporal::parse_date_value(s),
        _ => None,
    }
}

fn datetime_of(value: &Value) -> Option<Value> {
    match value {
        Value::DateTime { .. } => Some(value.clone()),
        Value::Date { value, precision } => Some(temporal::date_to_datetime(*value, *precision)),
        Value::String(s) => temporal::parse_datetime_value(s),
        _ => None,
    }
}

fn time_of(value: &Value) -> Option<Value> {
    match value {
        Value::Time { .. } => Some(value.clone()),
        Value::String(s) => temporal::parse_time_value(s.strip_prefix('T').unwrap_or(s)),
        _ => None,
    }
}

fn quantity_of(value: &Value) -> Option<Value> {
    match value {
        Value::Quantity { .. } => Some(value.clone()),
        Value::Integer(i) => Some(Value::quantity(Decimal::from(*i), "1")),
        Value::Decimal(d) => Some(Value::quantity(*d, "1")),
        Value::Boolean(b) => Some(Value::quantity(
            Decimal::from(if *b { 1 } else { 0 }),
            "1",
        )),
        Value::String(s) => parse_quantity_string(s),
        _ => None,
    }
}

/// Parse a quantity string: a number optionally followed by a quoted UCUM
/// unit or a calendar-duration keyword (`"5.4 'mg'"`, `"4 days"`).
fn parse_quantity_string(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    let (number_part, unit_part) = match trimmed.find(char::is_whitespace) {
        Some(split) => (&trimmed[..split], trimmed[split..].trim_start()),
        None => (trimmed, ""),
    };
    let value = Decimal::from_str(number_part).ok()?;
    let unit = if unit_part.is_empty() {
        "1".to_string()
    } else if let Some(quoted) = unit_part
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        quoted.to_string()
    } else {
        const CALENDAR_UNITS: &[&str] = &[
            "year",
            "years",
            "month",
            "months",
            "week",
            "weeks",
            "day",
            "days",
            "hour",
            "hours",
            "minute",
            "minutes",
            "second",
            "seconds",
            "millisecond",
            "milliseconds",
        ];
        if !CALENDAR_UNITS.contains(&unit_part) {
            return None;
        }
        unit_part.to_string()
    };
    Some(Value::quantity(value, unit))
}

pub fn to_string(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    convert(cc, &focus, string_of)
}

pub fn to_integer(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    convert(cc, &focus, integer_of)
}

pub fn to_decimal(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    convert(cc, &focus, decimal_of)
}

pub fn to_boolean(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    convert(cc, &focus, boolean_of)
}

pub fn to_date(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    convert(cc, &focus, date_of)
}

pub fn to_datetime(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    convert(cc, &focus, datetime_of)
}

pub fn to_time(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    convert(cc, &focus, time_of)
}

pub fn to_quantity(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    convert(cc, &focus, quantity_of)
}

pub fn converts_to_string(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, string_of)
}

pub fn converts_to_integer(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, integer_of)
}

pub fn converts_to_decimal(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, decimal_of)
}

pub fn converts_to_boolean(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, boolean_of)
}

pub fn converts_to_date(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, date_of)
}

pub fn converts_to_datetime(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, datetime_of)
}

pub fn converts_to_time(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, time_of)
}

pub fn converts_to_quantity(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    converts(cc, &focus, quantity_of)
}
