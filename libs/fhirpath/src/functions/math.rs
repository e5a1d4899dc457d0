//! Mathematical functions
//!
//! Domain failures (square root of a negative, undefined logarithms) yield
//! empty; non-numeric inputs are type errors. The transcendental functions
//! round-trip through f64, like most engines on this value model.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

fn singleton_number(
    cc: &CallContext,
    focus: &Collection,
) -> Result<Option<Decimal>> {
    let Some(value) = helpers::singleton_focus(cc, focus)? else {
        return Ok(None);
    };
    value
        .as_number()
        .map(Some)
        .ok_or_else(|| cc.type_error(format!("{}() requires a numeric input", cc.function)))
}

fn decimal_result(cc: &CallContext, value: f64) -> Result<Collection> {
    if value.is_nan() || value.is_infinite() {
        return Ok(Collection::empty());
    }
    let decimal = Decimal::from_f64(value)
        .ok_or_else(|| cc.eval_error(format!("{}() result cannot be represented", cc.function)))?;
    Ok(Collection::singleton(Value::decimal(decimal.normalize())))
}

fn to_f64(cc: &CallContext, value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| cc.eval_error(format!("{}() input out of range", cc.function)))
}

pub fn abs(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    match value {
        Value::Integer(i) => i
            .checked_abs()
            .map(|v| Collection::singleton(Value::integer(v)))
            .ok_or_else(|| cc.eval_error("integer overflow in abs()")),
        Value::Decimal(d) => Ok(Collection::singleton(Value::decimal(d.abs()))),
        Value::Quantity { value, unit } => Ok(Collection::singleton(Value::quantity(
            value.abs(),
            unit.clone(),
        ))),
        _ => Err(cc.type_error("abs() requires a numeric input")),
    }
}

pub fn ceiling(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    match value {
        Value::Integer(i) => Ok(Collection::singleton(Value::integer(*i))),
        Value::Decimal(d) => {
            let ceiled = d.ceil();
            let as_int = ceiled
                .to_i64()
                .ok_or_else(|| cc.eval_error("ceiling() result out of range"))?;
            Ok(Collection::singleton(Value::integer(as_int)))
        }
        _ => Err(cc.type_error("ceiling() requires a numeric input")),
    }
}

pub fn floor(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    match value {
        Value::Integer(i) => Ok(Collection::singleton(Value::integer(*i))),
        Value::Decimal(d) => {
            let floored = d.floor();
            let as_int = floored
                .to_i64()
                .ok_or_else(|| cc.eval_error("floor() result out of range"))?;
            Ok(Collection::singleton(Value::integer(as_int)))
        }
        _ => Err(cc.type_error("floor() requires a numeric input")),
    }
}

pub fn truncate(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let as_int = value
        .trunc()
        .to_i64()
        .ok_or_else(|| cc.eval_error("truncate() result out of range"))?;
    Ok(Collection::singleton(Value::integer(as_int)))
}

pub fn round(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let precision = match args.first() {
        Some(arg) => {
            match helpers::singleton_integer(cc, arg.eager(cc)?, "precision")? {
                Some(p) if p >= 0 => p as u32,
                Some(_) => {
                    return Err(cc.arg_error("precision must be non-negative"));
                }
                None => return Ok(Collection::empty()),
            }
        }
        None => 0,
    };
    Ok(Collection::singleton(Value::decimal(
        value.round_dp(precision),
    )))
}

pub fn sqrt(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    // sqrt of a negative has no representation: empty, not an error.
    if value.is_sign_negative() {
        return Ok(Collection::empty());
    }
    let result = to_f64(cc, value)?.sqrt();
    decimal_result(cc, result)
}

pub fn exp(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let result = to_f64(cc, value)?.exp();
    if result.is_infinite() {
        return Err(cc.eval_error("exp() result too large to represent"));
    }
    decimal_result(cc, result)
}

pub fn ln(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    if value <= Decimal::ZERO {
        return Ok(Collection::empty());
    }
    let result = to_f64(cc, value)?.ln();
    decimal_result(cc, result)
}

pub fn log(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(value) = singleton_number(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let base_arg = helpers::eager(cc, args, 0)?;
    if base_arg.is_empty() {
        return Ok(Collection::empty());
    }
    let Some(base_value) = helpers::singleton_focus(cc, base_arg)? else {
        return Ok(Collection::empty());
    };
    let base = base_value
        .as_number()
        .ok_or_else(|| cc.type_error("log() requires a numeric base"))?;
    if value <= Decimal::ZERO || base <= Decimal::ZERO || base == Decimal::ONE {
        return Ok(Collection::empty());
    }
    let result = to_f64(cc, value)?.log(to_f64(cc, base)?);
    decimal_result(cc, result)
}

pub fn power(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(base_value) = helpers::singleton_focus(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let exponent_arg = helpers::eager(cc, args, 0)?;
    if exponent_arg.is_empty() {
        return Ok(Collection::empty());
    }
    let Some(exponent_value) = helpers::singleton_focus(cc, exponent_arg)? else {
        return Ok(Collection::empty());
    };

    // Integer base with a non-negative integer exponent stays an integer.
    if let (Value::Integer(base), Value::Integer(exponent)) = (base_value, exponent_value) {
        if *exponent >= 0 {
            let exponent = u32::try_from(*exponent)
                .map_err(|_| cc.eval_error("power() exponent out of range"))?;
            return base
                .checked_pow(exponent)
                .map(|v| Collection::singleton(Value::integer(v)))
                .ok_or_else(|| cc.eval_error("integer overflow in power()"));
        }
    }

    let base = base_value
        .as_number()
        .ok_or_else(|| cc.type_error("power() requires a numeric input"))?;
    let exponent = exponent_value
        .as_number()
        .ok_or_else(|| cc.type_error("power() requires a numeric exponent"))?;
    let result = to_f64(cc, base)?.powf(to_f64(cc, exponent)?);
    // e.g. (-1) ^ 0.5 has no real representation.
    decimal_result(cc, result)
}
