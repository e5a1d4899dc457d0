//! Binary and unary operator semantics
//!
//! Every operator here is collection-in, collection-out. Arithmetic and
//! comparison empty-propagate; the boolean operators implement three-valued
//! logic with the empty collection as "unknown". Type mismatches are fatal.

use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::temporal;
use crate::token::Position;
use crate::value::{
    equal_collections, equivalent_collections, Collection, Value,
};

fn singleton<'a>(collection: &'a Collection, op: &str, position: Position) -> Result<&'a Value> {
    collection.as_singleton().ok_or_else(|| {
        Error::evaluation(
            format!(
                "operator '{op}' requires singleton operands, got {} items",
                collection.len()
            ),
            position,
        )
    })
}

/// Boolean reading of a collection for the logical operators: empty is
/// unknown, a singleton boolean is itself, any other singleton counts as
/// true, more than one item is an error.
fn truth(collection: &Collection, position: Position) -> Result<Option<bool>> {
    if collection.is_empty() {
        return Ok(None);
    }
    match collection.as_singleton() {
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(_) => Ok(Some(true)),
        None => Err(Error::evaluation(
            "boolean operator requires a singleton operand",
            position,
        )),
    }
}

fn boolean_result(value: Option<bool>) -> Collection {
    match value {
        Some(b) => Collection::singleton(Value::boolean(b)),
        None => Collection::empty(),
    }
}

fn type_mismatch(op: &str, left: &Value, right: &Value, position: Position) -> Error {
    let (_, lname) = left.type_name();
    let (_, rname) = right.type_name();
    Error::type_error(
        format!("operator '{op}' cannot be applied to {lname} and {rname}"),
        position,
    )
}

// ============================================================================
// Arithmetic
// ============================================================================

pub fn add(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "+", position)?;
    let b = singleton(right, "+", position)?;

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x
            .checked_add(*y)
            .map(|v| Collection::singleton(Value::integer(v)))
            .ok_or_else(|| Error::evaluation("integer overflow in '+'", position)),
        (Value::String(x), Value::String(y)) => Ok(Collection::singleton(Value::string(
            format!("{x}{y}"),
        ))),
        (
            Value::Quantity { value: x, unit: xu },
            Value::Quantity { value: y, unit: yu },
        ) if xu == yu => x
            .checked_add(*y)
            .map(|v| Collection::singleton(Value::quantity(v, xu.clone())))
            .ok_or_else(|| Error::evaluation("decimal overflow in '+'", position)),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x
                .checked_add(y)
                .map(|v| Collection::singleton(Value::decimal(v)))
                .ok_or_else(|| Error::evaluation("decimal overflow in '+'", position)),
            _ => Err(type_mismatch("+", a, b, position)),
        },
    }
}

pub fn subtract(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "-", position)?;
    let b = singleton(right, "-", position)?;

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x
            .checked_sub(*y)
            .map(|v| Collection::singleton(Value::integer(v)))
            .ok_or_else(|| Error::evaluation("integer overflow in '-'", position)),
        (
            Value::Quantity { value: x, unit: xu },
            Value::Quantity { value: y, unit: yu },
        ) if xu == yu => x
            .checked_sub(*y)
            .map(|v| Collection::singleton(Value::quantity(v, xu.clone())))
            .ok_or_else(|| Error::evaluation("decimal overflow in '-'", position)),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x
                .checked_sub(y)
                .map(|v| Collection::singleton(Value::decimal(v)))
                .ok_or_else(|| Error::evaluation("decimal overflow in '-'", position)),
            _ => Err(type_mismatch("-", a, b, position)),
        },
    }
}

pub fn multiply(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "*", position)?;
    let b = singleton(right, "*", position)?;

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x
            .checked_mul(*y)
            .map(|v| Collection::singleton(Value::integer(v)))
            .ok_or_else(|| Error::evaluation("integer overflow in '*'", position)),
        (Value::Quantity { value, unit }, other) | (other, Value::Quantity { value, unit })
            if other.as_number().is_some() =>
        {
            value
                .checked_mul(other.as_number().unwrap())
                .map(|v| Collection::singleton(Value::quantity(v, unit.clone())))
                .ok_or_else(|| Error::evaluation("decimal overflow in '*'", position))
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x
                .checked_mul(y)
                .map(|v| Collection::singleton(Value::decimal(v)))
                .ok_or_else(|| Error::evaluation("decimal overflow in '*'", position)),
            _ => Err(type_mismatch("*", a, b, position)),
        },
    }
}

pub fn divide(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "/", position)?;
    let b = singleton(right, "/", position)?;

    if let (Value::Quantity { value, unit }, Some(divisor)) = (a, b.as_number()) {
        if divisor.is_zero() {
            return Ok(Collection::empty());
        }
        return value
            .checked_div(divisor)
            .map(|v| Collection::singleton(Value::quantity(v, unit.clone())))
            .ok_or_else(|| Error::evaluation("decimal overflow in '/'", position));
    }

    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => {
            // Division by zero is empty, not an error.
            if y.is_zero() {
                return Ok(Collection::empty());
            }
            x.checked_div(y)
                .map(|v| Collection::singleton(Value::decimal(v)))
                .ok_or_else(|| Error::evaluation("decimal overflow in '/'", position))
        }
        _ => Err(type_mismatch("/", a, b, position)),
    }
}

pub fn integer_divide(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "div", position)?;
    let b = singleton(right, "div", position)?;

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Ok(Collection::empty());
            }
            x.checked_div(*y)
                .map(|v| Collection::singleton(Value::integer(v)))
                .ok_or_else(|| Error::evaluation("integer overflow in 'div'", position))
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                if y.is_zero() {
                    return Ok(Collection::empty());
                }
                let quotient = x
                    .checked_div(y)
                    .ok_or_else(|| Error::evaluation("decimal overflow in 'div'", position))?
                    .trunc();
                let as_int = quotient
                    .to_i64()
                    .ok_or_else(|| Error::evaluation("result of 'div' out of range", position))?;
                Ok(Collection::singleton(Value::integer(as_int)))
            }
            _ => Err(type_mismatch("div", a, b, position)),
        },
    }
}

pub fn modulo(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "mod", position)?;
    let b = singleton(right, "mod", position)?;

    match (a, b) {
        // The remainder matches the sign of the dividend.
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Ok(Collection::empty());
            }
            x.checked_rem(*y)
                .map(|v| Collection::singleton(Value::integer(v)))
                .ok_or_else(|| Error::evaluation("integer overflow in 'mod'", position))
        }
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => {
                if y.is_zero() {
                    return Ok(Collection::empty());
                }
                x.checked_rem(y)
                    .map(|v| Collection::singleton(Value::decimal(v)))
                    .ok_or_else(|| Error::evaluation("decimal overflow in 'mod'", position))
            }
            _ => Err(type_mismatch("mod", a, b, position)),
        },
    }
}

// ============================================================================
// String concatenation
// ============================================================================

/// `&` empty-propagates exactly like the arithmetic operators; see DESIGN.md
/// for the resolution of the empty-as-empty-string reading.
pub fn concat(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, "&", position)?;
    let b = singleton(right, "&", position)?;
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            Ok(Collection::singleton(Value::string(format!("{x}{y}"))))
        }
        _ => Err(type_mismatch("&", a, b, position)),
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Item-level ordering. `None` means the order is undecidable (temporal
/// precision mismatch, quantity unit mismatch) and the comparison is empty.
fn ordering_of(a: &Value, b: &Value, op: &str, position: Position) -> Result<Option<Ordering>> {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return Ok(Some(x.cmp(&y)));
    }

    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Some(x.as_ref().cmp(y.as_ref()))),
        (
            Value::Date {
                value: x,
                precision: xp,
            },
            Value::Date {
                value: y,
                precision: yp,
            },
        ) => Ok(temporal::date_cmp(*x, *xp, *y, *yp)),
        (
            Value::DateTime {
                value: x,
                precision: xp,
                ..
            },
            Value::DateTime {
                value: y,
                precision: yp,
                ..
            },
        ) => Ok(temporal::datetime_cmp(*x, *xp, *y, *yp)),
        (
            Value::Time {
                value: x,
                precision: xp,
            },
            Value::Time {
                value: y,
                precision: yp,
            },
        ) => Ok(temporal::time_cmp(*x, *xp, *y, *yp)),
        // A date compared against a datetime is promoted to a datetime with
        // date precision.
        (Value::Date { value, precision }, Value::DateTime { .. }) => {
            ordering_of(&temporal::date_to_datetime(*value, *precision), b, op, position)
        }
        (Value::DateTime { .. }, Value::Date { value, precision }) => {
            ordering_of(a, &temporal::date_to_datetime(*value, *precision), op, position)
        }
        // FHIR JSON carries dates as strings; coerce towards the temporal
        // side when one operand is already temporal.
        (Value::String(s), Value::Date { .. } | Value::DateTime { .. } | Value::Time { .. }) => {
            let parsed = parse_string_as(b, s)
                .ok_or_else(|| type_mismatch(op, a, b, position))?;
            ordering_of(&parsed, b, op, position)
        }
        (Value::Date { .. } | Value::DateTime { .. } | Value::Time { .. }, Value::String(s)) => {
            let parsed = parse_string_as(a, s)
                .ok_or_else(|| type_mismatch(op, a, b, position))?;
            ordering_of(a, &parsed, op, position)
        }
        (
            Value::Quantity {
                value: x,
                unit: xu,
            },
            Value::Quantity {
                value: y,
                unit: yu,
            },
        ) => {
            if xu == yu {
                Ok(Some(x.cmp(y)))
            } else {
                Ok(None)
            }
        }
        _ => Err(type_mismatch(op, a, b, position)),
    }
}

fn parse_string_as(template: &Value, s: &str) -> Option<Value> {
    match template {
        Value::Date { .. } => temporal::parse_date_value(s),
        Value::DateTime { .. } => temporal::parse_datetime_value(s),
        Value::Time { .. } => temporal::parse_time_value(s),
        _ => None,
    }
}

fn compare(
    left: &Collection,
    right: &Collection,
    op: &'static str,
    position: Position,
    accept: fn(Ordering) -> bool,
) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    let a = singleton(left, op, position)?;
    let b = singleton(right, op, position)?;
    Ok(boolean_result(
        ordering_of(a, b, op, position)?.map(accept),
    ))
}

pub fn less_than(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    compare(left, right, "<", position, |ord| ord == Ordering::Less)
}

pub fn greater_than(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    compare(left, right, ">", position, |ord| ord == Ordering::Greater)
}

pub fn less_or_equal(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    compare(left, right, "<=", position, |ord| ord != Ordering::Greater)
}

pub fn greater_or_equal(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    compare(left, right, ">=", position, |ord| ord != Ordering::Less)
}

// ============================================================================
// Equality and equivalence
// ============================================================================

pub fn equal(left: &Collection, right: &Collection, _position: Position) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    Ok(boolean_result(equal_collections(left, right)))
}

pub fn not_equal(
    left: &Collection,
    right: &Collection,
    _position: Position,
) -> Result<Collection> {
    if left.is_empty() || right.is_empty() {
        return Ok(Collection::empty());
    }
    Ok(boolean_result(
        equal_collections(left, right).map(|eq| !eq),
    ))
}

pub fn equivalent(
    left: &Collection,
    right: &Collection,
    _position: Position,
) -> Result<Collection> {
    Ok(Collection::singleton(Value::boolean(
        equivalent_collections(left, right),
    )))
}

pub fn not_equivalent(
    left: &Collection,
    right: &Collection,
    _position: Position,
) -> Result<Collection> {
    Ok(Collection::singleton(Value::boolean(
        !equivalent_collections(left, right),
    )))
}

// ============================================================================
// Membership
// ============================================================================

pub fn in_collection(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    if left.is_empty() {
        return Ok(Collection::empty());
    }
    let needle = singleton(left, "in", position)?;
    if right.is_empty() {
        return Ok(Collection::singleton(Value::boolean(false)));
    }
    // On two singleton strings, membership is a substring test.
    if let (Value::String(n), Some(Value::String(haystack))) = (needle, right.as_singleton()) {
        return Ok(Collection::singleton(Value::boolean(
            haystack.contains(n.as_ref()),
        )));
    }
    Ok(Collection::singleton(Value::boolean(
        right.contains_equal(needle),
    )))
}

pub fn collection_contains(
    left: &Collection,
    right: &Collection,
    position: Position,
) -> Result<Collection> {
    if right.is_empty() {
        return Ok(Collection::empty());
    }
    let needle = singleton(right, "contains", position)?;
    if left.is_empty() {
        return Ok(Collection::singleton(Value::boolean(false)));
    }
    if let (Some(Value::String(haystack)), Value::String(n)) = (left.as_singleton(), needle) {
        return Ok(Collection::singleton(Value::boolean(
            haystack.contains(n.as_ref()),
        )));
    }
    Ok(Collection::singleton(Value::boolean(
        left.contains_equal(needle),
    )))
}

// ============================================================================
// Three-valued boolean logic
// ============================================================================

pub fn and(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    let a = truth(left, position)?;
    let b = truth(right, position)?;
    let result = match (a, b) {
        (Some(true), Some(true)) => Some(true),
        (Some(false), _) | (_, Some(false)) => Some(false),
        _ => None,
    };
    Ok(boolean_result(result))
}

pub fn or(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    let a = truth(left, position)?;
    let b = truth(right, position)?;
    let result = match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    };
    Ok(boolean_result(result))
}

pub fn xor(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    let a = truth(left, position)?;
    let b = truth(right, position)?;
    let result = match (a, b) {
        (Some(x), Some(y)) => Some(x != y),
        _ => None,
    };
    Ok(boolean_result(result))
}

pub fn implies(left: &Collection, right: &Collection, position: Position) -> Result<Collection> {
    let a = truth(left, position)?;
    let b = truth(right, position)?;
    let result = match (a, b) {
        (Some(false), _) => Some(true),
        (Some(true), other) => other,
        (None, Some(true)) => Some(true),
        (None, _) => None,
    };
    Ok(boolean_result(result))
}

// ============================================================================
// Prefix operators
// ============================================================================

pub fn unary_plus(operand: &Collection, position: Position) -> Result<Collection> {
    if operand.is_empty() {
        return Ok(Collection::empty());
    }
    let value = singleton(operand, "+", position)?;
    match value {
        Value::Integer(_) | Value::Decimal(_) | Value::Quantity { .. } => {
            Ok(Collection::singleton(value.clone()))
        }
        _ => Err(Error::type_error(
            "unary '+' requires a numeric operand",
            position,
        )),
    }
}

pub fn unary_minus(operand: &Collection, position: Position) -> Result<Collection> {
    if operand.is_empty() {
        return Ok(Collection::empty());
    }
    let value = singleton(operand, "-", position)?;
    match value {
        // Negating i64::MIN has no representation; this is a range error by
        // documented choice.
        Value::Integer(i) => i
            .checked_neg()
            .map(|v| Collection::singleton(Value::integer(v)))
            .ok_or_else(|| Error::evaluation("integer overflow in unary '-'", position)),
        Value::Decimal(d) => Ok(Collection::singleton(Value::decimal(-*d))),
        Value::Quantity { value, unit } => {
            Ok(Collection::singleton(Value::quantity(-*value, unit.clone())))
        }
        _ => Err(Error::type_error(
            "unary '-' requires a numeric operand",
            position,
        )),
    }
}

pub fn unary_not(operand: &Collection, position: Position) -> Result<Collection> {
    Ok(boolean_result(truth(operand, position)?.map(|b| !b)))
}
