//! Runtime values and collections
//!
//! Every FHIRPath expression evaluates to a `Collection`: an ordered sequence
//! of values. The empty collection represents "unknown" and drives the
//! three-valued logic used by the boolean operators.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::temporal;

/// Precision of a date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

/// Precision of a datetime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Precision of a time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimePrecision {
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// A single FHIRPath value.
///
/// Structural data (JSON objects and arrays) is shared via `Arc` so values
/// can be cloned freely while walking a resource tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    Date {
        value: NaiveDate,
        precision: DatePrecision,
    },
    DateTime {
        value: DateTime<FixedOffset>,
        precision: DateTimePrecision,
        /// Offset seconds east of UTC as written in the source; `None` when
        /// the literal carried no timezone.
        timezone_offset: Option<i32>,
    },
    Time {
        value: NaiveTime,
        precision: TimePrecision,
    },
    Quantity {
        value: Decimal,
        unit: Arc<str>,
    },
    Object(Arc<BTreeMap<String, Value>>),
    Array(Arc<Vec<Value>>),
}

impl Value {
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(value)
    }

    pub fn decimal(value: Decimal) -> Self {
        Value::Decimal(value)
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Value::String(value.into())
    }

    pub fn quantity(value: Decimal, unit: impl Into<Arc<str>>) -> Self {
        Value::Quantity {
            value,
            unit: unit.into(),
        }
    }

    pub fn date(value: NaiveDate, precision: DatePrecision) -> Self {
        Value::Date { value, precision }
    }

    pub fn datetime(
        value: DateTime<FixedOffset>,
        precision: DateTimePrecision,
        timezone_offset: Option<i32>,
    ) -> Self {
        Value::DateTime {
            value,
            precision,
            timezone_offset,
        }
    }

    pub fn time(value: NaiveTime, precision: TimePrecision) -> Self {
        Value::Time { value, precision }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Numeric reading of a value (integer or decimal), used for promotion.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Integer(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Convert a JSON value. `null` maps to an empty-marker-free default and
    /// should be filtered by the caller; use [`Collection::from_json`] for
    /// the collection-centric reading.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => Some(number_from_json(n)),
            serde_json::Value::String(s) => Some(Value::string(s.as_str())),
            serde_json::Value::Array(items) => {
                let values = items.iter().filter_map(Value::from_json).collect();
                Some(Value::Array(Arc::new(values)))
            }
            serde_json::Value::Object(map) => {
                let mut fields = BTreeMap::new();
                for (key, value) in map {
                    if let Some(v) = Value::from_json(value) {
                        fields.insert(key.clone(), v);
                    }
                }
                Some(Value::Object(Arc::new(fields)))
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Decimal(d) => decimal_to_json(*d),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Date { .. } | Value::DateTime { .. } | Value::Time { .. } => {
                serde_json::Value::String(temporal::render_value(self))
            }
            Value::Quantity { value, unit } => serde_json::json!({
                "value": decimal_to_json(*value),
                "unit": unit.as_ref(),
            }),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map.iter() {
                    out.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(out)
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    /// Name of the value's type, as `(namespace, name)`.
    pub fn type_name(&self) -> (&'static str, String) {
        match self {
            Value::Boolean(_) => ("System", "Boolean".into()),
            Value::Integer(_) => ("System", "Integer".into()),
            Value::Decimal(_) => ("System", "Decimal".into()),
            Value::String(_) => ("System", "String".into()),
            Value::Date { .. } => ("System", "Date".into()),
            Value::DateTime { .. } => ("System", "DateTime".into()),
            Value::Time { .. } => ("System", "Time".into()),
            Value::Quantity { .. } => ("System", "Quantity".into()),
            Value::Object(map) => {
                let name = map
                    .get("resourceType")
                    .and_then(Value::as_str)
                    .unwrap_or("Element");
                ("FHIR", name.to_string())
            }
            Value::Array(_) => ("System", "Collection".into()),
        }
    }
}

fn number_from_json(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Integer(i);
    }
    let repr = n.to_string();
    let decimal = Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        .unwrap_or(Decimal::ZERO);
    Value::Decimal(decimal)
}

fn decimal_to_json(d: Decimal) -> serde_json::Value {
    serde_json::from_str::<serde_json::Number>(&d.to_string())
        .map(serde_json::Value::Number)
        .unwrap_or_else(|_| {
            d.to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        })
}

/// Equality per the FHIRPath `=` operator, item-wise.
///
/// `None` means the comparison is undecidable (temporal values with
/// incompatible precision, quantities with different units) and the overall
/// result is the empty collection.
pub fn equal_items(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a == b),
        (Value::Integer(_), Value::Decimal(_))
        | (Value::Decimal(_), Value::Integer(_))
        | (Value::Decimal(_), Value::Decimal(_)) => {
            Some(left.as_number().unwrap() == right.as_number().unwrap())
        }
        (Value::Boolean(a), Value::Boolean(b)) => Some(a == b),
        (Value::String(a), Value::String(b)) => Some(a == b),
        (
            Value::Date {
                value: a,
                precision: ap,
            },
            Value::Date {
                value: b,
                precision: bp,
            },
        ) => temporal::date_cmp(*a, *ap, *b, *bp).map(|ord| ord == Ordering::Equal),
        (
            Value::DateTime {
                value: a,
                precision: ap,
                ..
            },
            Value::DateTime {
                value: b,
                precision: bp,
                ..
            },
        ) => temporal::datetime_cmp(*a, *ap, *b, *bp).map(|ord| ord == Ordering::Equal),
        (
            Value::Time {
                value: a,
                precision: ap,
            },
            Value::Time {
                value: b,
                precision: bp,
            },
        ) => temporal::time_cmp(*a, *ap, *b, *bp).map(|ord| ord == Ordering::Equal),
        (
            Value::Quantity {
                value: a,
                unit: au,
            },
            Value::Quantity {
                value: b,
                unit: bu,
            },
        ) => {
            if au == bu {
                Some(a == b)
            } else {
                None
            }
        }
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            Some(left == right)
        }
        _ => Some(false),
    }
}

/// Equivalence per the FHIRPath `~` operator, item-wise. Always decidable.
pub fn equivalent_items(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Integer(_), Value::Decimal(_))
        | (Value::Decimal(_), Value::Integer(_))
        | (Value::Decimal(_), Value::Decimal(_)) => {
            let a = left.as_number().unwrap();
            let b = right.as_number().unwrap();
            let scale = a.scale().min(b.scale());
            a.round_dp(scale) == b.round_dp(scale)
        }
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::String(a), Value::String(b)) => normalize_string(a) == normalize_string(b),
        (
            Value::Date {
                value: a,
                precision: ap,
            },
            Value::Date {
                value: b,
                precision: bp,
            },
        ) => ap == bp && temporal::date_cmp(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        (
            Value::DateTime {
                value: a,
                precision: ap,
                ..
            },
            Value::DateTime {
                value: b,
                precision: bp,
                ..
            },
        ) => ap == bp && temporal::datetime_cmp(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        (
            Value::Time {
                value: a,
                precision: ap,
            },
            Value::Time {
                value: b,
                precision: bp,
            },
        ) => ap == bp && temporal::time_cmp(*a, *ap, *b, *bp) == Some(Ordering::Equal),
        (
            Value::Quantity {
                value: a,
                unit: au,
            },
            Value::Quantity {
                value: b,
                unit: bu,
            },
        ) => {
            if au != bu {
                return false;
            }
            let scale = a.scale().min(b.scale());
            a.round_dp(scale) == b.round_dp(scale)
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, av)| {
                    b.get(key).map(|bv| equivalent_items(av, bv)).unwrap_or(false)
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(av, bv)| equivalent_items(av, bv))
        }
        _ => false,
    }
}

/// Normalize a string for equivalence comparison: case-insensitive with
/// whitespace runs collapsed.
fn normalize_string(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// An ordered sequence of values; the universal FHIRPath result type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection(SmallVec<[Value; 4]>);

impl Collection {
    pub fn empty() -> Self {
        Collection(SmallVec::new())
    }

    pub fn singleton(value: Value) -> Self {
        let mut values = SmallVec::new();
        values.push(value);
        Collection(values)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Collection(SmallVec::with_capacity(capacity))
    }

    /// Collection-centric reading of a JSON document: `null` is the empty
    /// collection, a top-level array contributes its elements, anything else
    /// is a singleton.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Collection::empty(),
            serde_json::Value::Array(items) => {
                items.iter().filter_map(Value::from_json).collect()
            }
            other => Value::from_json(other)
                .map(Collection::singleton)
                .unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.iter().map(Value::to_json).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    pub fn extend(&mut self, other: Collection) {
        self.0.extend(other.0);
    }

    /// Push a value, splicing array values into their elements. Property
    /// navigation uses this so repeating fields stay flat.
    pub fn push_flattened(&mut self, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items.iter() {
                    self.0.push(item.clone());
                }
            }
            other => self.0.push(other.clone()),
        }
    }

    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// The sole value, if this is a singleton.
    pub fn as_singleton(&self) -> Option<&Value> {
        if self.0.len() == 1 {
            self.0.first()
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self.as_singleton()? {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_singleton()?.as_integer()
    }

    pub fn as_string(&self) -> Option<Arc<str>> {
        match self.as_singleton()? {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Whether the collection contains an item equal (`=`) to `value`.
    /// Undecidable item comparisons are treated as non-matches.
    pub fn contains_equal(&self, value: &Value) -> bool {
        self.iter().any(|item| equal_items(item, value) == Some(true))
    }

    /// Whether the collection contains an item equivalent (`~`) to `value`.
    pub fn contains_equivalent(&self, value: &Value) -> bool {
        self.iter().any(|item| equivalent_items(item, value))
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Collection(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Value;
    type IntoIter = smallvec::IntoIter<[Value; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Collection {
    fn from(values: Vec<Value>) -> Self {
        Collection(SmallVec::from_vec(values))
    }
}

/// Equality of two collections per the `=` operator: element-wise, in order.
/// Empty operands are handled by the caller (empty ⇒ empty result).
pub fn equal_collections(left: &Collection, right: &Collection) -> Option<bool> {
    if left.len() != right.len() {
        return Some(false);
    }
    let mut all_equal = true;
    for (a, b) in left.iter().zip(right.iter()) {
        match equal_items(a, b)? {
            true => {}
            false => all_equal = false,
        }
    }
    Some(all_equal)
}

/// Equivalence of two collections per the `~` operator: order-insensitive
/// multiset matching. Always decidable; two empty collections are equivalent.
pub fn equivalent_collections(left: &Collection, right: &Collection) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = right.iter().collect();
    for item in left.iter() {
        let Some(pos) = unmatched
            .iter()
            .position(|candidate| equivalent_items(item, candidate))
        else {
            return false;
        };
        unmatched.swap_remove(pos);
    }
    true
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date { .. } | Value::DateTime { .. } | Value::Time { .. } => {
                write!(f, "{}", temporal::render_value(self))
            }
            Value::Quantity { value, unit } => write!(f, "{value} '{unit}'"),
            Value::Object(_) | Value::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

/// Re-export chrono's `Utc` so temporal helpers can normalize instants
/// without each call site importing chrono directly.
pub(crate) fn to_utc(dt: &DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_collection_reading() {
        assert!(Collection::from_json(&json!(null)).is_empty());
        assert_eq!(Collection::from_json(&json!([1, 2, 3])).len(), 3);
        assert_eq!(Collection::from_json(&json!({"a": 1})).len(), 1);
        assert_eq!(Collection::from_json(&json!("x")).len(), 1);
    }

    #[test]
    fn test_numeric_equality_promotes() {
        let one = Value::integer(1);
        let one_decimal = Value::decimal(Decimal::new(10, 1)); // 1.0
        assert_eq!(equal_items(&one, &one_decimal), Some(true));
        assert_eq!(
            equal_items(&Value::integer(1), &Value::integer(2)),
            Some(false)
        );
    }

    #[test]
    fn test_decimal_equality_is_not_bit_equality() {
        let a = Value::decimal(Decimal::from_str("0.1").unwrap());
        let b = Value::decimal(Decimal::from_str("0.100").unwrap());
        assert_eq!(equal_items(&a, &b), Some(true));
    }

    #[test]
    fn test_string_equivalence_normalizes() {
        let a = Value::string("Hello  World");
        let b = Value::string("hello world");
        assert!(equivalent_items(&a, &b));
        assert_eq!(equal_items(&a, &b), Some(false));
    }

    #[test]
    fn test_quantity_units_must_match_for_equality() {
        let mg = Value::quantity(Decimal::from(5), "mg");
        let ml = Value::quantity(Decimal::from(5), "mL");
        assert_eq!(equal_items(&mg, &ml), None);
        assert_eq!(equal_items(&mg, &mg.clone()), Some(true));
    }

    #[test]
    fn test_collection_equality_is_ordered() {
        let a: Collection = vec![Value::integer(1), Value::integer(2)].into();
        let b: Collection = vec![Value::integer(2), Value::integer(1)].into();
        assert_eq!(equal_collections(&a, &b), Some(false));
        assert!(equivalent_collections(&a, &b));
    }

    #[test]
    fn test_push_flattened_splices_arrays() {
        let mut out = Collection::empty();
        out.push_flattened(&Value::Array(Arc::new(vec![
            Value::integer(1),
            Value::integer(2),
        ])));
        out.push_flattened(&Value::integer(3));
        assert_eq!(out.len(), 3);
    }
}
