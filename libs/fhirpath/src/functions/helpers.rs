//! Shared argument and focus coercion helpers for the function library.

use std::sync::Arc;

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

pub(super) fn boolean(value: bool) -> Collection {
    Collection::singleton(Value::boolean(value))
}

/// Strict boolean reading of an iterator-criteria result: only a singleton
/// boolean decides, anything else is indeterminate. The logical operators
/// coerce more loosely; criteria do not.
pub(super) fn condition(collection: &Collection) -> Option<bool> {
    match collection.as_singleton() {
        Some(Value::Boolean(b)) => Some(*b),
        _ => None,
    }
}

pub(super) fn eager<'c>(
    cc: &CallContext,
    args: &'c [Argument],
    index: usize,
) -> Result<&'c Collection> {
    args[index].eager(cc)
}

/// Singleton string, or `None` when the collection is empty (which
/// propagates to an empty result).
pub(super) fn singleton_string(
    cc: &CallContext,
    collection: &Collection,
    what: &str,
) -> Result<Option<Arc<str>>> {
    if collection.is_empty() {
        return Ok(None);
    }
    match collection.as_singleton() {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(cc.type_error(format!("{}() requires a string {what}", cc.function))),
        None => Err(cc.eval_error(format!("{}() requires a singleton {what}", cc.function))),
    }
}

/// Singleton integer, or `None` when the collection is empty.
pub(super) fn singleton_integer(
    cc: &CallContext,
    collection: &Collection,
    what: &str,
) -> Result<Option<i64>> {
    if collection.is_empty() {
        return Ok(None);
    }
    match collection.as_singleton() {
        Some(Value::Integer(i)) => Ok(Some(*i)),
        Some(_) => Err(cc.type_error(format!("{}() requires an integer {what}", cc.function))),
        None => Err(cc.eval_error(format!("{}() requires a singleton {what}", cc.function))),
    }
}

/// The sole item of the focus, or `None` when the focus is empty.
pub(super) fn singleton_focus<'c>(
    cc: &CallContext,
    focus: &'c Collection,
) -> Result<Option<&'c Value>> {
    if focus.is_empty() {
        return Ok(None);
    }
    focus
        .as_singleton()
        .map(Some)
        .ok_or_else(|| cc.eval_error(format!("{}() requires a singleton input", cc.function)))
}
