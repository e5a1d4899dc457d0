//! Existence and collection query functions
//!
//! `empty()`, `exists()`, `all()`, the boolean aggregates, `count()`,
//! `distinct()`, and the subset predicates.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

pub fn empty(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(helpers::boolean(focus.is_empty()))
}

pub fn exists(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    // exists() with no argument: any item at all.
    let Some(criteria) = args.first() else {
        return Ok(helpers::boolean(!focus.is_empty()));
    };
    let criteria = criteria.lazy(cc)?;

    for (index, item) in focus.iter().enumerate() {
        let ctx = cc.ctx.with_iterator(item, index);
        let result = cc.eval(criteria, &ctx)?;
        if helpers::condition(&result) == Some(true) {
            return Ok(helpers::boolean(true));
        }
    }
    Ok(helpers::boolean(false))
}

pub fn all(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let criteria = args[0].lazy(cc)?;

    // The trivial result for an empty focus is true.
    for (index, item) in focus.iter().enumerate() {
        let ctx = cc.ctx.with_iterator(item, index);
        let result = cc.eval(criteria, &ctx)?;
        if helpers::condition(&result) == Some(false) {
            return Ok(helpers::boolean(false));
        }
    }
    Ok(helpers::boolean(true))
}

fn boolean_aggregate(
    cc: &CallContext,
    focus: &Collection,
    empty_result: bool,
    looking_for: bool,
    found_result: bool,
) -> Result<Collection> {
    if focus.is_empty() {
        return Ok(helpers::boolean(empty_result));
    }
    for item in focus.iter() {
        match item {
            Value::Boolean(b) => {
                if *b == looking_for {
                    return Ok(helpers::boolean(found_result));
                }
            }
            _ => {
                return Err(cc.type_error(format!(
                    "{}() requires a collection of booleans",
                    cc.function
                )));
            }
        }
    }
    Ok(helpers::boolean(!found_result))
}

pub fn all_true(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    boolean_aggregate(cc, &focus, true, false, false)
}

pub fn any_true(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    boolean_aggregate(cc, &focus, false, true, true)
}

pub fn all_false(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    boolean_aggregate(cc, &focus, true, true, false)
}

pub fn any_false(
    cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    boolean_aggregate(cc, &focus, false, false, true)
}

pub fn count(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(Collection::singleton(Value::integer(focus.len() as i64)))
}

pub fn distinct(
    _cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    let mut out = Collection::with_capacity(focus.len());
    for item in focus {
        if !out.contains_equivalent(&item) {
            out.push(item);
        }
    }
    Ok(out)
}

pub fn is_distinct(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let original_len = focus.len();
    let distinct = distinct(cc, focus, args)?;
    Ok(helpers::boolean(original_len == distinct.len()))
}

pub fn subset_of(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    // The empty collection is a subset of anything.
    let is_subset = focus.iter().all(|item| other.contains_equal(item));
    Ok(helpers::boolean(is_subset))
}

pub fn superset_of(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    let is_superset = other.iter().all(|item| focus.contains_equal(item));
    Ok(helpers::boolean(is_superset))
}
