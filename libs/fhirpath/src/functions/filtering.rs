//! Filtering and projection functions
//!
//! The iterator protocol lives here: each item is evaluated with `$this` and
//! `$index` bound in a fresh scope that unwinds after the call.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

pub fn where_func(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let criteria = args[0].lazy(cc)?;

    let mut out = Collection::with_capacity(focus.len());
    for (index, item) in focus.iter().enumerate() {
        let ctx = cc.ctx.with_iterator(item, index);
        let result = cc.eval(criteria, &ctx)?;
        if helpers::condition(&result) == Some(true) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

pub fn select(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let projection = args[0].lazy(cc)?;

    let mut out = Collection::empty();
    for (index, item) in focus.iter().enumerate() {
        let ctx = cc.ctx.with_iterator(item, index);
        out.extend(cc.eval(projection, &ctx)?);
    }
    Ok(out)
}

pub fn repeat(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let projection = args[0].lazy(cc)?;

    // Apply the projection to the input, then to every newly discovered
    // item, until a pass adds nothing. Equality (`=`) is the cycle-detection
    // relation; the iteration cap guards degenerate projections.
    const MAX_ITERATIONS: usize = 10_000;

    let mut out = Collection::empty();
    let mut frontier: Vec<Value> = focus.iter().cloned().collect();
    let mut iterations = 0usize;

    while !frontier.is_empty() {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(cc.eval_error(format!(
                "repeat() exceeded {MAX_ITERATIONS} iterations; projection does not converge"
            )));
        }

        let mut next = Vec::new();
        for (index, item) in frontier.iter().enumerate() {
            let ctx = cc.ctx.with_iterator(item, index);
            for produced in cc.eval(projection, &ctx)? {
                if !out.contains_equal(&produced) {
                    out.push(produced.clone());
                    next.push(produced);
                }
            }
        }
        frontier = next;
    }

    Ok(out)
}
