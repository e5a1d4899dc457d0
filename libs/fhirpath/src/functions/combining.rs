//! Combining functions: `union` and `combine`.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::Collection;

use super::helpers;

/// Same semantics as the `|` operator: merged collections de-duplicated by
/// equivalence, first occurrence order preserved.
pub fn union(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    let mut out = Collection::with_capacity(focus.len() + other.len());
    for item in focus.iter().chain(other.iter()) {
        if !out.contains_equivalent(item) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

/// Plain concatenation; duplicates are kept.
pub fn combine(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    let mut out = focus;
    for item in other.iter() {
        out.push(item.clone());
    }
    Ok(out)
}
