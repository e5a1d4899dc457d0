//! Subsetting functions: `single`, `first`, `last`, `tail`, `skip`, `take`,
//! `intersect`, `exclude`.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::Collection;

use super::helpers;

pub fn single(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    match focus.len() {
        0 => Ok(Collection::empty()),
        1 => Ok(focus),
        n => Err(cc.eval_error(format!("single() requires at most one item, got {n}"))),
    }
}

pub fn first(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(focus
        .first()
        .cloned()
        .map(Collection::singleton)
        .unwrap_or_default())
}

pub fn last(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(focus
        .iter()
        .last()
        .cloned()
        .map(Collection::singleton)
        .unwrap_or_default())
}

pub fn tail(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(focus.iter().skip(1).cloned().collect())
}

pub fn skip(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(count) = helpers::singleton_integer(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    if count <= 0 {
        return Ok(focus);
    }
    Ok(focus.iter().skip(count as usize).cloned().collect())
}

pub fn take(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(count) = helpers::singleton_integer(cc, helpers::eager(cc, args, 0)?, "argument")?
    else {
        return Ok(Collection::empty());
    };
    if count <= 0 {
        return Ok(Collection::empty());
    }
    Ok(focus.iter().take(count as usize).cloned().collect())
}

pub fn intersect(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    let mut out = Collection::empty();
    for item in focus.iter() {
        if other.contains_equal(item) && !out.contains_equal(item) {
            out.push(item.clone());
        }
    }
    Ok(out)
}

pub fn exclude(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let other = helpers::eager(cc, args, 0)?;
    // Keeps duplicates and order, unlike intersect().
    Ok(focus
        .iter()
        .filter(|item| !other.contains_equal(item))
        .cloned()
        .collect())
}
