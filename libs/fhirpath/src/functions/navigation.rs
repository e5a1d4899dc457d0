//! Structural navigation functions: `children()` and `descendants()`.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

/// All immediate child values of every structural item in the focus,
/// splicing repeating fields. Non-structural items contribute nothing.
pub fn children(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(children_of(&focus))
}

/// Transitive closure of `children()`, not including the input itself.
pub fn descendants(
    _cc: &mut CallContext,
    focus: Collection,
    _args: &[Argument],
) -> Result<Collection> {
    let mut out = Collection::empty();
    let mut frontier = children_of(&focus);
    while !frontier.is_empty() {
        let next = children_of(&frontier);
        out.extend(frontier);
        frontier = next;
    }
    Ok(out)
}

fn children_of(focus: &Collection) -> Collection {
    let mut out = Collection::empty();
    for item in focus.iter() {
        if let Value::Object(map) = item {
            for value in map.values() {
                out.push_flattened(value);
            }
        }
    }
    out
}
