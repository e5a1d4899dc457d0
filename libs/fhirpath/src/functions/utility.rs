//! Utility functions: `not()`, `trace()`, `defineVariable()`, `aggregate()`.

use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

pub fn not(cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    let Some(value) = helpers::singleton_focus(cc, &focus)? else {
        return Ok(Collection::empty());
    };
    let negated = match value {
        Value::Boolean(b) => !b,
        // A non-boolean singleton reads as true, so its negation is false.
        _ => false,
    };
    Ok(helpers::boolean(negated))
}

/// Reports the focus (or a projection of it) to the host's trace sink and
/// returns the focus unchanged.
pub fn trace(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let Some(name) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "name")? else {
        return Ok(focus);
    };

    if let Some(sink) = cc.evaluator.trace_sink() {
        let reported = match args.get(1) {
            Some(projection) => {
                let projection = projection.lazy(cc)?;
                let ctx = cc.ctx.with_focus(focus.clone());
                cc.eval(projection, &ctx)?
            }
            None => focus.clone(),
        };
        sink(name.as_ref(), &reported);
    }

    Ok(focus)
}

/// Binds a variable visible to downstream stages of the enclosing pipeline.
/// The focus passes through unchanged.
pub fn define_variable(
    cc: &mut CallContext,
    focus: Collection,
    args: &[Argument],
) -> Result<Collection> {
    let Some(name) = helpers::singleton_string(cc, helpers::eager(cc, args, 0)?, "name")? else {
        return Err(cc.arg_error("variable name must be a non-empty string"));
    };

    let value = match args.get(1) {
        Some(arg) => arg.eager(cc)?.clone(),
        None => focus.clone(),
    };

    cc.next_ctx = Some(cc.ctx.set_variable(&name, value, cc.position)?);
    Ok(focus)
}

/// Folds the focus through an expression with `$this`, `$index`, and
/// `$total` bound; `$total` starts from the init argument (or empty) and
/// carries each iteration's result.
pub fn aggregate(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let expression = args[0].lazy(cc)?;
    let mut total = match args.get(1) {
        Some(init) => init.eager(cc)?.clone(),
        None => Collection::empty(),
    };

    for (index, item) in focus.iter().enumerate() {
        let ctx = cc.ctx.with_iterator(item, index).with_total(total);
        total = cc.eval(expression, &ctx)?;
    }

    Ok(total)
}
