//! Type functions: `ofType()`, `is()`, `as()`, `type()`
//!
//! The function forms mirror the `is`/`as` operators; the type argument is a
//! lazy subtree read as a type specifier, never evaluated.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::TypeSpecifier;
use crate::error::Result;
use crate::registry::{Argument, CallContext};
use crate::value::{Collection, Value};

use super::helpers;

fn type_argument(cc: &CallContext, args: &[Argument]) -> Result<TypeSpecifier> {
    let expr = args[0].lazy(cc)?;
    expr.as_type_specifier()
        .ok_or_else(|| cc.arg_error("argument must be a type name"))
}

pub fn of_type(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let spec = type_argument(cc, args)?;
    Ok(focus
        .iter()
        .filter(|item| cc.evaluator.matches_type(&spec, item))
        .cloned()
        .collect())
}

pub fn is_func(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let spec = type_argument(cc, args)?;
    if focus.is_empty() {
        return Ok(Collection::empty());
    }
    let all_match = focus.iter().all(|item| cc.evaluator.matches_type(&spec, item));
    Ok(helpers::boolean(all_match))
}

pub fn as_func(cc: &mut CallContext, focus: Collection, args: &[Argument]) -> Result<Collection> {
    let spec = type_argument(cc, args)?;
    Ok(focus
        .iter()
        .filter(|item| cc.evaluator.matches_type(&spec, item))
        .cloned()
        .collect())
}

/// The type of each item, as `{ namespace, name }` tuples.
pub fn type_func(_cc: &mut CallContext, focus: Collection, _args: &[Argument]) -> Result<Collection> {
    Ok(focus
        .iter()
        .map(|item| {
            let (namespace, name) = item.type_name();
            let mut fields = BTreeMap::new();
            fields.insert("namespace".to_string(), Value::string(namespace));
            fields.insert("name".to_string(), Value::string(name));
            Value::Object(Arc::new(fields))
        })
        .collect())
}
