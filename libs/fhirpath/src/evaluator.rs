//! Tree-walking evaluator
//!
//! Dispatches on the AST variant; operators and functions resolve through
//! the operation registry. Every node evaluates to a collection plus a
//! successor context, so `defineVariable` bindings flow to downstream
//! pipeline stages without leaking outward.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{Expr, LiteralValue, TypeSpecifier, VariableKind};
use crate::context::EvalContext;
use crate::engine::CustomFunction;
use crate::error::{Error, Result};
use crate::model::{primitive_type_check, ModelProvider};
use crate::registry::{Argument, CallContext, OperatorEval, ParamMode, Registry};
use crate::token::{Position, TokenKind};
use crate::value::{Collection, Value};

/// Sink for `trace()` output.
pub type TraceFn = dyn Fn(&str, &Collection) + Send + Sync;

type EvalOutput = (Collection, EvalContext);

/// One evaluation's view of the world: the registry plus per-call
/// configuration. Cheap to construct; holds no state between evaluations.
pub struct Evaluator<'a> {
    registry: &'static Registry,
    model: Option<&'a dyn ModelProvider>,
    custom: Option<&'a HashMap<String, Arc<dyn CustomFunction>>>,
    trace: Option<&'a TraceFn>,
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Self {
            registry: Registry::global(),
            model: None,
            custom: None,
            trace: None,
        }
    }

    pub fn with_model(mut self, model: Option<&'a dyn ModelProvider>) -> Self {
        self.model = model;
        self
    }

    pub fn with_custom_functions(
        mut self,
        functions: &'a HashMap<String, Arc<dyn CustomFunction>>,
    ) -> Self {
        self.custom = Some(functions);
        self
    }

    pub fn with_trace(mut self, trace: Option<&'a TraceFn>) -> Self {
        self.trace = trace;
        self
    }

    pub(crate) fn trace_sink(&self) -> Option<&'a TraceFn> {
        self.trace
    }

    /// Evaluate an expression against a context. The returned context is the
    /// caller's context extended with any bindings the expression made for
    /// its downstream pipeline.
    pub fn evaluate(&self, expr: &Expr, ctx: &EvalContext) -> Result<EvalOutput> {
        match expr {
            Expr::Literal { value, .. } => Ok((literal_collection(value), ctx.clone())),

            Expr::Identifier { name, .. } | Expr::TypeOrIdentifier { name, .. } => {
                Ok((navigate(ctx.focus(), name), ctx.clone()))
            }

            Expr::TypeReference {
                type_name,
                position,
            } => Err(Error::evaluation(
                format!("type '{type_name}' cannot be used as a value"),
                *position,
            )),

            Expr::Variable {
                kind,
                name,
                position,
            } => self
                .variable_value(*kind, name, ctx, *position)
                .map(|value| (value, ctx.clone())),

            Expr::Binary {
                op: TokenKind::Dot,
                left,
                right,
                ..
            } => {
                // The pipeline: the right side sees the left side's output
                // as its focus. The caller's focus is restored afterwards,
                // but variable bindings survive.
                let (left_out, after_left) = self.evaluate(left, ctx)?;
                let piped = after_left.with_focus(left_out);
                let (right_out, after_right) = self.evaluate(right, &piped)?;
                Ok((right_out, after_right.with_focus(ctx.focus().clone())))
            }

            Expr::Binary {
                op,
                left,
                right,
                position,
            } => {
                let operator = self
                    .registry
                    .infix(*op)
                    .ok_or_else(|| Error::evaluation("unknown infix operator", *position))?;
                match &operator.eval {
                    OperatorEval::Binary(eval) => {
                        let (left_out, after_left) = self.evaluate(left, ctx)?;
                        let (right_out, after_right) = self.evaluate(right, &after_left)?;
                        Ok((eval(&left_out, &right_out, *position)?, after_right))
                    }
                    _ => Err(Error::evaluation(
                        format!("operator '{}' has no value evaluator", operator.symbol),
                        *position,
                    )),
                }
            }

            Expr::Unary {
                op,
                operand,
                position,
            } => {
                let operator = self
                    .registry
                    .prefix(*op)
                    .ok_or_else(|| Error::evaluation("unknown prefix operator", *position))?;
                match &operator.eval {
                    OperatorEval::Unary(eval) => {
                        let (value, after) = self.evaluate(operand, ctx)?;
                        Ok((eval(&value, *position)?, after))
                    }
                    _ => Err(Error::evaluation(
                        format!("operator '{}' has no prefix evaluator", operator.symbol),
                        *position,
                    )),
                }
            }

            Expr::Function {
                name,
                args,
                position,
            } => self.call_function(name, args, ctx, *position),

            Expr::Collection { elements, .. } => {
                let mut out = Collection::empty();
                let mut cur = ctx.clone();
                for element in elements {
                    let (value, next) = self.evaluate(element, &cur)?;
                    cur = next;
                    out.extend(value);
                }
                Ok((out, cur))
            }

            Expr::Index {
                expression,
                index,
                position,
            } => {
                let (base, after_base) = self.evaluate(expression, ctx)?;
                let (index_out, after_index) = self.evaluate(index, &after_base)?;
                if index_out.is_empty() {
                    return Ok((Collection::empty(), after_index));
                }
                let idx = match index_out.as_singleton() {
                    Some(Value::Integer(i)) => *i,
                    Some(_) => {
                        return Err(Error::type_error(
                            "indexer requires an integer index",
                            *position,
                        ))
                    }
                    None => {
                        return Err(Error::evaluation(
                            "indexer requires a singleton index",
                            *position,
                        ))
                    }
                };
                // Negative or out-of-range indexes yield empty, not errors.
                let value = usize::try_from(idx)
                    .ok()
                    .and_then(|i| base.get(i))
                    .cloned()
                    .map(Collection::singleton)
                    .unwrap_or_default();
                Ok((value, after_index))
            }

            Expr::Union { operands, .. } => {
                let mut out = Collection::empty();
                let mut cur = ctx.clone();
                for operand in operands {
                    let (value, next) = self.evaluate(operand, &cur)?;
                    cur = next;
                    for item in value {
                        // De-dup by equivalence, keeping first occurrence.
                        if !out.contains_equivalent(&item) {
                            out.push(item);
                        }
                    }
                }
                Ok((out, cur))
            }

            Expr::MembershipTest {
                expression,
                type_name,
                ..
            } => {
                let (value, after) = self.evaluate(expression, ctx)?;
                if value.is_empty() {
                    return Ok((Collection::empty(), after));
                }
                let all_match = value.iter().all(|item| self.matches_type(type_name, item));
                Ok((Collection::singleton(Value::boolean(all_match)), after))
            }

            Expr::TypeCast {
                expression,
                type_name,
                ..
            } => {
                let (value, after) = self.evaluate(expression, ctx)?;
                let filtered = value
                    .iter()
                    .filter(|item| self.matches_type(type_name, item))
                    .cloned()
                    .collect();
                Ok((filtered, after))
            }
        }
    }

    fn variable_value(
        &self,
        kind: VariableKind,
        name: &str,
        ctx: &EvalContext,
        position: Position,
    ) -> Result<Collection> {
        match kind {
            VariableKind::This => ctx.this().cloned().ok_or_else(|| Error::UnknownVariable {
                name: "$this".into(),
                position,
            }),
            VariableKind::Index => match ctx.index() {
                Some(index) => Ok(Collection::singleton(Value::integer(index))),
                None => Err(Error::UnknownVariable {
                    name: "$index".into(),
                    position,
                }),
            },
            VariableKind::Total => ctx.total().cloned().ok_or_else(|| Error::UnknownVariable {
                name: "$total".into(),
                position,
            }),
            // Missing environment variables are empty, not errors.
            VariableKind::Environment => {
                Ok(ctx.variable(name).cloned().unwrap_or_default())
            }
        }
    }

    fn call_function(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &EvalContext,
        position: Position,
    ) -> Result<EvalOutput> {
        if let Some(def) = self.registry.function(name) {
            def.validate_arity(args.len(), position)?;

            let mut cur = ctx.clone();
            let mut call_args: Vec<Argument> = Vec::with_capacity(args.len());
            for (slot, arg) in args.iter().enumerate() {
                match def.mode_for(slot) {
                    ParamMode::Lazy => call_args.push(Argument::Lazy(arg)),
                    ParamMode::Eager => {
                        let (value, next) = self.evaluate(arg, &cur)?;
                        cur = next;
                        call_args.push(Argument::Eager(value));
                    }
                }
            }

            let focus = cur.focus().clone();
            let mut cc = CallContext {
                evaluator: self,
                ctx: &cur,
                function: def.name,
                position,
                next_ctx: None,
            };
            let out = (def.eval)(&mut cc, focus, &call_args)?;
            let next_ctx = cc.next_ctx.take();
            return Ok((out, next_ctx.unwrap_or(cur)));
        }

        if let Some(custom) = self.custom.and_then(|functions| functions.get(name)) {
            let mut cur = ctx.clone();
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                let (value, next) = self.evaluate(arg, &cur)?;
                cur = next;
                values.push(value);
            }
            let out = custom.call(cur.focus(), &values).map_err(|err| match err {
                // Give positionless custom-function failures a call site.
                Error::Evaluation { message, .. } => Error::evaluation(message, position),
                other => other,
            })?;
            return Ok((out, cur));
        }

        Err(Error::UnknownFunction {
            name: name.to_string(),
            position,
        })
    }

    /// Whether a value satisfies a type specifier: System primitives by
    /// structural predicate, resource types through the model provider.
    /// Without a provider only primitive checks succeed.
    pub fn matches_type(&self, spec: &TypeSpecifier, value: &Value) -> bool {
        match spec.qualifier.as_deref() {
            None => match primitive_type_check(&spec.name, value) {
                Some(result) => result,
                None => self.model_check(&spec.name, value),
            },
            Some("System") => primitive_type_check(&spec.name, value).unwrap_or(false),
            Some("FHIR") => self.model_check(&spec.name, value),
            Some(_) => false,
        }
    }

    fn model_check(&self, name: &str, value: &Value) -> bool {
        self.model
            .map(|model| model.is_type(name, value))
            .unwrap_or(false)
    }
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_collection(literal: &LiteralValue) -> Collection {
    match literal {
        LiteralValue::Null => Collection::empty(),
        LiteralValue::Boolean(b) => Collection::singleton(Value::boolean(*b)),
        LiteralValue::Integer(i) => Collection::singleton(Value::integer(*i)),
        LiteralValue::Decimal(d) => Collection::singleton(Value::decimal(*d)),
        LiteralValue::String(s) => Collection::singleton(Value::string(s.as_str())),
        LiteralValue::Date(value, precision) => {
            Collection::singleton(Value::date(*value, *precision))
        }
        LiteralValue::DateTime(value, precision, offset) => {
            Collection::singleton(Value::datetime(*value, *precision, *offset))
        }
        LiteralValue::Time(value, precision) => {
            Collection::singleton(Value::time(*value, *precision))
        }
        LiteralValue::Quantity { value, unit } => {
            Collection::singleton(Value::quantity(*value, unit.as_str()))
        }
    }
}

/// Property navigation: for each structural item in the focus, contribute
/// the named field's values (splicing repeating fields). A capitalized
/// leading segment also matches an item whose `resourceType` carries that
/// name, so `Patient.name` works against a Patient root and yields empty
/// against anything else.
pub(crate) fn navigate(focus: &Collection, name: &str) -> Collection {
    let mut out = Collection::empty();
    for item in focus.iter() {
        if let Value::Object(map) = item {
            if let Some(field) = map.get(name) {
                out.push_flattened(field);
            } else if map.get("resourceType").and_then(Value::as_str) == Some(name) {
                out.push(item.clone());
            }
        }
    }
    out
}
