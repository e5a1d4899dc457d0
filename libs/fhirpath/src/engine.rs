//! Main FHIRPath engine
//!
//! The `Engine` is the evaluation entry point: it owns an LRU cache of
//! parsed expressions and wires per-call configuration (variables,
//! environment, type oracle, custom functions) into the evaluator. Parsed
//! ASTs are immutable and shared by reference across evaluations.

use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::ast::Expr;
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, TraceFn};
use crate::model::ModelProvider;
use crate::parser::Parser;
use crate::registry::{self, Registry};
use crate::value::Collection;

const CACHE_CAPACITY: usize = 1000;

/// A host-provided function, registered per evaluation. Custom functions
/// receive pre-evaluated arguments; lazy parameters are reserved for
/// built-ins.
pub trait CustomFunction: Send + Sync {
    fn call(&self, focus: &Collection, args: &[Collection]) -> Result<Collection>;
}

impl<F> CustomFunction for F
where
    F: Fn(&Collection, &[Collection]) -> Result<Collection> + Send + Sync,
{
    fn call(&self, focus: &Collection, args: &[Collection]) -> Result<Collection> {
        self(focus, args)
    }
}

/// Per-evaluation configuration.
#[derive(Clone, Default)]
pub struct EvalOptions {
    /// User variables, visible as `%name` and shadowing the environment.
    pub variables: HashMap<String, Collection>,
    /// Environment variables, visible as `%name`.
    pub environment: HashMap<String, Collection>,
    /// Type oracle for resource-typed `is`/`as`/`ofType`.
    pub model: Option<Arc<dyn ModelProvider>>,
    /// Custom functions; a name colliding with a built-in is a
    /// configuration error.
    pub functions: HashMap<String, Arc<dyn CustomFunction>>,
    /// Sink for `trace()` output. Without one, trace is a no-op.
    pub trace: Option<Arc<TraceFn>>,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Collection) -> Self {
        self.variables.insert(normalize_name(name.into()), value);
        self
    }

    pub fn with_env_variable(mut self, name: impl Into<String>, value: Collection) -> Self {
        self.environment.insert(normalize_name(name.into()), value);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ModelProvider>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: Arc<dyn CustomFunction>,
    ) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn with_trace(mut self, sink: Arc<TraceFn>) -> Self {
        self.trace = Some(sink);
        self
    }
}

fn normalize_name(name: String) -> String {
    name.strip_prefix('%').map(str::to_string).unwrap_or(name)
}

/// Main FHIRPath engine
pub struct Engine {
    cache: Mutex<LruCache<String, Arc<Expr>>>,
}

impl Engine {
    pub fn new() -> Self {
        registry::init();
        Self {
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())),
        }
    }

    /// Parse an expression, consulting the cache first.
    pub fn parse(&self, source: &str) -> Result<Arc<Expr>> {
        {
            let mut cache = self.cache.lock().unwrap();
            if let Some(ast) = cache.get(source) {
                return Ok(ast.clone());
            }
        }

        let ast = Arc::new(Parser::parse(source)?);

        let mut cache = self.cache.lock().unwrap();
        cache.put(source.to_string(), ast.clone());
        Ok(ast)
    }

    /// Evaluate an expression against a JSON resource.
    ///
    /// # Example
    ///
    /// ```
    /// use lumen_fhirpath::{Engine, EvalOptions};
    /// use serde_json::json;
    ///
    /// let engine = Engine::new();
    /// let patient = json!({"resourceType": "Patient", "name": [{"given": ["John"]}]});
    /// let result = engine
    ///     .evaluate("Patient.name.given", &patient, &EvalOptions::new())
    ///     .unwrap();
    /// assert_eq!(result.to_json(), json!(["John"]));
    /// ```
    pub fn evaluate(
        &self,
        source: &str,
        input: &serde_json::Value,
        options: &EvalOptions,
    ) -> Result<Collection> {
        let ast = self.parse(source)?;
        self.evaluate_ast(&ast, Collection::from_json(input), options)
    }

    /// Evaluate an expression against an already-built collection.
    pub fn evaluate_collection(
        &self,
        source: &str,
        input: Collection,
        options: &EvalOptions,
    ) -> Result<Collection> {
        let ast = self.parse(source)?;
        self.evaluate_ast(&ast, input, options)
    }

    /// Evaluate a pre-parsed expression.
    pub fn evaluate_ast(
        &self,
        ast: &Expr,
        input: Collection,
        options: &EvalOptions,
    ) -> Result<Collection> {
        for name in options.functions.keys() {
            if Registry::global().function(name).is_some() {
                return Err(Error::configuration(format!(
                    "custom function '{name}' collides with a built-in"
                )));
            }
        }

        let environment = options
            .environment
            .iter()
            .map(|(name, value)| (Arc::<str>::from(name.as_str()), value.clone()))
            .collect();
        let variables = options
            .variables
            .iter()
            .map(|(name, value)| (Arc::<str>::from(name.as_str()), value.clone()))
            .collect();
        let ctx = EvalContext::with_bindings(input, environment, variables);

        let evaluator = Evaluator::new()
            .with_model(options.model.as_deref())
            .with_custom_functions(&options.functions)
            .with_trace(options.trace.as_deref());
        evaluator.evaluate(ast, &ctx).map(|(value, _)| value)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_parse_cache_shares_asts() {
        let engine = Engine::new();
        let first = engine.parse("name.given").unwrap();
        let second = engine.parse("name.given").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_custom_function_collision_is_a_configuration_error() {
        let engine = Engine::new();
        let options = EvalOptions::new().with_function(
            "count",
            Arc::new(|focus: &Collection, _args: &[Collection]| Ok(focus.clone())),
        );
        let err = engine
            .evaluate("1 + 1", &json!(null), &options)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_custom_function_dispatch() {
        let engine = Engine::new();
        let options = EvalOptions::new().with_function(
            "double",
            Arc::new(|focus: &Collection, _args: &[Collection]| {
                Ok(focus
                    .iter()
                    .map(|v| match v {
                        Value::Integer(i) => Value::integer(i * 2),
                        other => other.clone(),
                    })
                    .collect())
            }),
        );
        let result = engine
            .evaluate("$this.double()", &json!([1, 2, 3]), &options)
            .unwrap();
        assert_eq!(result.to_json(), json!([2, 4, 6]));
    }

    #[test]
    fn test_unknown_function_error() {
        let engine = Engine::new();
        let err = engine
            .evaluate("name.frobnicate()", &json!({}), &EvalOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownFunction);
    }

    #[test]
    fn test_variables_and_environment() {
        let engine = Engine::new();
        let options = EvalOptions::new()
            .with_env_variable("base", Collection::singleton(Value::integer(10)))
            .with_variable("%offset", Collection::singleton(Value::integer(4)));
        let result = engine
            .evaluate("%base + %offset", &json!(null), &options)
            .unwrap();
        assert_eq!(result.as_integer(), Some(14));
    }

    #[test]
    fn test_trace_sink_receives_output() {
        use std::sync::Mutex;
        let engine = Engine::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            Arc::new(move |name: &str, value: &Collection| {
                seen.lock().unwrap().push(format!("{name}={}", value.len()));
            })
        };
        let options = EvalOptions::new().with_trace(sink);
        let result = engine
            .evaluate("$this.trace('items').count()", &json!([1, 2]), &options)
            .unwrap();
        assert_eq!(result.as_integer(), Some(2));
        assert_eq!(seen.lock().unwrap().as_slice(), ["items=2"]);
    }
}
