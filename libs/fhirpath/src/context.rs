//! Evaluation context for FHIRPath expressions
//!
//! The context carries the root input, the current focus, and the variable
//! scopes. All operations are copy-on-write: a child evaluation gets a new
//! context that shares structure with its parent and can never mutate the
//! parent's view.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::token::Position;
use crate::value::{Collection, Value};

/// One frame in the variable scope chain.
///
/// Scopes are linked through `Arc` parents (the prototype-chain strategy):
/// lookup walks outward, binding pushes a new frame, and dropping a child
/// restores the parent untouched.
#[derive(Debug, Default)]
struct Scope {
    parent: Option<Arc<Scope>>,
    /// `%`-namespace variables, stored without the prefix.
    variables: HashMap<Arc<str>, Collection>,
    /// Innermost iterator bindings.
    this: Option<Collection>,
    index: Option<i64>,
    total: Option<Collection>,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<&Collection> {
        if let Some(value) = self.variables.get(name) {
            return Some(value);
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    fn this(&self) -> Option<&Collection> {
        if let Some(this) = &self.this {
            return Some(this);
        }
        self.parent.as_ref().and_then(|p| p.this())
    }

    fn index(&self) -> Option<i64> {
        if let Some(index) = self.index {
            return Some(index);
        }
        self.parent.as_ref().and_then(|p| p.index())
    }

    fn total(&self) -> Option<&Collection> {
        if let Some(total) = &self.total {
            return Some(total);
        }
        self.parent.as_ref().and_then(|p| p.total())
    }
}

/// Evaluation context: input, focus, and variable scopes.
#[derive(Debug, Clone)]
pub struct EvalContext {
    input: Collection,
    focus: Collection,
    scope: Arc<Scope>,
}

impl EvalContext {
    /// Root context for an evaluation: focus is the input and `$this` is
    /// bound to it.
    pub fn new(input: Collection) -> Self {
        let scope = Scope {
            this: Some(input.clone()),
            ..Scope::default()
        };
        Self {
            focus: input.clone(),
            input,
            scope: Arc::new(scope),
        }
    }

    /// Root context with pre-populated `%`-variables. `environment` bindings
    /// sit in an outer frame so `variables` can shadow them.
    pub fn with_bindings(
        input: Collection,
        environment: HashMap<Arc<str>, Collection>,
        variables: HashMap<Arc<str>, Collection>,
    ) -> Self {
        let env_scope = Scope {
            variables: environment,
            ..Scope::default()
        };
        let scope = Scope {
            parent: Some(Arc::new(env_scope)),
            variables,
            this: Some(input.clone()),
            ..Scope::default()
        };
        Self {
            focus: input.clone(),
            input,
            scope: Arc::new(scope),
        }
    }

    pub fn input(&self) -> &Collection {
        &self.input
    }

    pub fn focus(&self) -> &Collection {
        &self.focus
    }

    /// New context with the given focus; scopes are shared.
    pub fn with_focus(&self, focus: Collection) -> Self {
        Self {
            input: self.input.clone(),
            focus,
            scope: Arc::clone(&self.scope),
        }
    }

    /// New context for one iteration step: `$this` = [item], `$index` = [i],
    /// focus = [item].
    pub fn with_iterator(&self, item: &Value, index: usize) -> Self {
        let item_collection = Collection::singleton(item.clone());
        let scope = Scope {
            parent: Some(Arc::clone(&self.scope)),
            this: Some(item_collection.clone()),
            index: Some(index as i64),
            ..Scope::default()
        };
        Self {
            input: self.input.clone(),
            focus: item_collection,
            scope: Arc::new(scope),
        }
    }

    /// New context with `$total` bound (aggregate seeds and re-binds this
    /// between iterations).
    pub fn with_total(&self, total: Collection) -> Self {
        let scope = Scope {
            parent: Some(Arc::clone(&self.scope)),
            total: Some(total),
            ..Scope::default()
        };
        Self {
            input: self.input.clone(),
            focus: self.focus.clone(),
            scope: Arc::new(scope),
        }
    }

    /// Bind a user variable in a new enclosing scope. Rebinding a name that
    /// is already visible is an error.
    pub fn set_variable(
        &self,
        name: &str,
        value: Collection,
        position: Position,
    ) -> Result<Self> {
        let name = name.strip_prefix('%').unwrap_or(name);
        if self.scope.lookup(name).is_some() {
            return Err(Error::evaluation(
                format!("variable '{name}' is already defined"),
                position,
            ));
        }
        let mut variables = HashMap::new();
        variables.insert(Arc::<str>::from(name), value);
        let scope = Scope {
            parent: Some(Arc::clone(&self.scope)),
            variables,
            ..Scope::default()
        };
        Ok(Self {
            input: self.input.clone(),
            focus: self.focus.clone(),
            scope: Arc::new(scope),
        })
    }

    /// Look up a `%`-variable (without its prefix) through the scope chain.
    pub fn variable(&self, name: &str) -> Option<&Collection> {
        self.scope.lookup(name.strip_prefix('%').unwrap_or(name))
    }

    /// Innermost `$this` binding.
    pub fn this(&self) -> Option<&Collection> {
        self.scope.this()
    }

    /// Innermost `$index` binding.
    pub fn index(&self) -> Option<i64> {
        self.scope.index()
    }

    /// Innermost `$total` binding.
    pub fn total(&self) -> Option<&Collection> {
        self.scope.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(values: &[i64]) -> Collection {
        values.iter().map(|v| Value::integer(*v)).collect()
    }

    #[test]
    fn test_root_binds_this_to_input() {
        let ctx = EvalContext::new(collection(&[1, 2]));
        assert_eq!(ctx.this(), Some(ctx.input()));
        assert_eq!(ctx.index(), None);
        assert_eq!(ctx.total(), None);
    }

    #[test]
    fn test_iterator_bindings_shadow_and_unwind() {
        let ctx = EvalContext::new(collection(&[10, 20]));
        let inner = ctx.with_iterator(&Value::integer(20), 1);

        assert_eq!(inner.focus(), &collection(&[20]));
        assert_eq!(inner.this(), Some(&collection(&[20])));
        assert_eq!(inner.index(), Some(1));

        // The outer context is untouched.
        assert_eq!(ctx.this(), Some(&collection(&[10, 20])));
        assert_eq!(ctx.index(), None);
    }

    #[test]
    fn test_nested_scope_sees_parent_bindings() {
        let ctx = EvalContext::new(collection(&[1]));
        let with_var = ctx
            .set_variable("v", collection(&[7]), Position::default())
            .unwrap();
        let inner = with_var.with_iterator(&Value::integer(1), 0);

        assert_eq!(inner.variable("v"), Some(&collection(&[7])));
        assert_eq!(inner.variable("%v"), Some(&collection(&[7])));
        // Bindings do not leak to the parent.
        assert_eq!(ctx.variable("v"), None);
    }

    #[test]
    fn test_rebinding_is_an_error() {
        let ctx = EvalContext::new(collection(&[1]));
        let bound = ctx
            .set_variable("v", collection(&[1]), Position::default())
            .unwrap();
        assert!(bound
            .set_variable("v", collection(&[2]), Position::default())
            .is_err());
    }

    #[test]
    fn test_environment_shadowed_by_variables() {
        let mut environment = HashMap::new();
        environment.insert(Arc::<str>::from("v"), collection(&[1]));
        let mut variables = HashMap::new();
        variables.insert(Arc::<str>::from("v"), collection(&[2]));

        let ctx = EvalContext::with_bindings(Collection::empty(), environment, variables);
        assert_eq!(ctx.variable("v"), Some(&collection(&[2])));
    }
}
