//! Type oracle for resource-typed `is`/`as`/`ofType`
//!
//! The engine knows the System primitive types; everything else is delegated
//! to an injected `ModelProvider`. Without one, only primitive type checks
//! succeed.

use crate::value::Value;

/// A named type known to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub name: String,
    /// Base type name, for is-a checks through the hierarchy.
    pub base: Option<String>,
}

/// A property of a model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub type_name: String,
}

/// Capability injected by the host to classify values against resource
/// types. Implementations are expected to be cheap to query; the evaluator
/// consults the oracle per item during `is`/`as`/`ofType`.
pub trait ModelProvider: Send + Sync {
    /// Resolve a type name to its descriptor, if the model knows it.
    fn resolve_type(&self, name: &str) -> Option<TypeDescriptor>;

    /// Whether `value` is an instance of the named type.
    fn is_type(&self, type_name: &str, value: &Value) -> bool;

    /// Whether `child` names the same type as `parent` or a subtype of it.
    fn is_subtype_of(&self, child: &str, parent: &str) -> bool {
        child == parent
    }

    /// Properties of the named type. Hosts building completion or
    /// validation on top of the engine use this; evaluation does not.
    fn properties(&self, _type_name: &str) -> Vec<PropertyDescriptor> {
        Vec::new()
    }
}

/// Structural predicate for the System primitive types (and the lowercase
/// FHIR primitive codes that map onto them). Returns `None` when the name is
/// not a primitive type, leaving the decision to the model provider.
pub fn primitive_type_check(name: &str, value: &Value) -> Option<bool> {
    let matched = match name {
        "Boolean" | "boolean" => matches!(value, Value::Boolean(_)),
        "Integer" | "integer" | "positiveInt" | "unsignedInt" => {
            matches!(value, Value::Integer(_))
        }
        "Decimal" | "decimal" => matches!(value, Value::Decimal(_)),
        "String" | "string" | "uri" | "url" | "canonical" | "code" | "id" | "oid" | "uuid"
        | "markdown" => matches!(value, Value::String(_)),
        "Date" | "date" => matches!(value, Value::Date { .. }),
        "DateTime" | "dateTime" | "instant" => matches!(value, Value::DateTime { .. }),
        "Time" | "time" => matches!(value, Value::Time { .. }),
        "Quantity" => matches!(value, Value::Quantity { .. }),
        _ => return None,
    };
    Some(matched)
}
