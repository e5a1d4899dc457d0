//! Abstract syntax tree for FHIRPath expressions
//!
//! The AST is a sum type: one variant per node kind, each carrying the source
//! position of the construct. Function arguments are raw subtrees; nothing is
//! evaluated at parse time.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::token::{Position, TokenKind};
use crate::value::{DatePrecision, DateTimePrecision, TimePrecision};

/// A literal payload together with its value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// The null literal `{}` (the empty collection)
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate, DatePrecision),
    /// DateTime with the offset seconds east of UTC as written in the
    /// source; `None` when the literal carried no timezone.
    DateTime(DateTime<FixedOffset>, DateTimePrecision, Option<i32>),
    Time(NaiveTime, TimePrecision),
    Quantity { value: Decimal, unit: String },
}

/// Which special form a variable reference uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// `$this`
    This,
    /// `$index`
    Index,
    /// `$total`
    Total,
    /// `%name`
    Environment,
}

/// A (possibly qualified) type name: `Patient`, `FHIR.Patient`,
/// `System.Integer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier {
    pub qualifier: Option<String>,
    pub name: String,
}

impl TypeSpecifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// AST node for a FHIRPath expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value
    Literal {
        value: LiteralValue,
        position: Position,
    },

    /// A bare name: property navigation on the current focus
    Identifier { name: String, position: Position },

    /// A capitalized bare name: may denote a type in type contexts,
    /// otherwise behaves as a regular identifier
    TypeOrIdentifier { name: String, position: Position },

    /// `$this`, `$index`, `$total`, or `%name`
    Variable {
        kind: VariableKind,
        name: String,
        position: Position,
    },

    /// Infix operator application. The dot operator is a Binary node with
    /// pipeline semantics.
    Binary {
        op: TokenKind,
        left: Box<Expr>,
        right: Box<Expr>,
        position: Position,
    },

    /// Prefix operator application (`+`, `-`, `not`)
    Unary {
        op: TokenKind,
        operand: Box<Expr>,
        position: Position,
    },

    /// Function invocation; arguments are unevaluated subtrees
    Function {
        name: String,
        args: Vec<Expr>,
        position: Position,
    },

    /// Collection literal `{e1, e2, ...}`
    Collection {
        elements: Vec<Expr>,
        position: Position,
    },

    /// Indexer `expr[index]`
    Index {
        expression: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },

    /// Union of two or more operands joined by `|`
    Union {
        operands: Vec<Expr>,
        position: Position,
    },

    /// `expr is Type`
    MembershipTest {
        expression: Box<Expr>,
        type_name: TypeSpecifier,
        position: Position,
    },

    /// `expr as Type`
    TypeCast {
        expression: Box<Expr>,
        type_name: TypeSpecifier,
        position: Position,
    },

    /// A namespace-qualified type name in expression position
    /// (`System.Integer`, `FHIR.Patient`), used as a type argument
    TypeReference {
        type_name: TypeSpecifier,
        position: Position,
    },
}

impl Expr {
    /// The source position covering the start of this node's span.
    pub fn position(&self) -> Position {
        match self {
            Expr::Literal { position, .. }
            | Expr::Identifier { position, .. }
            | Expr::TypeOrIdentifier { position, .. }
            | Expr::Variable { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Function { position, .. }
            | Expr::Collection { position, .. }
            | Expr::Index { position, .. }
            | Expr::Union { position, .. }
            | Expr::MembershipTest { position, .. }
            | Expr::TypeCast { position, .. }
            | Expr::TypeReference { position, .. } => *position,
        }
    }

    /// Read this subtree as a type specifier, for functions that take one
    /// (`is()`, `as()`, `ofType()`).
    pub fn as_type_specifier(&self) -> Option<TypeSpecifier> {
        match self {
            Expr::TypeOrIdentifier { name, .. } | Expr::Identifier { name, .. } => {
                Some(TypeSpecifier::new(name.clone()))
            }
            Expr::TypeReference { type_name, .. } => Some(type_name.clone()),
            Expr::Binary {
                op: TokenKind::Dot,
                left,
                right,
                ..
            } => {
                let qualifier = match left.as_ref() {
                    Expr::TypeOrIdentifier { name, .. } | Expr::Identifier { name, .. } => {
                        name.clone()
                    }
                    _ => return None,
                };
                let name = match right.as_ref() {
                    Expr::TypeOrIdentifier { name, .. } | Expr::Identifier { name, .. } => {
                        name.clone()
                    }
                    _ => return None,
                };
                Some(TypeSpecifier::qualified(qualifier, name))
            }
            _ => None,
        }
    }
}
