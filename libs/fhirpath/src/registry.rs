//! Operation registry
//!
//! The single source of truth for operators and functions: symbols, token
//! kinds, precedence, associativity, arity, parameter modes, and the
//! evaluator for each entry. The parser consults the registry for precedence
//! and associativity; the evaluator consults it for dispatch. Adding an
//! operation means adding a table entry, never touching the parser.
//!
//! The registry is initialized exactly once and read-only afterwards.
//! Per-evaluation custom functions live in `EvalOptions`, not here.

use phf::phf_map;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::ast::{Expr, LiteralValue};
use crate::context::EvalContext;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions;
use crate::operators;
use crate::token::{Position, Token, TokenKind};
use crate::value::Collection;

/// Whether an operator is written before or between its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorForm {
    Prefix,
    Infix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// How an operator entry is executed.
pub enum OperatorEval {
    /// Plain collection-in, collection-out infix operator.
    Binary(fn(&Collection, &Collection, Position) -> Result<Collection>),
    /// Prefix operator.
    Unary(fn(&Collection, Position) -> Result<Collection>),
    /// Evaluated structurally by the tree walker (dot pipeline, union,
    /// indexer, `is`/`as`), which needs the AST rather than operand values.
    Structural,
}

pub struct Operator {
    pub symbol: &'static str,
    pub token: TokenKind,
    pub form: OperatorForm,
    pub precedence: u8,
    pub associativity: Associativity,
    pub eval: OperatorEval,
}

/// How a function parameter slot receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// The argument is evaluated before the call.
    Eager,
    /// The argument is passed as a raw AST node; the function evaluates it
    /// itself (iterator functions, `iif`, type specifiers).
    Lazy,
}

/// An argument as delivered to a function evaluator.
pub enum Argument<'a> {
    Eager(Collection),
    Lazy(&'a Expr),
}

impl<'a> Argument<'a> {
    pub fn eager(&self, cc: &CallContext) -> Result<&Collection> {
        match self {
            Argument::Eager(collection) => Ok(collection),
            Argument::Lazy(_) => Err(Error::evaluation(
                format!("{}() received a lazy argument where a value was expected", cc.function),
                cc.position,
            )),
        }
    }

    pub fn lazy(&self, cc: &CallContext) -> Result<&'a Expr> {
        match self {
            Argument::Lazy(expr) => Ok(*expr),
            Argument::Eager(_) => Err(Error::evaluation(
                format!("{}() received a value where an expression was expected", cc.function),
                cc.position,
            )),
        }
    }
}

/// Call-site state handed to every function evaluator.
pub struct CallContext<'a> {
    pub evaluator: &'a Evaluator<'a>,
    pub ctx: &'a EvalContext,
    pub function: &'static str,
    pub position: Position,
    /// Set by `defineVariable` to make a binding visible to downstream
    /// pipeline stages; `None` leaves the caller's context unchanged.
    pub next_ctx: Option<EvalContext>,
}

impl<'a> CallContext<'a> {
    /// Evaluate an argument subtree in the given context, discarding any
    /// context changes (bindings made inside an argument do not escape it).
    pub fn eval(&self, expr: &Expr, ctx: &EvalContext) -> Result<Collection> {
        self.evaluator.evaluate(expr, ctx).map(|(value, _)| value)
    }

    pub fn arg_error(&self, message: impl Into<String>) -> Error {
        Error::ArgumentType {
            function: self.function.to_string(),
            message: message.into(),
            position: self.position,
        }
    }

    pub fn type_error(&self, message: impl Into<String>) -> Error {
        Error::type_error(message, self.position)
    }

    pub fn eval_error(&self, message: impl Into<String>) -> Error {
        Error::evaluation(message, self.position)
    }
}

pub type FunctionEval = fn(&mut CallContext, Collection, &[Argument]) -> Result<Collection>;

pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub param_modes: &'static [ParamMode],
    pub eval: FunctionEval,
}

impl FunctionDef {
    /// Mode for the given parameter slot; slots beyond the declared list are
    /// eager.
    pub fn mode_for(&self, index: usize) -> ParamMode {
        self.param_modes
            .get(index)
            .copied()
            .unwrap_or(ParamMode::Eager)
    }

    pub fn validate_arity(&self, actual: usize, position: Position) -> Result<()> {
        let ok = actual >= self.min_args && self.max_args.map(|max| actual <= max).unwrap_or(true);
        if ok {
            return Ok(());
        }
        let expected = match self.max_args {
            Some(max) if max == self.min_args => format!("{max}"),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        };
        Err(Error::ArgumentCount {
            function: self.name.to_string(),
            expected,
            actual,
            position,
        })
    }
}

const ALL_EAGER: &[ParamMode] = &[];
const LAZY: &[ParamMode] = &[ParamMode::Lazy];
const LAZY_LAZY_LAZY: &[ParamMode] = &[ParamMode::Lazy, ParamMode::Lazy, ParamMode::Lazy];
const EAGER_LAZY: &[ParamMode] = &[ParamMode::Eager, ParamMode::Lazy];
const LAZY_EAGER: &[ParamMode] = &[ParamMode::Lazy, ParamMode::Eager];

macro_rules! function {
    ($name:literal, $min:literal..$max:literal, $modes:expr, $eval:path) => {
        FunctionDef {
            name: $name,
            min_args: $min,
            max_args: Some($max),
            param_modes: $modes,
            eval: $eval,
        }
    };
}

/// Static function table. Perfect-hashed at compile time; zero runtime
/// allocation on lookup.
static FUNCTIONS: phf::Map<&'static str, FunctionDef> = phf_map! {
    // Existence
    "empty" => function!("empty", 0..0, ALL_EAGER, functions::existence::empty),
    "exists" => function!("exists", 0..1, LAZY, functions::existence::exists),
    "all" => function!("all", 1..1, LAZY, functions::existence::all),
    "allTrue" => function!("allTrue", 0..0, ALL_EAGER, functions::existence::all_true),
    "anyTrue" => function!("anyTrue", 0..0, ALL_EAGER, functions::existence::any_true),
    "allFalse" => function!("allFalse", 0..0, ALL_EAGER, functions::existence::all_false),
    "anyFalse" => function!("anyFalse", 0..0, ALL_EAGER, functions::existence::any_false),
    "count" => function!("count", 0..0, ALL_EAGER, functions::existence::count),
    "distinct" => function!("distinct", 0..0, ALL_EAGER, functions::existence::distinct),
    "isDistinct" => function!("isDistinct", 0..0, ALL_EAGER, functions::existence::is_distinct),
    "subsetOf" => function!("subsetOf", 1..1, ALL_EAGER, functions::existence::subset_of),
    "supersetOf" => function!("supersetOf", 1..1, ALL_EAGER, functions::existence::superset_of),

    // Filtering / projection
    "where" => function!("where", 1..1, LAZY, functions::filtering::where_func),
    "select" => function!("select", 1..1, LAZY, functions::filtering::select),
    "repeat" => function!("repeat", 1..1, LAZY, functions::filtering::repeat),
    "ofType" => function!("ofType", 1..1, LAZY, functions::types::of_type),

    // Subsetting
    "single" => function!("single", 0..0, ALL_EAGER, functions::subsetting::single),
    "first" => function!("first", 0..0, ALL_EAGER, functions::subsetting::first),
    "last" => function!("last", 0..0, ALL_EAGER, functions::subsetting::last),
    "tail" => function!("tail", 0..0, ALL_EAGER, functions::subsetting::tail),
    "skip" => function!("skip", 1..1, ALL_EAGER, functions::subsetting::skip),
    "take" => function!("take", 1..1, ALL_EAGER, functions::subsetting::take),
    "intersect" => function!("intersect", 1..1, ALL_EAGER, functions::subsetting::intersect),
    "exclude" => function!("exclude", 1..1, ALL_EAGER, functions::subsetting::exclude),

    // Combining
    "union" => function!("union", 1..1, ALL_EAGER, functions::combining::union),
    "combine" => function!("combine", 1..1, ALL_EAGER, functions::combining::combine),

    // Strings
    "length" => function!("length", 0..0, ALL_EAGER, functions::string::length),
    "substring" => function!("substring", 1..2, ALL_EAGER, functions::string::substring),
    "indexOf" => function!("indexOf", 1..1, ALL_EAGER, functions::string::index_of),
    "lastIndexOf" => function!("lastIndexOf", 1..1, ALL_EAGER, functions::string::last_index_of),
    "startsWith" => function!("startsWith", 1..1, ALL_EAGER, functions::string::starts_with),
    "endsWith" => function!("endsWith", 1..1, ALL_EAGER, functions::string::ends_with),
    "contains" => function!("contains", 1..1, ALL_EAGER, functions::string::contains),
    "upper" => function!("upper", 0..0, ALL_EAGER, functions::string::upper),
    "lower" => function!("lower", 0..0, ALL_EAGER, functions::string::lower),
    "replace" => function!("replace", 2..2, ALL_EAGER, functions::string::replace),
    "matches" => function!("matches", 1..1, ALL_EAGER, functions::string::matches),
    "replaceMatches" => function!("replaceMatches", 2..2, ALL_EAGER, functions::string::replace_matches),
    "toChars" => function!("toChars", 0..0, ALL_EAGER, functions::string::to_chars),
    "trim" => function!("trim", 0..0, ALL_EAGER, functions::string::trim),
    "split" => function!("split", 1..1, ALL_EAGER, functions::string::split),
    "join" => function!("join", 0..1, ALL_EAGER, functions::string::join),
    "encode" => function!("encode", 1..1, ALL_EAGER, functions::string::encode),
    "decode" => function!("decode", 1..1, ALL_EAGER, functions::string::decode),
    "escape" => function!("escape", 1..1, ALL_EAGER, functions::string::escape),
    "unescape" => function!("unescape", 1..1, ALL_EAGER, functions::string::unescape),

    // Math
    "abs" => function!("abs", 0..0, ALL_EAGER, functions::math::abs),
    "ceiling" => function!("ceiling", 0..0, ALL_EAGER, functions::math::ceiling),
    "floor" => function!("floor", 0..0, ALL_EAGER, functions::math::floor),
    "round" => function!("round", 0..1, ALL_EAGER, functions::math::round),
    "sqrt" => function!("sqrt", 0..0, ALL_EAGER, functions::math::sqrt),
    "exp" => function!("exp", 0..0, ALL_EAGER, functions::math::exp),
    "ln" => function!("ln", 0..0, ALL_EAGER, functions::math::ln),
    "log" => function!("log", 1..1, ALL_EAGER, functions::math::log),
    "power" => function!("power", 1..1, ALL_EAGER, functions::math::power),
    "truncate" => function!("truncate", 0..0, ALL_EAGER, functions::math::truncate),

    // Conversion
    "iif" => function!("iif", 2..3, LAZY_LAZY_LAZY, functions::conversion::iif),
    "toString" => function!("toString", 0..0, ALL_EAGER, functions::conversion::to_string),
    "toInteger" => function!("toInteger", 0..0, ALL_EAGER, functions::conversion::to_integer),
    "toDecimal" => function!("toDecimal", 0..0, ALL_EAGER, functions::conversion::to_decimal),
    "toBoolean" => function!("toBoolean", 0..0, ALL_EAGER, functions::conversion::to_boolean),
    "toDate" => function!("toDate", 0..0, ALL_EAGER, functions::conversion::to_date),
    "toDateTime" => function!("toDateTime", 0..0, ALL_EAGER, functions::conversion::to_datetime),
    "toTime" => function!("toTime", 0..0, ALL_EAGER, functions::conversion::to_time),
    "toQuantity" => function!("toQuantity", 0..0, ALL_EAGER, functions::conversion::to_quantity),
    "convertsToString" => function!("convertsToString", 0..0, ALL_EAGER, functions::conversion::converts_to_string),
    "convertsToInteger" => function!("convertsToInteger", 0..0, ALL_EAGER, functions::conversion::converts_to_integer),
    "convertsToDecimal" => function!("convertsToDecimal", 0..0, ALL_EAGER, functions::conversion::converts_to_decimal),
    "convertsToBoolean" => function!("convertsToBoolean", 0..0, ALL_EAGER, functions::conversion::converts_to_boolean),
    "convertsToDate" => function!("convertsToDate", 0..0, ALL_EAGER, functions::conversion::converts_to_date),
    "convertsToDateTime" => function!("convertsToDateTime", 0..0, ALL_EAGER, functions::conversion::converts_to_datetime),
    "convertsToTime" => function!("convertsToTime", 0..0, ALL_EAGER, functions::conversion::converts_to_time),
    "convertsToQuantity" => function!("convertsToQuantity", 0..0, ALL_EAGER, functions::conversion::converts_to_quantity),

    // Navigation
    "children" => function!("children", 0..0, ALL_EAGER, functions::navigation::children),
    "descendants" => function!("descendants", 0..0, ALL_EAGER, functions::navigation::descendants),

    // Types
    "is" => function!("is", 1..1, LAZY, functions::types::is_func),
    "as" => function!("as", 1..1, LAZY, functions::types::as_func),
    "type" => function!("type", 0..0, ALL_EAGER, functions::types::type_func),

    // Utility
    "not" => function!("not", 0..0, ALL_EAGER, functions::utility::not),
    "trace" => function!("trace", 1..2, EAGER_LAZY, functions::utility::trace),
    "defineVariable" => function!("defineVariable", 1..2, ALL_EAGER, functions::utility::define_variable),
    "aggregate" => function!("aggregate", 1..2, LAZY_EAGER, functions::utility::aggregate),
};

/// Static operator table. Precedence follows the FHIRPath ladder; `implies`
/// is the only right-associative infix operator.
static OPERATORS: &[Operator] = &[
    // Postfix forms (handled structurally by the parser loop)
    Operator { symbol: ".", token: TokenKind::Dot, form: OperatorForm::Infix, precedence: 100, associativity: Associativity::Left, eval: OperatorEval::Structural },
    Operator { symbol: "[", token: TokenKind::LBracket, form: OperatorForm::Infix, precedence: 100, associativity: Associativity::Left, eval: OperatorEval::Structural },
    // Type operators
    Operator { symbol: "is", token: TokenKind::Is, form: OperatorForm::Infix, precedence: 90, associativity: Associativity::Left, eval: OperatorEval::Structural },
    Operator { symbol: "as", token: TokenKind::As, form: OperatorForm::Infix, precedence: 90, associativity: Associativity::Left, eval: OperatorEval::Structural },
    // Multiplicative
    Operator { symbol: "*", token: TokenKind::Star, form: OperatorForm::Infix, precedence: 80, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::multiply) },
    Operator { symbol: "/", token: TokenKind::Slash, form: OperatorForm::Infix, precedence: 80, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::divide) },
    Operator { symbol: "div", token: TokenKind::Div, form: OperatorForm::Infix, precedence: 80, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::integer_divide) },
    Operator { symbol: "mod", token: TokenKind::Mod, form: OperatorForm::Infix, precedence: 80, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::modulo) },
    // Additive
    Operator { symbol: "+", token: TokenKind::Plus, form: OperatorForm::Infix, precedence: 70, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::add) },
    Operator { symbol: "-", token: TokenKind::Minus, form: OperatorForm::Infix, precedence: 70, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::subtract) },
    // String concatenation
    Operator { symbol: "&", token: TokenKind::Concat, form: OperatorForm::Infix, precedence: 60, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::concat) },
    // Comparison
    Operator { symbol: "<", token: TokenKind::Lt, form: OperatorForm::Infix, precedence: 50, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::less_than) },
    Operator { symbol: ">", token: TokenKind::Gt, form: OperatorForm::Infix, precedence: 50, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::greater_than) },
    Operator { symbol: "<=", token: TokenKind::Le, form: OperatorForm::Infix, precedence: 50, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::less_or_equal) },
    Operator { symbol: ">=", token: TokenKind::Ge, form: OperatorForm::Infix, precedence: 50, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::greater_or_equal) },
    // Equality / equivalence
    Operator { symbol: "=", token: TokenKind::Eq, form: OperatorForm::Infix, precedence: 40, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::equal) },
    Operator { symbol: "!=", token: TokenKind::Ne, form: OperatorForm::Infix, precedence: 40, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::not_equal) },
    Operator { symbol: "~", token: TokenKind::Equiv, form: OperatorForm::Infix, precedence: 40, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::equivalent) },
    Operator { symbol: "!~", token: TokenKind::NEquiv, form: OperatorForm::Infix, precedence: 40, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::not_equivalent) },
    // Membership
    Operator { symbol: "in", token: TokenKind::In, form: OperatorForm::Infix, precedence: 35, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::in_collection) },
    Operator { symbol: "contains", token: TokenKind::Contains, form: OperatorForm::Infix, precedence: 35, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::collection_contains) },
    // Boolean
    Operator { symbol: "and", token: TokenKind::And, form: OperatorForm::Infix, precedence: 30, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::and) },
    Operator { symbol: "or", token: TokenKind::Or, form: OperatorForm::Infix, precedence: 20, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::or) },
    Operator { symbol: "xor", token: TokenKind::Xor, form: OperatorForm::Infix, precedence: 20, associativity: Associativity::Left, eval: OperatorEval::Binary(operators::xor) },
    Operator { symbol: "implies", token: TokenKind::Implies, form: OperatorForm::Infix, precedence: 10, associativity: Associativity::Right, eval: OperatorEval::Binary(operators::implies) },
    // Union
    Operator { symbol: "|", token: TokenKind::Pipe, form: OperatorForm::Infix, precedence: 5, associativity: Associativity::Left, eval: OperatorEval::Structural },
    // Prefix forms bind tighter than any infix arithmetic
    Operator { symbol: "+", token: TokenKind::Plus, form: OperatorForm::Prefix, precedence: 95, associativity: Associativity::Right, eval: OperatorEval::Unary(operators::unary_plus) },
    Operator { symbol: "-", token: TokenKind::Minus, form: OperatorForm::Prefix, precedence: 95, associativity: Associativity::Right, eval: OperatorEval::Unary(operators::unary_minus) },
    Operator { symbol: "not", token: TokenKind::Not, form: OperatorForm::Prefix, precedence: 95, associativity: Associativity::Right, eval: OperatorEval::Unary(operators::unary_not) },
];

/// A literal form recognized across two adjacent tokens (quantity literals).
pub struct LiteralForm {
    pub name: &'static str,
    pub recognize: fn(current: &Token, next: &Token) -> bool,
    pub parse: fn(current: &Token, next: &Token) -> Result<LiteralValue>,
}

fn quantity_recognize(current: &Token, next: &Token) -> bool {
    current.kind == TokenKind::Number
        && matches!(next.kind, TokenKind::String | TokenKind::Unit)
}

fn quantity_parse(current: &Token, next: &Token) -> Result<LiteralValue> {
    let value = rust_decimal::Decimal::from_str(&current.lexeme).map_err(|e| {
        Error::syntax(
            format!("invalid number '{}': {e}", current.lexeme),
            current.position,
            crate::error::SyntaxContext::Expression,
        )
    })?;
    Ok(LiteralValue::Quantity {
        value,
        unit: next.lexeme.clone(),
    })
}

static LITERAL_FORMS: &[LiteralForm] = &[LiteralForm {
    name: "quantity",
    recognize: quantity_recognize,
    parse: quantity_parse,
}];

/// The process-wide operation registry.
pub struct Registry {
    infix: HashMap<TokenKind, &'static Operator>,
    prefix: HashMap<TokenKind, &'static Operator>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Force registry initialization. Calling this is optional; the first parse
/// or evaluation initializes the registry on demand.
pub fn init() {
    let _ = Registry::global();
}

impl Registry {
    pub fn global() -> &'static Registry {
        REGISTRY.get_or_init(Registry::build)
    }

    fn build() -> Self {
        let mut infix = HashMap::new();
        let mut prefix = HashMap::new();
        for op in OPERATORS {
            let table = match op.form {
                OperatorForm::Infix => &mut infix,
                OperatorForm::Prefix => &mut prefix,
            };
            let previous = table.insert(op.token, op);
            debug_assert!(
                previous.is_none(),
                "duplicate operator registration for {:?}",
                op.token
            );
        }
        Self { infix, prefix }
    }

    /// Lookup by `(token kind, form)`.
    pub fn operator(&self, token: TokenKind, form: OperatorForm) -> Option<&'static Operator> {
        match form {
            OperatorForm::Infix => self.infix.get(&token).copied(),
            OperatorForm::Prefix => self.prefix.get(&token).copied(),
        }
    }

    pub fn infix(&self, token: TokenKind) -> Option<&'static Operator> {
        self.infix.get(&token).copied()
    }

    pub fn prefix(&self, token: TokenKind) -> Option<&'static Operator> {
        self.prefix.get(&token).copied()
    }

    /// Lookup by symbol name (`"+"`, `"implies"`).
    pub fn by_symbol(&self, symbol: &str, form: OperatorForm) -> Option<&'static Operator> {
        OPERATORS
            .iter()
            .find(|op| op.symbol == symbol && op.form == form)
    }

    /// Infix precedence of a token kind, if it is an infix operator.
    pub fn precedence(&self, token: TokenKind) -> Option<u8> {
        self.infix(token).map(|op| op.precedence)
    }

    /// Lookup a built-in function by name.
    pub fn function(&self, name: &str) -> Option<&'static FunctionDef> {
        FUNCTIONS.get(name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &'static str> {
        FUNCTIONS.keys().copied()
    }

    /// Operator keywords (alphabetic symbols), for identifier
    /// disambiguation in the parser.
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> {
        OPERATORS
            .iter()
            .filter(|op| op.symbol.chars().all(|c| c.is_ascii_alphabetic()))
            .map(|op| op.symbol)
    }

    /// Try the registered literal forms on a pair of adjacent tokens.
    pub fn match_literal(&self, current: &Token, next: &Token) -> Option<Result<LiteralValue>> {
        LITERAL_FORMS
            .iter()
            .find(|form| (form.recognize)(current, next))
            .map(|form| (form.parse)(current, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ladder() {
        let registry = Registry::global();
        let prec = |token| registry.precedence(token).unwrap();

        assert!(prec(TokenKind::Dot) > prec(TokenKind::Is));
        assert!(prec(TokenKind::Is) > prec(TokenKind::Star));
        assert!(prec(TokenKind::Star) > prec(TokenKind::Plus));
        assert!(prec(TokenKind::Plus) > prec(TokenKind::Concat));
        assert!(prec(TokenKind::Concat) > prec(TokenKind::Lt));
        assert!(prec(TokenKind::Lt) > prec(TokenKind::Eq));
        assert!(prec(TokenKind::Eq) > prec(TokenKind::In));
        assert!(prec(TokenKind::In) > prec(TokenKind::And));
        assert!(prec(TokenKind::And) > prec(TokenKind::Or));
        assert!(prec(TokenKind::Or) > prec(TokenKind::Implies));
        assert!(prec(TokenKind::Implies) > prec(TokenKind::Pipe));
    }

    #[test]
    fn test_implies_is_the_only_right_associative_infix() {
        for op in OPERATORS {
            if op.form != OperatorForm::Infix {
                continue;
            }
            let expect_right = op.token == TokenKind::Implies;
            assert_eq!(
                op.associativity == Associativity::Right,
                expect_right,
                "unexpected associativity for {:?}",
                op.token
            );
        }
    }

    #[test]
    fn test_unary_binds_tighter_than_arithmetic() {
        let registry = Registry::global();
        let minus = registry.prefix(TokenKind::Minus).unwrap();
        assert!(minus.precedence > registry.precedence(TokenKind::Star).unwrap());
        assert!(registry.prefix(TokenKind::Not).is_some());
    }

    #[test]
    fn test_symbol_lookup() {
        let registry = Registry::global();
        assert!(registry.by_symbol("+", OperatorForm::Infix).is_some());
        assert!(registry.by_symbol("+", OperatorForm::Prefix).is_some());
        assert!(registry.by_symbol("implies", OperatorForm::Infix).is_some());
        assert!(registry.by_symbol("??", OperatorForm::Infix).is_none());
    }

    #[test]
    fn test_function_lookup_and_arity() {
        let registry = Registry::global();
        let where_def = registry.function("where").unwrap();
        assert!(where_def.validate_arity(1, Position::default()).is_ok());
        assert!(where_def.validate_arity(0, Position::default()).is_err());
        assert!(where_def.validate_arity(2, Position::default()).is_err());
        assert_eq!(where_def.mode_for(0), ParamMode::Lazy);

        let round = registry.function("round").unwrap();
        assert!(round.validate_arity(0, Position::default()).is_ok());
        assert!(round.validate_arity(1, Position::default()).is_ok());
        assert!(round.validate_arity(2, Position::default()).is_err());
        assert_eq!(round.mode_for(0), ParamMode::Eager);

        assert!(registry.function("nope").is_none());
    }

    #[test]
    fn test_required_functions_registered() {
        let registry = Registry::global();
        for name in [
            "where", "select", "first", "last", "tail", "skip", "take", "count", "empty",
            "exists", "all", "allTrue", "allFalse", "anyTrue", "anyFalse", "distinct",
            "isDistinct", "single", "union", "combine", "intersect", "exclude", "iif", "trace",
            "defineVariable", "substring", "indexOf", "startsWith", "endsWith", "contains",
            "upper", "lower", "replace", "matches", "replaceMatches", "length", "toChars",
            "encode", "decode", "abs", "ceiling", "floor", "round", "sqrt", "exp", "ln", "log",
            "power", "truncate", "toString", "toInteger", "toDecimal", "toBoolean", "toDate",
            "toDateTime", "toTime", "toQuantity", "convertsToString", "convertsToInteger",
            "convertsToDecimal", "convertsToBoolean", "convertsToDate", "convertsToDateTime",
            "convertsToTime", "convertsToQuantity", "ofType", "is", "as", "type", "not",
            "aggregate", "repeat", "subsetOf", "supersetOf",
        ] {
            assert!(
                registry.function(name).is_some(),
                "function '{name}' is not registered"
            );
        }
    }

    #[test]
    fn test_keyword_enumeration() {
        let registry = Registry::global();
        let keywords: Vec<&str> = registry.keywords().collect();
        for kw in ["and", "or", "xor", "implies", "in", "contains", "is", "as", "div", "mod"] {
            assert!(keywords.contains(&kw), "missing keyword {kw}");
        }
    }

    #[test]
    fn test_quantity_literal_form() {
        let registry = Registry::global();
        let number = Token::new(TokenKind::Number, "5.4", Position::default());
        let unit = Token::new(TokenKind::String, "mg", Position::default());
        let literal = registry.match_literal(&number, &unit).unwrap().unwrap();
        assert!(matches!(literal, LiteralValue::Quantity { .. }));

        let ident = Token::new(TokenKind::Identifier, "mg", Position::default());
        assert!(registry.match_literal(&number, &ident).is_none());
    }
}
