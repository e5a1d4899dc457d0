//! Token types for the FHIRPath lexer
//!
//! Tokens represent the lexical elements of FHIRPath expressions. The kind
//! enumeration is the wire contract between the lexer and the parser.

use std::fmt;

/// Source position of a token or AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    /// 0-based character offset from the start of the source
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Token kinds for the FHIRPath lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,
    Dot,      // .

    // Arithmetic
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /
    Div,   // div
    Mod,   // mod

    // Comparison
    Lt,     // <
    Gt,     // >
    Le,     // <=
    Ge,     // >=
    Eq,     // =
    Ne,     // !=
    Equiv,  // ~
    NEquiv, // !~

    // Collection / string
    Pipe,   // |
    Concat, // &

    // Keyword operators
    And,
    Or,
    Xor,
    Implies,
    Not,
    In,
    Contains,

    // Type operators
    As,
    Is,

    // Literals
    Number,
    String,
    True,
    False,
    Null, // {}
    Date,
    DateTime,
    Time,
    Unit, // calendar duration keyword (year, months, ...)

    // Identifiers
    Identifier,
    DelimitedIdentifier,

    // Variables
    This,   // $this
    Index,  // $index
    Total,  // $total
    EnvVar, // %identifier, %`delimited`, %'string'

    // End of input
    Eof,
}

/// A token in a FHIRPath expression.
///
/// `lexeme` holds the processed text: string literals and delimited
/// identifiers have their quotes stripped and escapes resolved, environment
/// variables are stored without the leading `%`. Numeric and date/time
/// tokens keep their raw source shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn eof(position: Position) -> Self {
        Self {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            position,
        }
    }
}
