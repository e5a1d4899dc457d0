//! Error types for the FHIRPath engine

use crate::token::Position;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error kind identifiers for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Evaluation,
    Type,
    UnknownVariable,
    UnknownFunction,
    ArgumentCount,
    ArgumentType,
    Configuration,
}

/// Parser state when a syntax error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxContext {
    Expression,
    FunctionCall,
    Index,
    Collection,
    TypeCast,
    MembershipTest,
    BinaryRhs,
}

impl SyntaxContext {
    fn describe(self) -> &'static str {
        match self {
            SyntaxContext::Expression => "expression",
            SyntaxContext::FunctionCall => "function call",
            SyntaxContext::Index => "indexer",
            SyntaxContext::Collection => "collection literal",
            SyntaxContext::TypeCast => "type cast",
            SyntaxContext::MembershipTest => "membership test",
            SyntaxContext::BinaryRhs => "operator right-hand side",
        }
    }
}

/// FHIRPath engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("lexical error at {position}: {message}")]
    Lexical { message: String, position: Position },

    #[error("syntax error in {} at {position}: {message}", .context.describe())]
    Syntax {
        message: String,
        position: Position,
        context: SyntaxContext,
    },

    #[error("evaluation error at {position}: {message}")]
    Evaluation { message: String, position: Position },

    #[error("type error at {position}: {message}")]
    Type { message: String, position: Position },

    #[error("unknown variable '{name}' at {position}")]
    UnknownVariable { name: String, position: Position },

    #[error("unknown function '{name}' at {position}")]
    UnknownFunction { name: String, position: Position },

    #[error("{function}() expects {expected} argument(s), got {actual} (at {position})")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
        position: Position,
    },

    #[error("invalid argument to {function}() at {position}: {message}")]
    ArgumentType {
        function: String,
        message: String,
        position: Position,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub fn lexical(message: impl Into<String>, position: Position) -> Self {
        Error::Lexical {
            message: message.into(),
            position,
        }
    }

    pub fn syntax(message: impl Into<String>, position: Position, context: SyntaxContext) -> Self {
        Error::Syntax {
            message: message.into(),
            position,
            context,
        }
    }

    pub fn evaluation(message: impl Into<String>, position: Position) -> Self {
        Error::Evaluation {
            message: message.into(),
            position,
        }
    }

    pub fn type_error(message: impl Into<String>, position: Position) -> Self {
        Error::Type {
            message: message.into(),
            position,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Stable kind tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Lexical { .. } => ErrorKind::Lexical,
            Error::Syntax { .. } => ErrorKind::Syntax,
            Error::Evaluation { .. } => ErrorKind::Evaluation,
            Error::Type { .. } => ErrorKind::Type,
            Error::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            Error::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            Error::ArgumentCount { .. } => ErrorKind::ArgumentCount,
            Error::ArgumentType { .. } => ErrorKind::ArgumentType,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Source position of the error, if it refers to one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Lexical { position, .. }
            | Error::Syntax { position, .. }
            | Error::Evaluation { position, .. }
            | Error::Type { position, .. }
            | Error::UnknownVariable { position, .. }
            | Error::UnknownFunction { position, .. }
            | Error::ArgumentCount { position, .. }
            | Error::ArgumentType { position, .. } => Some(*position),
            Error::Configuration { .. } => None,
        }
    }

    /// Render the error together with the offending line of the source
    /// expression and a caret marking the column.
    pub fn render(&self, source: &str) -> String {
        let Some(position) = self.position() else {
            return self.to_string();
        };
        let Some(line) = source.lines().nth(position.line.saturating_sub(1)) else {
            return self.to_string();
        };
        let caret = " ".repeat(position.column.saturating_sub(1));
        format!("{self}\n  {line}\n  {caret}^")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        let err = Error::lexical("bad character", Position::new(1, 3, 2));
        assert_eq!(err.kind(), ErrorKind::Lexical);
        assert_eq!(err.position(), Some(Position::new(1, 3, 2)));

        let err = Error::configuration("duplicate function");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_render_marks_column() {
        let err = Error::syntax(
            "unexpected token",
            Position::new(1, 5, 4),
            SyntaxContext::Expression,
        );
        let rendered = err.render("1 + + 2");
        assert!(rendered.contains("1 + + 2"));
        assert!(rendered.ends_with("    ^"));
    }
}
