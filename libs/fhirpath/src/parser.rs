//! FHIRPath parser - converts token streams to AST
//!
//! A single Pratt loop drives all infix and postfix operators; precedence and
//! associativity come from the operation registry, so registering a new
//! operator needs no parser changes. Primaries are parsed by recursive
//! descent.
//!
//! Two contracts are exposed: `parse()` stops at the first error
//! (production), `parse_with_diagnostics()` accumulates errors and recovers
//! at the sync tokens `,` `)` `]` `}` and end of input (LSP hosts).

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::{Expr, LiteralValue, TypeSpecifier, VariableKind};
use crate::error::{Error, Result, SyntaxContext};
use crate::lexer::Lexer;
use crate::registry::Registry;
use crate::token::{Position, Token, TokenKind};
use crate::{temporal, value::Value};

const MAX_RECURSION_DEPTH: usize = 200;

/// Token kinds that may act as a name in invocation position. Operator
/// keywords double as function names (`.contains(...)`, `.not()`), and
/// calendar-unit keywords are ordinary property names outside quantity
/// literals.
const NAME_KINDS: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::DelimitedIdentifier,
    TokenKind::Unit,
    TokenKind::Contains,
    TokenKind::In,
    TokenKind::As,
    TokenKind::Is,
    TokenKind::Not,
    TokenKind::Div,
    TokenKind::Mod,
];

/// Parser for FHIRPath expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'static Registry,
    recursion_depth: usize,
}

impl Parser {
    /// Create a parser over a fully lexed input, failing on the first
    /// lexical error.
    pub fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: Lexer::tokenize(input)?,
            pos: 0,
            registry: Registry::global(),
            recursion_depth: 0,
        })
    }

    /// Parse a complete expression, stopping at the first error.
    pub fn parse(input: &str) -> Result<Expr> {
        let mut parser = Self::new(input)?;
        let expr = parser.parse_expression(0)?;
        if parser.current().kind != TokenKind::Eof {
            let token = parser.current();
            return Err(Error::syntax(
                format!("unexpected token '{}' after expression", token.lexeme),
                token.position,
                SyntaxContext::Expression,
            ));
        }
        Ok(expr)
    }

    /// Parse with best-effort recovery, collecting every diagnostic. Returns
    /// the last complete expression, if any.
    pub fn parse_with_diagnostics(input: &str) -> (Option<Expr>, Vec<Error>) {
        let (tokens, mut diagnostics) = Lexer::tokenize_with_diagnostics(input);
        let mut parser = Self {
            tokens,
            pos: 0,
            registry: Registry::global(),
            recursion_depth: 0,
        };

        let mut expr = None;
        while parser.current().kind != TokenKind::Eof {
            let before = parser.pos;
            match parser.parse_expression(0) {
                Ok(parsed) => {
                    expr = Some(parsed);
                    if parser.current().kind == TokenKind::Eof {
                        break;
                    }
                    let token = parser.current();
                    diagnostics.push(Error::syntax(
                        format!("unexpected token '{}' after expression", token.lexeme),
                        token.position,
                        SyntaxContext::Expression,
                    ));
                    parser.synchronize(before);
                }
                Err(err) => {
                    diagnostics.push(err);
                    parser.recursion_depth = 0;
                    parser.synchronize(before);
                }
            }
        }
        (expr, diagnostics)
    }

    /// Advance to the next sync token, consume it, and guarantee progress.
    fn synchronize(&mut self, before: usize) {
        if self.pos == before {
            self.pos += 1;
        }
        while !matches!(
            self.current().kind,
            TokenKind::Comma
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Eof
        ) {
            self.pos += 1;
        }
        if self.current().kind != TokenKind::Eof {
            self.pos += 1;
        }
    }

    fn current(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, context: SyntaxContext) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.current();
            Err(Error::syntax(
                format!("expected {kind:?}, got '{}'", token.lexeme),
                token.position,
                context,
            ))
        }
    }

    fn enter_recursion(&mut self, position: Position) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::syntax(
                format!("expression too deeply nested (max depth: {MAX_RECURSION_DEPTH})"),
                position,
                SyntaxContext::Expression,
            ));
        }
        Ok(())
    }

    /// Pratt loop: parse a unary/primary expression, then fold in every
    /// infix or postfix operator whose precedence admits it. Left-associative
    /// operators parse their right side at `precedence + 1`, right-associative
    /// ones at `precedence`.
    fn parse_expression(&mut self, min_precedence: u8) -> Result<Expr> {
        self.enter_recursion(self.current().position)?;
        let result = self.parse_expression_inner(min_precedence);
        self.recursion_depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let token = self.current().clone();
            let Some(op) = self.registry.infix(token.kind) else {
                break;
            };
            if op.precedence < min_precedence {
                break;
            }

            match token.kind {
                TokenKind::Dot => {
                    self.advance();
                    let invocation = self.parse_invocation()?;
                    left = Expr::Binary {
                        op: TokenKind::Dot,
                        left: Box::new(left),
                        right: Box::new(invocation),
                        position: token.position,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression(0)?;
                    self.expect(TokenKind::RBracket, SyntaxContext::Index)?;
                    left = Expr::Index {
                        expression: Box::new(left),
                        index: Box::new(index),
                        position: token.position,
                    };
                }
                TokenKind::Is => {
                    self.advance();
                    let type_name = self.parse_type_specifier(SyntaxContext::MembershipTest)?;
                    left = Expr::MembershipTest {
                        expression: Box::new(left),
                        type_name,
                        position: token.position,
                    };
                }
                TokenKind::As => {
                    self.advance();
                    let type_name = self.parse_type_specifier(SyntaxContext::TypeCast)?;
                    left = Expr::TypeCast {
                        expression: Box::new(left),
                        type_name,
                        position: token.position,
                    };
                }
                TokenKind::Pipe => {
                    self.advance();
                    let right = self.parse_expression(op.precedence + 1)?;
                    // Consecutive unions collapse into one n-ary node.
                    left = match left {
                        Expr::Union {
                            mut operands,
                            position,
                        } => {
                            operands.push(right);
                            Expr::Union { operands, position }
                        }
                        other => Expr::Union {
                            operands: vec![other, right],
                            position: token.position,
                        },
                    };
                }
                _ => {
                    self.advance();
                    let next_min = match op.associativity {
                        crate::registry::Associativity::Left => op.precedence + 1,
                        crate::registry::Associativity::Right => op.precedence,
                    };
                    let right = self.parse_binary_rhs(next_min, &token)?;
                    left = Expr::Binary {
                        op: token.kind,
                        left: Box::new(left),
                        right: Box::new(right),
                        position: token.position,
                    };
                }
            }
        }

        Ok(left)
    }

    fn parse_binary_rhs(&mut self, min_precedence: u8, op_token: &Token) -> Result<Expr> {
        self.parse_expression(min_precedence).map_err(|err| {
            // Tag "missing right operand" errors with the operator site.
            if self.current().kind == TokenKind::Eof {
                Error::syntax(
                    format!("expression expected after '{}'", op_token.lexeme),
                    op_token.position,
                    SyntaxContext::BinaryRhs,
                )
            } else {
                err
            }
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        if let Some(op) = self.registry.prefix(token.kind) {
            self.advance();
            let operand = self.parse_expression(op.precedence)?;
            return Ok(Expr::Unary {
                op: token.kind,
                operand: Box::new(operand),
                position: token.position,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                // Quantity literal: number followed by a unit string or a
                // calendar-duration keyword, recognized by the registry.
                if let Some(parsed) = self.registry.match_literal(&token, self.current()) {
                    let value = parsed?;
                    self.advance();
                    return Ok(Expr::Literal {
                        value,
                        position: token.position,
                    });
                }
                let value = parse_number_literal(&token)?;
                Ok(Expr::Literal {
                    value,
                    position: token.position,
                })
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::String(token.lexeme),
                    position: token.position,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::Boolean(token.kind == TokenKind::True),
                    position: token.position,
                })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal {
                    value: LiteralValue::Null,
                    position: token.position,
                })
            }
            TokenKind::Date | TokenKind::DateTime | TokenKind::Time => {
                self.advance();
                let value = parse_temporal_literal(&token)?;
                Ok(Expr::Literal {
                    value,
                    position: token.position,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(TokenKind::RParen, SyntaxContext::Expression)?;
                Ok(expr)
            }
            TokenKind::LBrace => self.parse_collection_literal(),
            TokenKind::This => {
                self.advance();
                Ok(Expr::Variable {
                    kind: VariableKind::This,
                    name: "this".into(),
                    position: token.position,
                })
            }
            TokenKind::Index => {
                self.advance();
                Ok(Expr::Variable {
                    kind: VariableKind::Index,
                    name: "index".into(),
                    position: token.position,
                })
            }
            TokenKind::Total => {
                self.advance();
                Ok(Expr::Variable {
                    kind: VariableKind::Total,
                    name: "total".into(),
                    position: token.position,
                })
            }
            TokenKind::EnvVar => {
                self.advance();
                Ok(Expr::Variable {
                    kind: VariableKind::Environment,
                    name: token.lexeme,
                    position: token.position,
                })
            }
            kind if NAME_KINDS.contains(&kind) => self.parse_name_primary(),
            _ => Err(Error::syntax(
                format!("expected expression, got '{}'", describe_token(&token)),
                token.position,
                SyntaxContext::Expression,
            )),
        }
    }

    /// An identifier in primary position: function call, qualified type
    /// reference, type-or-identifier, or plain identifier.
    fn parse_name_primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        let name = token.lexeme;

        if self.check(TokenKind::LParen) {
            let args = self.parse_function_args()?;
            return Ok(Expr::Function {
                name,
                args,
                position: token.position,
            });
        }

        // `System.X` / `FHIR.X` name types, never properties.
        if (name == "System" || name == "FHIR") && self.check(TokenKind::Dot) {
            if let Some(next) = self.peek_next() {
                if next.kind == TokenKind::Identifier {
                    self.advance(); // '.'
                    let type_token = self.advance();
                    return Ok(Expr::TypeReference {
                        type_name: TypeSpecifier::qualified(name, type_token.lexeme),
                        position: token.position,
                    });
                }
            }
        }

        let capitalized = name.chars().next().map(char::is_uppercase).unwrap_or(false);
        if capitalized {
            Ok(Expr::TypeOrIdentifier {
                name,
                position: token.position,
            })
        } else {
            Ok(Expr::Identifier {
                name,
                position: token.position,
            })
        }
    }

    /// The invocation after a dot: identifier, function call, or special
    /// variable. A second dot (or anything else) is a syntax error.
    fn parse_invocation(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::This | TokenKind::Index | TokenKind::Total => {
                self.advance();
                let (kind, name) = match token.kind {
                    TokenKind::This => (VariableKind::This, "this"),
                    TokenKind::Index => (VariableKind::Index, "index"),
                    _ => (VariableKind::Total, "total"),
                };
                Ok(Expr::Variable {
                    kind,
                    name: name.into(),
                    position: token.position,
                })
            }
            kind if NAME_KINDS.contains(&kind) => {
                self.advance();
                if self.check(TokenKind::LParen) {
                    let args = self.parse_function_args()?;
                    Ok(Expr::Function {
                        name: token.lexeme,
                        args,
                        position: token.position,
                    })
                } else {
                    Ok(Expr::Identifier {
                        name: token.lexeme,
                        position: token.position,
                    })
                }
            }
            _ => Err(Error::syntax(
                format!("expected identifier after '.', got '{}'", describe_token(&token)),
                token.position,
                SyntaxContext::Expression,
            )),
        }
    }

    /// Argument list after a function name. Trailing commas are forbidden:
    /// after a comma another expression is required.
    fn parse_function_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LParen, SyntaxContext::FunctionCall)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression(0)?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, SyntaxContext::FunctionCall)?;
        Ok(args)
    }

    /// Collection literal `{e1, e2, ...}`. The empty pair `{}` is a single
    /// Null token and never reaches this method; a spaced `{ }` denotes an
    /// empty collection.
    fn parse_collection_literal(&mut self) -> Result<Expr> {
        let open = self.expect(TokenKind::LBrace, SyntaxContext::Collection)?;
        let mut elements = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                elements.push(self.parse_expression(0)?);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace, SyntaxContext::Collection)?;
        Ok(Expr::Collection {
            elements,
            position: open.position,
        })
    }

    /// Type specifier after `is`/`as`: an identifier, possibly dotted
    /// (`FHIR.Patient`).
    fn parse_type_specifier(&mut self, context: SyntaxContext) -> Result<TypeSpecifier> {
        let mut parts = Vec::new();
        let first = self.expect_name(context)?;
        parts.push(first.lexeme);

        while self.check(TokenKind::Dot) {
            self.advance();
            let part = self.expect_name(context)?;
            parts.push(part.lexeme);
        }

        let name = parts.pop().unwrap();
        let qualifier = if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        };
        Ok(TypeSpecifier { qualifier, name })
    }

    fn expect_name(&mut self, context: SyntaxContext) -> Result<Token> {
        let token = self.current().clone();
        if matches!(
            token.kind,
            TokenKind::Identifier | TokenKind::DelimitedIdentifier
        ) {
            Ok(self.advance())
        } else {
            Err(Error::syntax(
                format!("expected type name, got '{}'", describe_token(&token)),
                token.position,
                context,
            ))
        }
    }
}

fn describe_token(token: &Token) -> String {
    if token.kind == TokenKind::Eof {
        "end of input".to_string()
    } else {
        token.lexeme.clone()
    }
}

fn parse_number_literal(token: &Token) -> Result<LiteralValue> {
    let text = &token.lexeme;
    if text.contains('.') {
        let value = Decimal::from_str(text).map_err(|e| {
            Error::syntax(
                format!("invalid number '{text}': {e}"),
                token.position,
                SyntaxContext::Expression,
            )
        })?;
        Ok(LiteralValue::Decimal(value))
    } else {
        let value = i64::from_str(text).map_err(|e| {
            Error::syntax(
                format!("invalid integer '{text}': {e}"),
                token.position,
                SyntaxContext::Expression,
            )
        })?;
        Ok(LiteralValue::Integer(value))
    }
}

/// Convert a date/datetime/time token (already shape-checked by the lexer)
/// into a literal; out-of-range components fail here.
fn parse_temporal_literal(token: &Token) -> Result<LiteralValue> {
    let invalid = || {
        Error::syntax(
            format!("invalid date/time literal '@{}'", token.lexeme),
            token.position,
            SyntaxContext::Expression,
        )
    };
    match token.kind {
        TokenKind::Date => match temporal::parse_date_value(&token.lexeme) {
            Some(Value::Date { value, precision }) => Ok(LiteralValue::Date(value, precision)),
            _ => Err(invalid()),
        },
        TokenKind::DateTime => match temporal::parse_datetime_value(&token.lexeme) {
            Some(Value::DateTime {
                value,
                precision,
                timezone_offset,
            }) => Ok(LiteralValue::DateTime(value, precision, timezone_offset)),
            _ => Err(invalid()),
        },
        TokenKind::Time => match temporal::parse_time_value(&token.lexeme) {
            Some(Value::Time { value, precision }) => Ok(LiteralValue::Time(value, precision)),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}
