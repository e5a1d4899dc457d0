//! FHIRPath lexer - tokenizes input strings
//!
//! Converts FHIRPath expression strings into a stream of tokens. The lexer is
//! deterministic and context-free: keyword classification is by lexeme lookup
//! in a static table, never by consulting the operation registry.

use crate::error::{Error, Result};
use crate::token::{Position, Token, TokenKind};
use phf::phf_map;

/// Keyword lexemes and the token kinds they map to.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "xor" => TokenKind::Xor,
    "implies" => TokenKind::Implies,
    "not" => TokenKind::Not,
    "in" => TokenKind::In,
    "contains" => TokenKind::Contains,
    "as" => TokenKind::As,
    "is" => TokenKind::Is,
    "div" => TokenKind::Div,
    "mod" => TokenKind::Mod,
    "year" => TokenKind::Unit,
    "years" => TokenKind::Unit,
    "month" => TokenKind::Unit,
    "months" => TokenKind::Unit,
    "week" => TokenKind::Unit,
    "weeks" => TokenKind::Unit,
    "day" => TokenKind::Unit,
    "days" => TokenKind::Unit,
    "hour" => TokenKind::Unit,
    "hours" => TokenKind::Unit,
    "minute" => TokenKind::Unit,
    "minutes" => TokenKind::Unit,
    "second" => TokenKind::Unit,
    "seconds" => TokenKind::Unit,
    "millisecond" => TokenKind::Unit,
    "milliseconds" => TokenKind::Unit,
};

/// Whether a lexeme is classified as a keyword rather than an identifier.
pub fn is_keyword(lexeme: &str) -> bool {
    KEYWORDS.contains_key(lexeme)
}

/// The FHIRPath lexer
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            chars,
            position: 0,
            line: 1,
            column: 1,
            current_char,
        }
    }

    /// Tokenize the whole input, failing on the first lexical error.
    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    /// Tokenize the whole input, collecting lexical errors instead of
    /// stopping. After an error the lexer skips one character and resumes,
    /// which is enough for diagnostic consumers to keep reporting.
    pub fn tokenize_with_diagnostics(input: &str) -> (Vec<Token>, Vec<Error>) {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        loop {
            match lexer.next_token() {
                Ok(token) => {
                    let is_eof = token.kind == TokenKind::Eof;
                    tokens.push(token);
                    if is_eof {
                        return (tokens, errors);
                    }
                }
                Err(err) => {
                    errors.push(err);
                    lexer.advance();
                }
            }
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip comments (both // and /* */)
    fn skip_comment(&mut self) -> Result<()> {
        if self.current_char == Some('/') && self.peek() == Some('/') {
            self.advance();
            self.advance();
            while let Some(c) = self.current_char {
                if c == '\n' {
                    self.advance();
                    break;
                }
                self.advance();
            }
            Ok(())
        } else if self.current_char == Some('/') && self.peek() == Some('*') {
            let start = self.current_position();
            self.advance();
            self.advance();
            while let Some(c) = self.current_char {
                if c == '*' && self.peek() == Some('/') {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                self.advance();
            }
            Err(Error::lexical("unterminated block comment", start))
        } else {
            Ok(())
        }
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.chars[start..self.position].iter().collect()
    }

    /// Resolve one backslash escape. The backslash has already been consumed.
    fn read_escape(&mut self, start: Position) -> Result<char> {
        let Some(escaped) = self.current_char else {
            return Err(Error::lexical("incomplete escape sequence", start));
        };

        let resolved = match escaped {
            '`' => '`',
            '\'' => '\'',
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'f' => '\x0C',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                self.advance(); // Skip 'u'
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.current_char {
                        Some(h) if h.is_ascii_hexdigit() => {
                            hex.push(h);
                            self.advance();
                        }
                        Some(_) => {
                            return Err(Error::lexical("invalid unicode escape sequence", start));
                        }
                        None => {
                            return Err(Error::lexical(
                                "incomplete unicode escape sequence",
                                start,
                            ));
                        }
                    }
                }
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| Error::lexical("invalid unicode code point", start))?;
                return char::from_u32(code)
                    .ok_or_else(|| Error::lexical("invalid unicode character", start));
            }
            other => {
                return Err(Error::lexical(
                    format!("invalid escape sequence '\\{other}'"),
                    start,
                ));
            }
        };
        self.advance();
        Ok(resolved)
    }

    /// Read a delimited identifier: `identifier`
    fn read_delimited_identifier(&mut self) -> Result<String> {
        let start = self.current_position();
        self.advance(); // Skip opening backtick

        let mut value = String::new();
        while let Some(c) = self.current_char {
            match c {
                '`' => {
                    self.advance();
                    return Ok(value);
                }
                '\\' => {
                    self.advance();
                    value.push(self.read_escape(start)?);
                }
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Err(Error::lexical("unterminated delimited identifier", start))
    }

    /// Read a string literal: 'string'
    fn read_string(&mut self) -> Result<String> {
        let start = self.current_position();
        self.advance(); // Skip opening quote

        let mut value = String::new();
        while let Some(c) = self.current_char {
            match c {
                '\'' => {
                    self.advance();
                    return Ok(value);
                }
                '\\' => {
                    self.advance();
                    value.push(self.read_escape(start)?);
                }
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Err(Error::lexical("unterminated string literal", start))
    }

    /// Read a number: `[0-9]+` or `[0-9]+.[0-9]+`
    fn read_number(&mut self) -> String {
        let start = self.position;
        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Only consume the dot when digits follow; otherwise it belongs to
        // the next token (method call on a literal).
        if self.current_char == Some('.') && self.peek().map(|c| c.is_ascii_digit()) == Some(true) {
            self.advance();
            while let Some(c) = self.current_char {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        self.chars[start..self.position].iter().collect()
    }

    fn read_digits(&mut self, count: usize, what: &str, start: Position) -> Result<String> {
        let mut out = String::new();
        for _ in 0..count {
            match self.current_char {
                Some(c) if c.is_ascii_digit() => {
                    out.push(c);
                    self.advance();
                }
                _ => {
                    return Err(Error::lexical(
                        format!("invalid date/time literal: expected {what}"),
                        start,
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Read a date/time literal after `@`.
    fn read_date_time(&mut self) -> Result<(String, TokenKind)> {
        let start = self.current_position();
        self.advance(); // Skip '@'

        if self.current_char == Some('T') {
            // Time literal: @T...
            self.advance();
            return self
                .read_time_format(start)
                .map(|s| (s, TokenKind::Time));
        }

        let date_str = self.read_date_format(start)?;

        if self.current_char == Some('T') {
            self.advance();
            if self.current_char.map(|c| c.is_ascii_digit()) == Some(true) {
                let time_str = self.read_time_format(start)?;
                let tz_str = if matches!(self.current_char, Some('Z') | Some('+') | Some('-')) {
                    self.read_timezone_offset(start)?
                } else {
                    String::new()
                };
                Ok((format!("{date_str}T{time_str}{tz_str}"), TokenKind::DateTime))
            } else {
                // Partial datetime: date with a bare trailing T (@2015T)
                Ok((format!("{date_str}T"), TokenKind::DateTime))
            }
        } else {
            Ok((date_str, TokenKind::Date))
        }
    }

    /// Read date format: YYYY(-MM(-DD)?)?
    fn read_date_format(&mut self, start: Position) -> Result<String> {
        let mut value = self.read_digits(4, "4-digit year", start)?;

        if self.current_char == Some('-') {
            value.push('-');
            self.advance();
            value.push_str(&self.read_digits(2, "2-digit month", start)?);

            if self.current_char == Some('-') {
                value.push('-');
                self.advance();
                value.push_str(&self.read_digits(2, "2-digit day", start)?);
            }
        }

        Ok(value)
    }

    /// Read time format: HH(:MM(:SS(.sss)?)?)?
    fn read_time_format(&mut self, start: Position) -> Result<String> {
        let mut value = self.read_digits(2, "2-digit hour", start)?;

        if self.current_char == Some(':') {
            value.push(':');
            self.advance();
            value.push_str(&self.read_digits(2, "2-digit minute", start)?);

            if self.current_char == Some(':') {
                value.push(':');
                self.advance();
                value.push_str(&self.read_digits(2, "2-digit second", start)?);

                // Fractional seconds only when digits follow the dot;
                // otherwise the dot starts a method call (@T14:34:28.is()).
                if self.current_char == Some('.')
                    && self.peek().map(|c| c.is_ascii_digit()) == Some(true)
                {
                    value.push('.');
                    self.advance();
                    while let Some(c) = self.current_char {
                        if c.is_ascii_digit() {
                            value.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        Ok(value)
    }

    /// Read timezone offset: Z or +/-HH:MM
    fn read_timezone_offset(&mut self, start: Position) -> Result<String> {
        let mut value = String::new();

        if self.current_char == Some('Z') {
            value.push('Z');
            self.advance();
            return Ok(value);
        }

        if let Some(sign @ ('+' | '-')) = self.current_char {
            value.push(sign);
            self.advance();
            value.push_str(&self.read_digits(2, "2-digit timezone hour", start)?);

            if self.current_char != Some(':') {
                return Err(Error::lexical(
                    "invalid timezone offset: expected ':' and 2-digit minute",
                    start,
                ));
            }
            value.push(':');
            self.advance();
            value.push_str(&self.read_digits(2, "2-digit timezone minute", start)?);
        }

        Ok(value)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        // A byte order mark is not part of the source language.
        if self.position == 0 && self.current_char == Some('\u{feff}') {
            return Err(Error::lexical(
                "unexpected byte order mark",
                self.current_position(),
            ));
        }

        // Skip whitespace and comments
        loop {
            self.skip_whitespace();
            if self.current_char == Some('/')
                && matches!(self.peek(), Some('/') | Some('*'))
            {
                self.skip_comment()?;
            } else {
                break;
            }
        }

        let position = self.current_position();

        let Some(c) = self.current_char else {
            return Ok(Token::eof(position));
        };

        match c {
            '.' => {
                self.advance();
                Ok(Token::new(TokenKind::Dot, ".", position))
            }
            '[' => {
                self.advance();
                Ok(Token::new(TokenKind::LBracket, "[", position))
            }
            ']' => {
                self.advance();
                Ok(Token::new(TokenKind::RBracket, "]", position))
            }
            '(' => {
                self.advance();
                Ok(Token::new(TokenKind::LParen, "(", position))
            }
            ')' => {
                self.advance();
                Ok(Token::new(TokenKind::RParen, ")", position))
            }
            '{' => {
                // `{}` with nothing between the braces is the null literal.
                if self.peek() == Some('}') {
                    self.advance();
                    self.advance();
                    Ok(Token::new(TokenKind::Null, "{}", position))
                } else {
                    self.advance();
                    Ok(Token::new(TokenKind::LBrace, "{", position))
                }
            }
            '}' => {
                self.advance();
                Ok(Token::new(TokenKind::RBrace, "}", position))
            }
            ',' => {
                self.advance();
                Ok(Token::new(TokenKind::Comma, ",", position))
            }
            '%' => {
                self.advance();
                // Environment variable: %identifier, %`delimited` or %'string'
                let name = if self.current_char == Some('\'') {
                    self.read_string()?
                } else if self.current_char == Some('`') {
                    self.read_delimited_identifier()?
                } else {
                    let ident = self.read_identifier();
                    if ident.is_empty() {
                        return Err(Error::lexical("expected variable name after '%'", position));
                    }
                    ident
                };
                Ok(Token::new(TokenKind::EnvVar, name, position))
            }
            '@' => {
                let (value, kind) = self.read_date_time()?;
                Ok(Token::new(kind, value, position))
            }
            '\'' => {
                let value = self.read_string()?;
                Ok(Token::new(TokenKind::String, value, position))
            }
            '`' => {
                let value = self.read_delimited_identifier()?;
                Ok(Token::new(TokenKind::DelimitedIdentifier, value, position))
            }
            '+' => {
                self.advance();
                Ok(Token::new(TokenKind::Plus, "+", position))
            }
            '-' => {
                self.advance();
                Ok(Token::new(TokenKind::Minus, "-", position))
            }
            '*' => {
                self.advance();
                Ok(Token::new(TokenKind::Star, "*", position))
            }
            '/' => {
                self.advance();
                Ok(Token::new(TokenKind::Slash, "/", position))
            }
            '&' => {
                self.advance();
                Ok(Token::new(TokenKind::Concat, "&", position))
            }
            '|' => {
                self.advance();
                Ok(Token::new(TokenKind::Pipe, "|", position))
            }
            '=' => {
                self.advance();
                Ok(Token::new(TokenKind::Eq, "=", position))
            }
            '~' => {
                self.advance();
                Ok(Token::new(TokenKind::Equiv, "~", position))
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Le, "<=", position))
                } else {
                    Ok(Token::new(TokenKind::Lt, "<", position))
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Ge, ">=", position))
                } else {
                    Ok(Token::new(TokenKind::Gt, ">", position))
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Ok(Token::new(TokenKind::Ne, "!=", position))
                } else if self.current_char == Some('~') {
                    self.advance();
                    Ok(Token::new(TokenKind::NEquiv, "!~", position))
                } else {
                    Err(Error::lexical("unexpected '!' character", position))
                }
            }
            '$' => {
                self.advance();
                let ident = self.read_identifier();
                match ident.as_str() {
                    "this" => Ok(Token::new(TokenKind::This, "$this", position)),
                    "index" => Ok(Token::new(TokenKind::Index, "$index", position)),
                    "total" => Ok(Token::new(TokenKind::Total, "$total", position)),
                    _ => Err(Error::lexical(
                        format!("unknown variable: ${ident}"),
                        position,
                    )),
                }
            }
            _ => {
                if c.is_ascii_digit() {
                    let value = self.read_number();
                    Ok(Token::new(TokenKind::Number, value, position))
                } else if c.is_alphabetic() || c == '_' {
                    let ident = self.read_identifier();
                    let kind = KEYWORDS
                        .get(ident.as_str())
                        .copied()
                        .unwrap_or(TokenKind::Identifier);
                    Ok(Token::new(kind, ident, position))
                } else {
                    Err(Error::lexical(
                        format!("unexpected character: {c}"),
                        position,
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::tokenize(input).unwrap()
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers() {
        let tokens = tokenize("Patient name _test");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "Patient");
        assert_eq!(tokens[1].lexeme, "name");
        assert_eq!(tokens[2].lexeme, "_test");
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize("'hello' 'wor\\'ld'");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "hello");
        assert_eq!(tokens[1].lexeme, "wor'ld");
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize("'a\\nb' '\\u0041'");
        assert_eq!(tokens[0].lexeme, "a\nb");
        assert_eq!(tokens[1].lexeme, "A");
    }

    #[test]
    fn test_invalid_escape_fails() {
        let err = Lexer::tokenize("'bad\\q'").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical);
        let err = Lexer::tokenize("'bad\\u00G1'").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("123 45.67 007");
        assert_eq!(tokens[0].lexeme, "123");
        assert_eq!(tokens[1].lexeme, "45.67");
        assert_eq!(tokens[2].lexeme, "007");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_number_dot_method_call() {
        // The dot belongs to the invocation, not the number.
        assert_eq!(
            kinds("1.empty()"),
            vec![
                TokenKind::Number,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ - * / = != ~ !~ < <= > >= & |"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Equiv,
                TokenKind::NEquiv,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Concat,
                TokenKind::Pipe,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("and or xor implies div mod in contains as is not true false"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Xor,
                TokenKind::Implies,
                TokenKind::Div,
                TokenKind::Mod,
                TokenKind::In,
                TokenKind::Contains,
                TokenKind::As,
                TokenKind::Is,
                TokenKind::Not,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_time_unit_keywords() {
        assert_eq!(
            kinds("4 days"),
            vec![TokenKind::Number, TokenKind::Unit, TokenKind::Eof]
        );
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            kinds("$this $index $total"),
            vec![
                TokenKind::This,
                TokenKind::Index,
                TokenKind::Total,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_invalid_special_variable() {
        let err = Lexer::tokenize("$foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical);
    }

    #[test]
    fn test_environment_variables() {
        let tokens = tokenize("%resource %'vs-name' %`delimited`");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::EnvVar));
        assert_eq!(tokens[0].lexeme, "resource");
        assert_eq!(tokens[1].lexeme, "vs-name");
        assert_eq!(tokens[2].lexeme, "delimited");
    }

    #[test]
    fn test_null_literal() {
        assert_eq!(kinds("{}"), vec![TokenKind::Null, TokenKind::Eof]);
        // A spaced brace pair is not the null literal token.
        assert_eq!(
            kinds("{ }"),
            vec![TokenKind::LBrace, TokenKind::RBrace, TokenKind::Eof]
        );
    }

    #[test]
    fn test_date_literals() {
        let tokens = tokenize("@2024 @2024-03 @2024-03-15");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Date));
        assert_eq!(tokens[0].lexeme, "2024");
        assert_eq!(tokens[2].lexeme, "2024-03-15");
    }

    #[test]
    fn test_datetime_literals() {
        let tokens = tokenize("@2024-01-01T10:30:00Z @2015T @2024-01-01T10:30:00+02:00");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::DateTime));
        assert_eq!(tokens[0].lexeme, "2024-01-01T10:30:00Z");
        assert_eq!(tokens[1].lexeme, "2015T");
        assert_eq!(tokens[2].lexeme, "2024-01-01T10:30:00+02:00");
    }

    #[test]
    fn test_time_literals() {
        let tokens = tokenize("@T14 @T14:30 @T14:30:14.559");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Time));
        assert_eq!(tokens[2].lexeme, "14:30:14.559");
    }

    #[test]
    fn test_invalid_date_shape_fails() {
        assert!(Lexer::tokenize("@20").is_err());
        assert!(Lexer::tokenize("@2024-1").is_err());
        assert!(Lexer::tokenize("@2024-01-01T10:3").is_err());
        assert!(Lexer::tokenize("@2024-01-01T10:30:00+02").is_err());
    }

    #[test]
    fn test_bare_bang_fails() {
        let err = Lexer::tokenize("a ! b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical);
    }

    #[test]
    fn test_bom_fails() {
        let err = Lexer::tokenize("\u{feff}Patient").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lexical);
    }

    #[test]
    fn test_comments_are_trivia() {
        let tokens = tokenize("Patient // comment\n.name /* block */ .given");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a +\n  b");
        assert_eq!(tokens[0].position, Position::new(1, 1, 0));
        assert_eq!(tokens[1].position, Position::new(1, 3, 2));
        assert_eq!(tokens[2].position, Position::new(2, 3, 6));
    }

    #[test]
    fn test_tokenize_with_diagnostics_recovers() {
        let (tokens, errors) = Lexer::tokenize_with_diagnostics("a # b");
        assert_eq!(errors.len(), 1);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }
}
