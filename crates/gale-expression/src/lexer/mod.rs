//! Lexer for the `${{ … }}` expression sub-language.
//!
//! The lexer scans left to right, skipping ASCII whitespace between
//! tokens. It never fails: illegal characters and illegal token sequences
//! come back as [`TokenKind::Unexpected`] tokens, and the parser promotes
//! the first of those into a fatal error carrying the source index.
//!
//! Two pieces of state disambiguate the grammar. The previous token
//! decides whether `(` opens a group or a parameter list, whether `.`
//! starts a number or dereferences a property, and whether an identifier
//! is a property name. A stack of unclosed openers decides whether `)`
//! closes a group or a parameter list.

use crate::core::token::{Token, TokenKind};
use gale_value::Value;

/// Characters that terminate a numeric literal (besides whitespace).
const NUMBER_BOUNDARY: &[u8] = b"()[],.!><=&|";

/// Characters that terminate an identifier (besides whitespace).
const KEYWORD_BOUNDARY: &[u8] = b"()[],.!><=&|*";

/// Token kinds that may legally precede an operand or prefix operator.
const BEFORE_OPERAND: &[TokenKind] = &[
    TokenKind::Separator,
    TokenKind::StartGroup,
    TokenKind::StartParameters,
    TokenKind::StartIndex,
    TokenKind::LogicalOperator,
];

/// Token kinds that produce a value, i.e. may legally precede a binary
/// operator, separator, or closer.
const AFTER_VALUE: &[TokenKind] = &[
    TokenKind::EndGroup,
    TokenKind::EndParameters,
    TokenKind::EndIndex,
    TokenKind::Wildcard,
    TokenKind::Null,
    TokenKind::Boolean,
    TokenKind::Number,
    TokenKind::String,
    TokenKind::PropertyName,
    TokenKind::NamedValue,
];

/// Lexer for tokenizing expression strings
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    last: Option<TokenKind>,
    stack: Vec<TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given expression
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            last: None,
            stack: Vec::new(),
        }
    }

    /// The stack of unclosed group, index, and parameter openers
    pub fn unclosed(&self) -> &[TokenKind] {
        &self.stack
    }

    /// Tokenize the remaining input
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    /// Get the next token, or `None` when the input is exhausted
    pub fn next_token(&mut self) -> Option<Token> {
        while self
            .current()
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.position += 1;
        }
        let start = self.position;
        let ch = self.current()?;

        let token = match ch {
            b'(' => {
                self.position += 1;
                if self.last == Some(TokenKind::Function) {
                    self.create_token(TokenKind::StartParameters, "(", start)
                } else {
                    self.create_token(TokenKind::StartGroup, "(", start)
                }
            }
            b'[' => {
                self.position += 1;
                self.create_token(TokenKind::StartIndex, "[", start)
            }
            b')' => {
                self.position += 1;
                if self.stack.last() == Some(&TokenKind::StartParameters) {
                    self.create_token(TokenKind::EndParameters, ")", start)
                } else {
                    self.create_token(TokenKind::EndGroup, ")", start)
                }
            }
            b']' => {
                self.position += 1;
                self.create_token(TokenKind::EndIndex, "]", start)
            }
            b',' => {
                self.position += 1;
                self.create_token(TokenKind::Separator, ",", start)
            }
            b'*' => {
                self.position += 1;
                self.create_token(TokenKind::Wildcard, "*", start)
            }
            b'\'' => self.read_string(start),
            b'!' | b'>' | b'<' | b'=' | b'&' | b'|' => self.read_operator(start),
            b'.' => {
                // A period starts a number only in operand position.
                let number_position = match self.last {
                    None => true,
                    Some(kind) => BEFORE_OPERAND.contains(&kind),
                };
                if number_position {
                    self.read_number(start)
                } else {
                    self.position += 1;
                    self.create_token(TokenKind::Dereference, ".", start)
                }
            }
            b'-' | b'+' => self.read_number(start),
            b if b.is_ascii_digit() => self.read_number(start),
            _ => self.read_keyword(start),
        };

        Some(token)
    }

    fn current(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    /// Create a token, verifying the token-order legality table and
    /// maintaining the opener stack.
    fn create_token(&mut self, kind: TokenKind, raw: &str, start: usize) -> Token {
        self.create_token_with(kind, raw, start, None)
    }

    fn create_token_with(
        &mut self,
        kind: TokenKind,
        raw: &str,
        start: usize,
        value: Option<Value>,
    ) -> Token {
        if !self.check_last(kind, raw) {
            return Token::new(TokenKind::Unexpected, raw, start);
        }
        self.last = Some(kind);
        match kind {
            TokenKind::StartGroup | TokenKind::StartIndex | TokenKind::StartParameters => {
                self.stack.push(kind);
            }
            TokenKind::EndGroup | TokenKind::EndIndex | TokenKind::EndParameters => {
                self.stack.pop();
            }
            _ => {}
        }
        Token {
            kind,
            raw: raw.to_string(),
            value,
            index: start,
        }
    }

    /// Verify that `kind` may legally follow the previous token.
    fn check_last(&self, kind: TokenKind, raw: &str) -> bool {
        let follows = |allowed: &[TokenKind]| match self.last {
            Some(last) => allowed.contains(&last),
            None => false,
        };
        let first_or = |allowed: &[TokenKind]| self.last.is_none() || follows(allowed);

        match kind {
            TokenKind::StartGroup => first_or(BEFORE_OPERAND),
            TokenKind::StartIndex => follows(&[
                TokenKind::EndGroup,
                TokenKind::EndParameters,
                TokenKind::EndIndex,
                TokenKind::Wildcard,
                TokenKind::PropertyName,
                TokenKind::NamedValue,
            ]),
            TokenKind::StartParameters => follows(&[TokenKind::Function]),
            TokenKind::EndGroup | TokenKind::EndIndex | TokenKind::Separator => {
                follows(AFTER_VALUE)
            }
            TokenKind::EndParameters => {
                follows(&[TokenKind::StartParameters]) || follows(AFTER_VALUE)
            }
            TokenKind::Wildcard => follows(&[TokenKind::StartIndex, TokenKind::Dereference]),
            TokenKind::Dereference => follows(&[
                TokenKind::EndGroup,
                TokenKind::EndParameters,
                TokenKind::EndIndex,
                TokenKind::Wildcard,
                TokenKind::PropertyName,
                TokenKind::NamedValue,
            ]),
            TokenKind::LogicalOperator => {
                if raw == "!" {
                    first_or(BEFORE_OPERAND)
                } else {
                    follows(AFTER_VALUE)
                }
            }
            TokenKind::Null | TokenKind::Boolean | TokenKind::Number | TokenKind::String => {
                first_or(BEFORE_OPERAND)
            }
            TokenKind::PropertyName => follows(&[TokenKind::Dereference]),
            TokenKind::Function | TokenKind::NamedValue => first_or(BEFORE_OPERAND),
            _ => true,
        }
    }

    fn read_number(&mut self, start: usize) -> Token {
        while let Some(b) = self.current() {
            if b.is_ascii_whitespace() || (NUMBER_BOUNDARY.contains(&b) && b != b'.') {
                break;
            }
            self.position += 1;
        }
        let raw = &self.input[start..self.position];

        if raw.len() > 2 {
            let parsed = if let Some(rest) = raw.strip_prefix("0x") {
                i64::from_str_radix(rest, 16).ok()
            } else if let Some(rest) = raw.strip_prefix("0o") {
                i64::from_str_radix(rest, 8).ok()
            } else {
                None
            };
            if let Some(i) = parsed.filter(|i| i32::try_from(*i).is_ok()) {
                return self.create_token_with(
                    TokenKind::Number,
                    raw,
                    start,
                    Some(Value::number(i as f64)),
                );
            }
        }

        // An unparsable raw keeps its text as the literal value.
        let value = match raw.parse::<f64>() {
            Ok(f) => Value::number(f),
            Err(_) => Value::string(raw),
        };
        self.create_token_with(TokenKind::Number, raw, start, Some(value))
    }

    fn read_string(&mut self, start: usize) -> Token {
        self.position += 1; // opening quote
        let mut content = Vec::new();
        let mut closed = false;
        while let Some(b) = self.current() {
            self.position += 1;
            if b == b'\'' {
                if self.current() == Some(b'\'') {
                    content.push(b'\'');
                    self.position += 1;
                    continue;
                }
                closed = true;
                break;
            }
            // The quote delimiter is ASCII, so multi-byte characters pass
            // through untouched.
            content.push(b);
        }
        let raw = &self.input[start..self.position];
        if !closed {
            return Token::new(TokenKind::Unexpected, raw, start);
        }
        let content = String::from_utf8_lossy(&content).into_owned();
        self.create_token_with(TokenKind::String, raw, start, Some(Value::String(content)))
    }

    fn read_operator(&mut self, start: usize) -> Token {
        let first = self.input.as_bytes()[start];
        self.position += 1;
        let two = match (first, self.current()) {
            (b'!', Some(b'=')) => Some("!="),
            (b'>', Some(b'=')) => Some(">="),
            (b'<', Some(b'=')) => Some("<="),
            (b'=', Some(b'=')) => Some("=="),
            (b'&', Some(b'&')) => Some("&&"),
            (b'|', Some(b'|')) => Some("||"),
            _ => None,
        };
        if let Some(two) = two {
            self.position += 1;
            return self.create_token(TokenKind::LogicalOperator, two, start);
        }
        let one = &self.input[start..start + 1];
        match first {
            b'!' | b'>' | b'<' => self.create_token(TokenKind::LogicalOperator, one, start),
            _ => Token::new(TokenKind::Unexpected, one, start),
        }
    }

    fn read_keyword(&mut self, start: usize) -> Token {
        while let Some(b) = self.current() {
            if b.is_ascii_whitespace() || KEYWORD_BOUNDARY.contains(&b) {
                break;
            }
            self.position += 1;
        }
        let raw = &self.input[start..self.position];

        if self.last == Some(TokenKind::Dereference) {
            return self.create_token(TokenKind::PropertyName, raw, start);
        }
        match raw {
            "true" => {
                return self.create_token_with(
                    TokenKind::Boolean,
                    raw,
                    start,
                    Some(Value::boolean(true)),
                );
            }
            "false" => {
                return self.create_token_with(
                    TokenKind::Boolean,
                    raw,
                    start,
                    Some(Value::boolean(false)),
                );
            }
            "null" => return self.create_token(TokenKind::Null, raw, start),
            "NaN" => {
                return self.create_token_with(
                    TokenKind::Number,
                    raw,
                    start,
                    Some(Value::number(f64::NAN)),
                );
            }
            "Infinity" => {
                return self.create_token_with(
                    TokenKind::Number,
                    raw,
                    start,
                    Some(Value::number(f64::INFINITY)),
                );
            }
            _ => {}
        }
        if self.current() == Some(b'(') {
            self.create_token(TokenKind::Function, raw, start)
        } else {
            self.create_token(TokenKind::NamedValue, raw, start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_property_chain() {
        assert_eq!(
            kinds("github.ref_name"),
            vec![
                TokenKind::NamedValue,
                TokenKind::Dereference,
                TokenKind::PropertyName,
            ]
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            kinds("contains('a', 'b')"),
            vec![
                TokenKind::Function,
                TokenKind::StartParameters,
                TokenKind::String,
                TokenKind::Separator,
                TokenKind::String,
                TokenKind::EndParameters,
            ]
        );
    }

    #[test]
    fn test_group_versus_parameters() {
        // A bare parenthesis groups; one after a function opens parameters.
        assert_eq!(
            kinds("(1)"),
            vec![TokenKind::StartGroup, TokenKind::Number, TokenKind::EndGroup]
        );
        assert_eq!(kinds("f()")[1], TokenKind::StartParameters);
        assert_eq!(kinds("f()")[2], TokenKind::EndParameters);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("1 == 2 != 3 >= 4 <= 5 > 6 < 7"),
            vec![
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
                TokenKind::LogicalOperator,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("23.5").tokenize();
        assert_eq!(tokens[0].value, Some(Value::number(23.5)));

        let tokens = Lexer::new("-42").tokenize();
        assert_eq!(tokens[0].value, Some(Value::number(-42.0)));

        let tokens = Lexer::new("0x10").tokenize();
        assert_eq!(tokens[0].value, Some(Value::number(16.0)));

        let tokens = Lexer::new("0o17").tokenize();
        assert_eq!(tokens[0].value, Some(Value::number(15.0)));
    }

    #[test]
    fn test_leading_period_number() {
        let tokens = Lexer::new(".5").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].value, Some(Value::number(0.5)));
    }

    #[test]
    fn test_special_numbers() {
        let tokens = Lexer::new("NaN").tokenize();
        assert!(matches!(tokens[0].value, Some(Value::Number(n)) if n.is_nan()));

        let tokens = Lexer::new("Infinity").tokenize();
        assert_eq!(tokens[0].value, Some(Value::number(f64::INFINITY)));

        let tokens = Lexer::new("-Infinity").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].value, Some(Value::number(f64::NEG_INFINITY)));
    }

    #[test]
    fn test_unparsable_number_keeps_raw() {
        let tokens = Lexer::new("1.2.3").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].value, Some(Value::string("1.2.3")));
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new("'It''s a test'").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, Some(Value::string("It's a test")));
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("'oops").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Unexpected);
    }

    #[test]
    fn test_booleans_and_null() {
        let tokens = Lexer::new("true").tokenize();
        assert_eq!(tokens[0].value, Some(Value::boolean(true)));
        let tokens = Lexer::new("null").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Null);
    }

    #[test]
    fn test_wildcard_after_dereference() {
        assert_eq!(
            kinds("matrix.*"),
            vec![
                TokenKind::NamedValue,
                TokenKind::Dereference,
                TokenKind::Wildcard,
            ]
        );
    }

    #[test]
    fn test_wildcard_without_dereference_is_unexpected() {
        let tokens = Lexer::new("* 2").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Unexpected);
    }

    #[test]
    fn test_illegal_sequence() {
        // Two operands in a row violate the token-order table.
        let tokens = Lexer::new("1 2").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Unexpected);
    }

    #[test]
    fn test_lone_ampersand_is_unexpected() {
        let tokens = Lexer::new("1 & 2").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Unexpected);
    }

    #[test]
    fn test_unclosed_stack() {
        let mut lexer = Lexer::new("f(a[");
        let _ = lexer.tokenize();
        assert_eq!(
            lexer.unclosed(),
            &[TokenKind::StartParameters, TokenKind::StartIndex]
        );
    }

    #[test]
    fn test_token_index() {
        let tokens = Lexer::new("a == 'b'").tokenize();
        assert_eq!(tokens[0].index, 0);
        assert_eq!(tokens[1].index, 2);
        assert_eq!(tokens[2].index, 5);
    }
}
