//! Shunting-yard parser for the expression sub-language.
//!
//! Two value-semantic stacks drive the algorithm: one for pending
//! operators and one for finished nodes. Openers (`(`, `[`, parameter
//! lists) act as hard barriers on the operator stack, and function tokens
//! record the value-stack depth at which their argument list begins.

use crate::core::ast::{BinaryOp, Expr, UnaryOp};
use crate::core::error::{ExpressionError, ExpressionResult};
use crate::core::token::{Token, TokenKind};
use crate::lexer::Lexer;
use gale_value::Value;

/// Parse an expression string into an AST
pub fn parse(expression: &str) -> ExpressionResult<Expr> {
    let mut lexer = Lexer::new(expression);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        if token.kind == TokenKind::Unexpected {
            return Err(ExpressionError::UnexpectedToken {
                raw: token.raw,
                index: token.index,
            });
        }
        tokens.push(token);
    }
    Parser::new(tokens).parse()
}

/// Operator precedence; higher binds tighter. Unknown raws (openers)
/// report zero so they act as barriers when draining.
fn precedence(raw: &str) -> u8 {
    match raw {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" => 3,
        ">" | "<" | ">=" | "<=" => 4,
        "!" => 5,
        "." | "[" => 6,
        _ => 0,
    }
}

fn binary_op(raw: &str) -> Option<BinaryOp> {
    match raw {
        "&&" => Some(BinaryOp::And),
        "||" => Some(BinaryOp::Or),
        "==" => Some(BinaryOp::Eq),
        "!=" => Some(BinaryOp::Ne),
        ">" => Some(BinaryOp::Gt),
        "<" => Some(BinaryOp::Lt),
        ">=" => Some(BinaryOp::Ge),
        "<=" => Some(BinaryOp::Le),
        _ => None,
    }
}

/// A pending operator together with the value-stack depth where a
/// function's arguments start.
struct OpEntry {
    token: Token,
    start: usize,
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    ops: Vec<OpEntry>,
    vals: Vec<Expr>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            ops: Vec::new(),
            vals: Vec::new(),
        }
    }

    fn parse(mut self) -> ExpressionResult<Expr> {
        while self.position < self.tokens.len() {
            let token = self.tokens[self.position].clone();
            self.position += 1;
            match token.kind {
                TokenKind::Number | TokenKind::String | TokenKind::Boolean => {
                    self.vals
                        .push(Expr::Literal(token.value.unwrap_or(Value::Null)));
                }
                TokenKind::Null => self.vals.push(Expr::Literal(Value::Null)),
                TokenKind::NamedValue => self.vals.push(Expr::NamedValue(token.raw)),
                TokenKind::PropertyName => self.vals.push(Expr::PropertyName(token.raw)),
                TokenKind::Wildcard => self.vals.push(Expr::Wildcard),
                TokenKind::Function => {
                    let start = self.vals.len();
                    self.ops.push(OpEntry { token, start });
                }
                TokenKind::StartParameters | TokenKind::StartGroup => {
                    self.ops.push(OpEntry { token, start: 0 });
                }
                TokenKind::LogicalOperator
                | TokenKind::Dereference
                | TokenKind::StartIndex => {
                    self.drain_higher(&token.raw)?;
                    self.ops.push(OpEntry { token, start: 0 });
                }
                TokenKind::Separator => {
                    while self
                        .ops
                        .last()
                        .is_some_and(|op| op.token.kind != TokenKind::StartParameters)
                    {
                        self.pop_op()?;
                    }
                }
                TokenKind::EndParameters => {
                    self.drain_to(TokenKind::StartParameters)?;
                    self.ops.pop();
                    let func = self
                        .ops
                        .pop()
                        .filter(|op| op.token.kind == TokenKind::Function)
                        .ok_or_else(|| {
                            ExpressionError::Parse("expected function token".to_string())
                        })?;
                    let args = self.vals.split_off(func.start.min(self.vals.len()));
                    self.vals.push(Expr::Function {
                        name: func.token.raw,
                        args,
                    });
                }
                TokenKind::EndGroup => {
                    self.drain_to(TokenKind::StartGroup)?;
                    self.ops.pop();
                }
                TokenKind::EndIndex => {
                    self.drain_to(TokenKind::StartIndex)?;
                    self.ops.pop();
                    if self.vals.len() < 2 {
                        return Err(ExpressionError::Parse(
                            "insufficient operands".to_string(),
                        ));
                    }
                    let right = self.vals.pop().unwrap_or(Expr::Wildcard);
                    let left = self.vals.pop().unwrap_or(Expr::Wildcard);
                    self.vals.push(Expr::Binary {
                        op: BinaryOp::Index,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                }
                TokenKind::Unexpected => {
                    return Err(ExpressionError::UnexpectedToken {
                        raw: token.raw,
                        index: token.index,
                    });
                }
            }
        }

        while let Some(top) = self.ops.last() {
            if matches!(
                top.token.kind,
                TokenKind::StartGroup | TokenKind::StartIndex | TokenKind::StartParameters
            ) {
                return Err(ExpressionError::Parse("mismatched parentheses".to_string()));
            }
            self.pop_op()?;
        }
        if self.vals.len() != 1 {
            return Err(ExpressionError::Parse("invalid expression".to_string()));
        }
        Ok(self.vals.remove(0))
    }

    /// Drain operators with higher-or-equal precedence than `raw`, up to
    /// (not through) any opener.
    fn drain_higher(&mut self, raw: &str) -> ExpressionResult<()> {
        while let Some(top) = self.ops.last() {
            let is_opener = matches!(
                top.token.kind,
                TokenKind::StartGroup | TokenKind::StartParameters | TokenKind::StartIndex
            );
            if is_opener || precedence(&top.token.raw) < precedence(raw) {
                break;
            }
            self.pop_op()?;
        }
        Ok(())
    }

    /// Drain operators back to the nearest opener of `kind`, which stays
    /// on the stack.
    fn drain_to(&mut self, kind: TokenKind) -> ExpressionResult<()> {
        while self
            .ops
            .last()
            .is_some_and(|op| op.token.kind != kind)
        {
            self.pop_op()?;
        }
        if self.ops.is_empty() {
            return Err(ExpressionError::Parse("mismatched parentheses".to_string()));
        }
        Ok(())
    }

    /// Pop one operator and assemble its node from the value stack.
    fn pop_op(&mut self) -> ExpressionResult<()> {
        let Some(op) = self.ops.pop() else {
            return Ok(());
        };
        match op.token.kind {
            TokenKind::LogicalOperator if op.token.raw == "!" => {
                let operand = self.vals.pop().ok_or_else(|| {
                    ExpressionError::Parse("insufficient operands".to_string())
                })?;
                self.vals.push(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                });
            }
            TokenKind::LogicalOperator => {
                if self.vals.len() < 2 {
                    return Err(ExpressionError::Parse(
                        "insufficient operands".to_string(),
                    ));
                }
                let right = self.vals.pop().unwrap_or(Expr::Wildcard);
                let left = self.vals.pop().unwrap_or(Expr::Wildcard);
                let op = binary_op(&op.token.raw).ok_or_else(|| {
                    ExpressionError::Parse(format!("unsupported operator {}", op.token.raw))
                })?;
                self.vals.push(Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            TokenKind::Dereference => {
                if self.vals.len() < 2 {
                    return Err(ExpressionError::Parse(
                        "insufficient operands".to_string(),
                    ));
                }
                let right = self.vals.pop().unwrap_or(Expr::Wildcard);
                let left = self.vals.pop().unwrap_or(Expr::Wildcard);
                self.vals.push(Expr::Binary {
                    op: BinaryOp::Deref,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse("42").unwrap(), Expr::Literal(Value::number(42.0)));
        assert_eq!(
            parse("'hi'").unwrap(),
            Expr::Literal(Value::string("hi"))
        );
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn test_precedence() {
        // || binds loosest: (true || (false && false))
        let expr = parse("true || false && false").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Or, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("expected ||, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_binds_tighter_than_and() {
        let expr = parse("1 < 2 && 3 > 2").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::And, left, right } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Lt, .. }));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Gt, .. }));
            }
            other => panic!("expected &&, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping() {
        let expr = parse("(true || false) && false").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::And, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Or, .. }));
            }
            other => panic!("expected &&, got {:?}", other),
        }
    }

    #[test]
    fn test_function_arguments_in_order() {
        let expr = parse("format('x', 1, 2)").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "format");
                assert_eq!(args.len(), 3);
                assert_eq!(args[0], Expr::Literal(Value::string("x")));
                assert_eq!(args[1], Expr::Literal(Value::number(1.0)));
                assert_eq!(args[2], Expr::Literal(Value::number(2.0)));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_function() {
        let expr = parse("contains(format('{0}', 'a'), 'a')").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "contains");
                assert!(matches!(args[0], Expr::Function { .. }));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_arguments() {
        let expr = parse("always()").unwrap();
        assert_eq!(
            expr,
            Expr::Function {
                name: "always".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn test_dereference_chain() {
        // github.ref_name => ((github . ref_name))
        let expr = parse("github.ref_name").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Deref, left, right } => {
                assert_eq!(*left, Expr::NamedValue("github".to_string()));
                assert_eq!(*right, Expr::PropertyName("ref_name".to_string()));
            }
            other => panic!("expected deref, got {:?}", other),
        }
    }

    #[test]
    fn test_index_access() {
        let expr = parse("needs['build']").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Index, left, right } => {
                assert_eq!(*left, Expr::NamedValue("needs".to_string()));
                assert_eq!(*right, Expr::Literal(Value::string("build")));
            }
            other => panic!("expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_not() {
        let expr = parse("!(a > b)").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_unexpected_token_reports_index() {
        let err = parse("1 ? 2").unwrap_err();
        match err {
            ExpressionError::UnexpectedToken { raw, index } => {
                assert_eq!(raw, "?");
                assert_eq!(index, 2);
            }
            other => panic!("expected unexpected token, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert!(parse("(1").is_err());
        assert!(parse("f(1").is_err());
    }

    #[test]
    fn test_stray_operand() {
        assert!(parse("").is_err());
    }

    #[test]
    fn test_comparison_inside_index() {
        // The open bracket is a barrier; the comparison stays inside it.
        let expr = parse("needs[1 < 2]").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Index, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Lt, .. }));
            }
            other => panic!("expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_index() {
        let expr = parse("needs[needs[0]]").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Index, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Index, .. }));
            }
            other => panic!("expected index, got {:?}", other),
        }
    }

    #[test]
    fn test_wildcard_chain() {
        let expr = parse("matrix.*[1]").unwrap();
        match expr {
            Expr::Binary { op: BinaryOp::Index, left, .. } => match *left {
                Expr::Binary { op: BinaryOp::Deref, right, .. } => {
                    assert_eq!(*right, Expr::Wildcard);
                }
                other => panic!("expected deref, got {:?}", other),
            },
            other => panic!("expected index, got {:?}", other),
        }
    }
}
