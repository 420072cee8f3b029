//! Abstract syntax tree node types.

use gale_value::Value;

/// An expression node in the AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value (number, string, boolean, or null)
    Literal(Value),

    /// Named value resolved against the context variables
    NamedValue(String),

    /// Property name on the right-hand side of a dereference
    PropertyName(String),

    /// The `*` wildcard inside a dereference or index
    Wildcard,

    /// Function call
    Function {
        /// Function name as written
        name: String,
        /// Ordered, unevaluated argument nodes
        args: Vec<Expr>,
    },

    /// Unary operation (`!expr`)
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
    },

    /// Binary operation (`left op right`)
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`!`)
    Not,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Logical AND (`&&`)
    And,
    /// Logical OR (`||`)
    Or,
    /// Abstract equality (`==`)
    Eq,
    /// Abstract inequality (`!=`)
    Ne,
    /// Greater than (`>`)
    Gt,
    /// Less than (`<`)
    Lt,
    /// Greater than or equal (`>=`)
    Ge,
    /// Less than or equal (`<=`)
    Le,
    /// Property dereference (`.`)
    Deref,
    /// Index access (`[`)
    Index,
}

impl BinaryOp {
    /// Get the operator as written in source
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Deref => ".",
            BinaryOp::Index => "[",
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Expr {
    /// Pre-order walk over this expression tree
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.visit(f);
                }
            }
            Expr::Unary { operand, .. } => operand.visit(f),
            Expr::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            _ => {}
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(value) => match value {
                Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
                other => write!(f, "{}", other.to_display_string()),
            },
            Expr::NamedValue(name) => write!(f, "{}", name),
            Expr::PropertyName(name) => write!(f, "{}", name),
            Expr::Wildcard => write!(f, "*"),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Unary { operand, .. } => write!(f, "(!{})", operand),
            Expr::Binary { op, left, right } => match op {
                BinaryOp::Deref => write!(f, "{}.{}", left, right),
                BinaryOp::Index => write!(f, "{}[{}]", left, right),
                _ => write!(f, "({} {} {})", left, op, right),
            },
        }
    }
}
