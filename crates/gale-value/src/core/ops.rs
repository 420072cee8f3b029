//! Abstract equality and ordering.
//!
//! Comparisons coerce operands pairwise before comparing:
//!
//! 1. matching kinds compare directly;
//! 2. a string compared against a number coerces to a number;
//! 3. a boolean or null on either side coerces that side to a number and
//!    the coercion restarts;
//! 4. anything else is incomparable.
//!
//! Number comparisons are NaN-poisoned. String equality folds ASCII case;
//! string ordering is byte-lexicographic and case-sensitive. Objects and
//! arrays never compare equal or ordered.

use crate::core::number::parse_number;
use crate::core::value::Value;

/// A value lowered to its comparable form
#[derive(Debug, Clone, Copy)]
enum Prim<'a> {
    Null,
    Boolean(bool),
    Number(f64),
    String(&'a str),
    Opaque,
}

impl<'a> Prim<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Null => Prim::Null,
            Value::Boolean(b) => Prim::Boolean(*b),
            Value::Number(n) => Prim::Number(*n),
            Value::String(s) => Prim::String(s),
            Value::Array(_) | Value::Object(_) | Value::Filtered(_) => Prim::Opaque,
        }
    }

    fn to_number(self) -> f64 {
        match self {
            Prim::Null => 0.0,
            Prim::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Prim::Number(n) => n,
            Prim::String(s) => parse_number(s),
            Prim::Opaque => f64::NAN,
        }
    }

    fn same_kind(&self, other: &Prim<'_>) -> bool {
        matches!(
            (self, other),
            (Prim::Null, Prim::Null)
                | (Prim::Boolean(_), Prim::Boolean(_))
                | (Prim::Number(_), Prim::Number(_))
                | (Prim::String(_), Prim::String(_))
                | (Prim::Opaque, Prim::Opaque)
        )
    }
}

fn coerce<'a>(mut left: Prim<'a>, mut right: Prim<'a>) -> (Prim<'a>, Prim<'a>) {
    loop {
        if left.same_kind(&right) {
            return (left, right);
        }
        match (left, right) {
            (Prim::Number(_), Prim::String(s)) => right = Prim::Number(parse_number(s)),
            (Prim::String(s), Prim::Number(_)) => left = Prim::Number(parse_number(s)),
            (Prim::Boolean(_) | Prim::Null, _) => left = Prim::Number(left.to_number()),
            (_, Prim::Boolean(_) | Prim::Null) => right = Prim::Number(right.to_number()),
            _ => return (left, right),
        }
    }
}

/// Abstract equality over two values
pub fn abstract_eq(left: &Value, right: &Value) -> bool {
    let (left, right) = coerce(Prim::of(left), Prim::of(right));
    match (left, right) {
        (Prim::Null, Prim::Null) => true,
        (Prim::Boolean(l), Prim::Boolean(r)) => l == r,
        (Prim::Number(l), Prim::Number(r)) => !l.is_nan() && !r.is_nan() && l == r,
        (Prim::String(l), Prim::String(r)) => l.eq_ignore_ascii_case(r),
        _ => false,
    }
}

/// Abstract greater-than over two values
pub fn abstract_gt(left: &Value, right: &Value) -> bool {
    let (left, right) = coerce(Prim::of(left), Prim::of(right));
    match (left, right) {
        (Prim::Number(l), Prim::Number(r)) => !l.is_nan() && !r.is_nan() && l > r,
        (Prim::String(l), Prim::String(r)) => l > r,
        (Prim::Boolean(l), Prim::Boolean(r)) => l && !r,
        _ => false,
    }
}

/// Abstract less-than over two values
pub fn abstract_lt(left: &Value, right: &Value) -> bool {
    let (left, right) = coerce(Prim::of(left), Prim::of(right));
    match (left, right) {
        (Prim::Number(l), Prim::Number(r)) => !l.is_nan() && !r.is_nan() && l < r,
        (Prim::String(l), Prim::String(r)) => l < r,
        (Prim::Boolean(l), Prim::Boolean(r)) => !l && r,
        _ => false,
    }
}
