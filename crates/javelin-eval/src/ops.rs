//! Operators on primitive values.
//!
//! Everything here is pure: no heap, no user code. String concatenation and
//! equality that may call user `equals` live in the evaluator.

use std::cmp::Ordering;

use javelin_types::ast::{BinOp, PrimType, UnaryOp};

use crate::stdlib::string::locale_compare;
use crate::value::{Boxed, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum OpError {
    TypeMismatch(String),
    /// Integer division or remainder by zero.
    DivideByZero,
    /// Arithmetic on `null` (unboxing a null wrapper).
    NullOperand,
}

pub type OpResult = Result<Value, OpError>;

/// A numeric operand after unboxing and unary promotion.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    I(i32),
    L(i64),
    F(f32),
    D(f64),
}

fn num(v: &Value) -> Option<Num> {
    match v.unboxed() {
        Value::Int(i) => Some(Num::I(i)),
        Value::Char(c) => Some(Num::I(c as i32)),
        Value::Long(l) => Some(Num::L(l)),
        Value::Float(f) => Some(Num::F(f)),
        Value::Double(d) => Some(Num::D(d)),
        _ => None,
    }
}

fn rank(n: Num) -> u8 {
    match n {
        Num::I(_) => 0,
        Num::L(_) => 1,
        Num::F(_) => 2,
        Num::D(_) => 3,
    }
}

fn widen(n: Num, to: u8) -> Num {
    match (n, to) {
        (Num::I(i), 1) => Num::L(i as i64),
        (Num::I(i), 2) => Num::F(i as f32),
        (Num::I(i), 3) => Num::D(i as f64),
        (Num::L(l), 2) => Num::F(l as f32),
        (Num::L(l), 3) => Num::D(l as f64),
        (Num::F(f), 3) => Num::D(f as f64),
        (n, _) => n,
    }
}

/// Widest type wins.
fn promote(a: Num, b: Num) -> (Num, Num) {
    let to = rank(a).max(rank(b));
    (widen(a, to), widen(b, to))
}

fn mismatch(op: BinOp, l: &Value, r: &Value) -> OpError {
    OpError::TypeMismatch(format!(
        "operator {} cannot be applied to {} and {}",
        op.as_str(),
        l.type_name(),
        r.type_name()
    ))
}

// ══════════════════════════════════════════════════════════════════════════════
// Binary operators
// ══════════════════════════════════════════════════════════════════════════════

/// Apply a non-short-circuit binary operator to two non-string operands.
pub fn binary(op: BinOp, l: &Value, r: &Value) -> OpResult {
    match op {
        BinOp::Eq => return Ok(Value::Bool(identical(l, r))),
        BinOp::NotEq => return Ok(Value::Bool(!identical(l, r))),
        _ => {}
    }
    if l.is_null() || r.is_null() {
        return Err(OpError::NullOperand);
    }
    if let (Value::Str(a), Value::Str(b)) = (l, r) {
        let ord = locale_compare(a, b).cmp(&0);
        return relational(op, ord).ok_or_else(|| mismatch(op, l, r));
    }
    if let (Some(a), Some(b)) = (l.as_bool(), r.as_bool()) {
        return match op {
            BinOp::BitAnd | BinOp::And => Ok(Value::Bool(a & b)),
            BinOp::BitOr | BinOp::Or => Ok(Value::Bool(a | b)),
            BinOp::BitXor => Ok(Value::Bool(a ^ b)),
            _ => Err(mismatch(op, l, r)),
        };
    }
    let (Some(a), Some(b)) = (num(l), num(r)) else {
        return Err(mismatch(op, l, r));
    };
    if matches!(op, BinOp::Shl | BinOp::Shr | BinOp::UShr) {
        return shift(op, a, b).ok_or_else(|| mismatch(op, l, r));
    }
    match promote(a, b) {
        (Num::I(x), Num::I(y)) => int_op(op, x, y).ok_or_else(|| mismatch(op, l, r))?,
        (Num::L(x), Num::L(y)) => long_op(op, x, y).ok_or_else(|| mismatch(op, l, r))?,
        (Num::F(x), Num::F(y)) => float_op(op, x as f64, y as f64)
            .map(|v| match v {
                Value::Double(d) => Value::Float(d as f32),
                other => other,
            })
            .ok_or_else(|| mismatch(op, l, r)),
        (Num::D(x), Num::D(y)) => float_op(op, x, y).ok_or_else(|| mismatch(op, l, r)),
        _ => Err(mismatch(op, l, r)),
    }
}

fn relational(op: BinOp, ord: Ordering) -> Option<Value> {
    Some(Value::Bool(match op {
        BinOp::Less => ord == Ordering::Less,
        BinOp::Greater => ord == Ordering::Greater,
        BinOp::LessEq => ord != Ordering::Greater,
        BinOp::GreaterEq => ord != Ordering::Less,
        _ => return None,
    }))
}

fn int_op(op: BinOp, x: i32, y: i32) -> Option<OpResult> {
    Some(Ok(match op {
        BinOp::Add => Value::Int(x.wrapping_add(y)),
        BinOp::Sub => Value::Int(x.wrapping_sub(y)),
        BinOp::Mul => Value::Int(x.wrapping_mul(y)),
        BinOp::Div if y == 0 => return Some(Err(OpError::DivideByZero)),
        BinOp::Div => Value::Int(x.wrapping_div(y)),
        BinOp::Mod if y == 0 => return Some(Err(OpError::DivideByZero)),
        BinOp::Mod => Value::Int(x.wrapping_rem(y)),
        BinOp::BitAnd => Value::Int(x & y),
        BinOp::BitOr => Value::Int(x | y),
        BinOp::BitXor => Value::Int(x ^ y),
        _ => return relational(op, x.cmp(&y)).map(Ok),
    }))
}

fn long_op(op: BinOp, x: i64, y: i64) -> Option<OpResult> {
    Some(Ok(match op {
        BinOp::Add => Value::Long(x.wrapping_add(y)),
        BinOp::Sub => Value::Long(x.wrapping_sub(y)),
        BinOp::Mul => Value::Long(x.wrapping_mul(y)),
        BinOp::Div if y == 0 => return Some(Err(OpError::DivideByZero)),
        BinOp::Div => Value::Long(x.wrapping_div(y)),
        BinOp::Mod if y == 0 => return Some(Err(OpError::DivideByZero)),
        BinOp::Mod => Value::Long(x.wrapping_rem(y)),
        BinOp::BitAnd => Value::Long(x & y),
        BinOp::BitOr => Value::Long(x | y),
        BinOp::BitXor => Value::Long(x ^ y),
        _ => return relational(op, x.cmp(&y)).map(Ok),
    }))
}

fn float_op(op: BinOp, x: f64, y: f64) -> Option<Value> {
    Some(match op {
        BinOp::Add => Value::Double(x + y),
        BinOp::Sub => Value::Double(x - y),
        BinOp::Mul => Value::Double(x * y),
        BinOp::Div => Value::Double(x / y),
        BinOp::Mod => Value::Double(x % y),
        // NaN is unordered: every comparison is false.
        _ => match x.partial_cmp(&y) {
            Some(ord) => relational(op, ord)?,
            None if op.is_comparison() => Value::Bool(false),
            None => return None,
        },
    })
}

fn shift(op: BinOp, a: Num, b: Num) -> Option<Value> {
    let n = match b {
        Num::I(i) => i as i64,
        Num::L(l) => l,
        _ => return None,
    };
    Some(match a {
        Num::I(x) => {
            let n = (n & 0x1f) as u32;
            Value::Int(match op {
                BinOp::Shl => x.wrapping_shl(n),
                BinOp::Shr => x.wrapping_shr(n),
                _ => ((x as u32) >> n) as i32,
            })
        }
        Num::L(x) => {
            let n = (n & 0x3f) as u32;
            Value::Long(match op {
                BinOp::Shl => x.wrapping_shl(n),
                BinOp::Shr => x.wrapping_shr(n),
                _ => ((x as u64) >> n) as i64,
            })
        }
        _ => return None,
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Unary operators
// ══════════════════════════════════════════════════════════════════════════════

pub fn unary(op: UnaryOp, v: &Value) -> OpResult {
    let bad = || {
        OpError::TypeMismatch(format!(
            "unary operator cannot be applied to {}",
            v.type_name()
        ))
    };
    if v.is_null() {
        return Err(OpError::NullOperand);
    }
    match op {
        UnaryOp::Not => v.as_bool().map(|b| Value::Bool(!b)).ok_or_else(bad),
        UnaryOp::Plus => match num(v).ok_or_else(bad)? {
            Num::I(i) => Ok(Value::Int(i)),
            Num::L(l) => Ok(Value::Long(l)),
            Num::F(f) => Ok(Value::Float(f)),
            Num::D(d) => Ok(Value::Double(d)),
        },
        UnaryOp::Neg => match num(v).ok_or_else(bad)? {
            Num::I(i) => Ok(Value::Int(i.wrapping_neg())),
            Num::L(l) => Ok(Value::Long(l.wrapping_neg())),
            Num::F(f) => Ok(Value::Float(-f)),
            Num::D(d) => Ok(Value::Double(-d)),
        },
        UnaryOp::BitNot => match num(v).ok_or_else(bad)? {
            Num::I(i) => Ok(Value::Int(!i)),
            Num::L(l) => Ok(Value::Long(!l)),
            _ => Err(bad()),
        },
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Equality & conversion
// ══════════════════════════════════════════════════════════════════════════════

/// The `==` operator.
///
/// Primitives compare by value (a boxed operand against a primitive is
/// unboxed), strings by content, two boxes by identity except for values in
/// the small-value cache, and references by identity.
pub fn identical(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Boxed(a), Value::Boxed(b)) => {
            a.ptr_eq(b) || (a.is_cached() && b.is_cached() && identical(a.get(), b.get()))
        }
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Ref(a), Value::Ref(b)) => a == b,
        (Value::Closure(a), Value::Closure(b)) => std::sync::Arc::ptr_eq(a, b),
        (Value::Optional(a), Value::Optional(b)) => match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => identical(x, y),
            _ => false,
        },
        (Value::DateTime(a), Value::DateTime(b)) => a == b,
        _ => {
            if let (Some(a), Some(b)) = (l.as_bool(), r.as_bool()) {
                return a == b;
            }
            match (num(l), num(r)) {
                (Some(a), Some(b)) => match promote(a, b) {
                    (Num::I(x), Num::I(y)) => x == y,
                    (Num::L(x), Num::L(y)) => x == y,
                    (Num::F(x), Num::F(y)) => x == y,
                    (Num::D(x), Num::D(y)) => x == y,
                    _ => false,
                },
                _ => false,
            }
        }
    }
}

/// Primitive conversion, as a cast or assignment performs it.
pub fn convert_prim(to: PrimType, v: &Value) -> Option<Value> {
    if to == PrimType::Boolean {
        return v.as_bool().map(Value::Bool);
    }
    let n = num(v)?;
    Some(match to {
        PrimType::Int => Value::Int(match n {
            Num::I(i) => i,
            Num::L(l) => l as i32,
            Num::F(f) => f as i32,
            Num::D(d) => d as i32,
        }),
        PrimType::Long => Value::Long(match n {
            Num::I(i) => i as i64,
            Num::L(l) => l,
            Num::F(f) => f as i64,
            Num::D(d) => d as i64,
        }),
        PrimType::Float => Value::Float(match n {
            Num::I(i) => i as f32,
            Num::L(l) => l as f32,
            Num::F(f) => f,
            Num::D(d) => d as f32,
        }),
        PrimType::Double => Value::Double(match n {
            Num::I(i) => i as f64,
            Num::L(l) => l as f64,
            Num::F(f) => f as f64,
            Num::D(d) => d,
        }),
        PrimType::Char => {
            let code = match n {
                Num::I(i) => i as u32,
                Num::L(l) => l as u32,
                Num::F(f) => f as i32 as u32,
                Num::D(d) => d as i32 as u32,
            } & 0xffff;
            Value::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        PrimType::Boolean => return None,
    })
}

/// Convert the result of a compound assignment back to the type of the
/// variable it updates (`int x; x += 1.5` stays an int).
pub fn narrow_like(old: &Value, result: Value) -> Value {
    match old {
        Value::Boxed(_) => match old.prim_kind().and_then(|p| convert_prim(p, &result)) {
            Some(v) => Boxed::new(v),
            None => result,
        },
        Value::Str(_) | Value::Null => result,
        _ => match old.prim_kind().and_then(|p| convert_prim(p, &result)) {
            Some(v) => v,
            None => result,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i32) -> Value {
        Value::Int(i)
    }

    #[test]
    fn test_int_arithmetic_wraps() {
        let v = binary(BinOp::Add, &int(i32::MAX), &int(1)).unwrap();
        assert!(matches!(v, Value::Int(i32::MIN)));
    }

    #[test]
    fn test_integer_division_truncates() {
        assert!(matches!(binary(BinOp::Div, &int(7), &int(2)), Ok(Value::Int(3))));
        assert!(matches!(binary(BinOp::Mod, &int(-7), &int(2)), Ok(Value::Int(-1))));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            binary(BinOp::Div, &int(1), &int(0)).unwrap_err(),
            OpError::DivideByZero
        );
        let d = binary(BinOp::Div, &Value::Double(1.0), &int(0)).unwrap();
        assert!(matches!(d, Value::Double(x) if x.is_infinite()));
    }

    #[test]
    fn test_promotion_widest_wins() {
        assert!(matches!(
            binary(BinOp::Mul, &int(2), &Value::Double(1.5)),
            Ok(Value::Double(x)) if x == 3.0
        ));
        assert!(matches!(
            binary(BinOp::Add, &int(2), &Value::Long(1)),
            Ok(Value::Long(3))
        ));
        assert!(matches!(
            binary(BinOp::Add, &Value::Float(0.5), &int(1)),
            Ok(Value::Float(x)) if x == 1.5
        ));
    }

    #[test]
    fn test_char_arithmetic() {
        assert!(matches!(
            binary(BinOp::Add, &Value::Char('a'), &int(1)),
            Ok(Value::Int(98))
        ));
        assert!(matches!(
            binary(BinOp::Less, &Value::Char('a'), &Value::Char('b')),
            Ok(Value::Bool(true))
        ));
    }

    #[test]
    fn test_shifts_mask_distance() {
        assert!(matches!(binary(BinOp::Shl, &int(1), &int(33)), Ok(Value::Int(2))));
        assert!(matches!(
            binary(BinOp::UShr, &int(-1), &int(28)),
            Ok(Value::Int(15))
        ));
        assert!(matches!(binary(BinOp::Shr, &int(-8), &int(1)), Ok(Value::Int(-4))));
    }

    #[test]
    fn test_boolean_logic_operators() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert!(matches!(binary(BinOp::BitXor, &t, &f), Ok(Value::Bool(true))));
        assert!(matches!(binary(BinOp::BitAnd, &t, &f), Ok(Value::Bool(false))));
    }

    #[test]
    fn test_string_relational() {
        assert!(matches!(
            binary(BinOp::Less, &Value::str("apple"), &Value::str("Banana")),
            Ok(Value::Bool(true))
        ));
    }

    #[test]
    fn test_mismatch() {
        assert!(matches!(
            binary(BinOp::Sub, &Value::Bool(true), &int(1)),
            Err(OpError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_null_operand() {
        assert_eq!(
            binary(BinOp::Add, &Value::Null, &int(1)).unwrap_err(),
            OpError::NullOperand
        );
        assert!(matches!(
            binary(BinOp::Eq, &Value::Null, &Value::Null),
            Ok(Value::Bool(true))
        ));
    }

    #[test]
    fn test_unary() {
        assert!(matches!(unary(UnaryOp::Neg, &int(5)), Ok(Value::Int(-5))));
        assert!(matches!(unary(UnaryOp::BitNot, &int(0)), Ok(Value::Int(-1))));
        assert!(matches!(unary(UnaryOp::Plus, &Value::Char('A')), Ok(Value::Int(65))));
        assert!(unary(UnaryOp::Not, &int(1)).is_err());
    }

    #[test]
    fn test_boxed_identity() {
        let a = Boxed::new(int(1000));
        let b = Boxed::new(int(1000));
        assert!(!identical(&a, &b));
        assert!(identical(&a, &a.clone()));
        assert!(identical(&a, &int(1000)));
        let small_a = Boxed::new(int(12));
        let small_b = Boxed::new(int(12));
        assert!(identical(&small_a, &small_b));
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(identical(&int(3), &Value::Double(3.0)));
        assert!(identical(&Value::Char('A'), &int(65)));
        assert!(!identical(&Value::Null, &int(0)));
    }

    #[test]
    fn test_convert_prim() {
        assert!(matches!(
            convert_prim(PrimType::Int, &Value::Double(3.99)),
            Some(Value::Int(3))
        ));
        assert!(matches!(
            convert_prim(PrimType::Char, &int(66)),
            Some(Value::Char('B'))
        ));
        assert!(matches!(
            convert_prim(PrimType::Int, &Value::Char('B')),
            Some(Value::Int(66))
        ));
        assert!(matches!(
            convert_prim(PrimType::Int, &Value::Long(1 << 32 | 5)),
            Some(Value::Int(5))
        ));
        assert!(convert_prim(PrimType::Boolean, &int(1)).is_none());
    }

    #[test]
    fn test_narrow_like() {
        assert!(matches!(
            narrow_like(&int(1), Value::Double(2.5)),
            Value::Int(2)
        ));
        assert!(matches!(
            narrow_like(&Value::Char('a'), int(98)),
            Value::Char('b')
        ));
        let boxed = narrow_like(&Boxed::new(int(1)), int(2));
        assert!(matches!(boxed, Value::Boxed(_)));
    }
}
