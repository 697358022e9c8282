//! Binary and unary operators.
//!
//! Direct enum dispatch over the operand kinds. Integer arithmetic wraps on
//! overflow; mixing an integer with a float promotes to float, and mixing
//! `int` with `uint` computes in `u64`.

use std::cmp::Ordering;
use std::rc::Rc;

use golite_ir::{BinaryOp, UnaryOp};

use crate::errors::{
    division_by_zero, invalid_binary_op, invalid_unary_op, mismatched_types, EvalError,
    EvalResult,
};
use crate::value::{Complex, Value};

/// Evaluate `left op right`.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => return values_equal(left, right, op).map(Value::Bool),
        BinaryOp::NotEq => return values_equal(left, right, op).map(|eq| Value::Bool(!eq)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(left, right, op)?;
            return Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }));
        }
        BinaryOp::Shl | BinaryOp::Shr => return shift(left, right, op),
        _ => {}
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_binary(*a, *b, op),
        (Value::Uint(a), Value::Uint(b)) => uint_binary(*a, *b, op),
        (Value::Int(a), Value::Uint(b)) => uint_binary(*a as u64, *b, op),
        (Value::Uint(a), Value::Int(b)) => uint_binary(*a, *b as u64, op),
        (Value::Float(a), Value::Float(b)) => float_binary(*a, *b, op),
        (Value::Float(a), Value::Int(_) | Value::Uint(_)) => {
            float_binary(*a, as_f64(right).unwrap_or_default(), op)
        }
        (Value::Int(_) | Value::Uint(_), Value::Float(b)) => {
            float_binary(as_f64(left).unwrap_or_default(), *b, op)
        }
        (Value::Complex(_), _) | (_, Value::Complex(_)) => {
            match (as_complex(left), as_complex(right)) {
                (Some(a), Some(b)) => complex_binary(a, b, op),
                _ => Err(mismatched_types(op, left.type_name(), right.type_name())),
            }
        }
        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Add => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::string(s))
            }
            _ => Err(invalid_binary_op(op, "string")),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::And => Ok(Value::Bool(*a && *b)),
            BinaryOp::Or => Ok(Value::Bool(*a || *b)),
            _ => Err(invalid_binary_op(op, "bool")),
        },
        _ if same_kind(left, right) => Err(invalid_binary_op(op, left.type_name())),
        _ => Err(mismatched_types(op, left.type_name(), right.type_name())),
    }
}

fn int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div if b == 0 => return Err(division_by_zero()),
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem if b == 0 => return Err(division_by_zero()),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::AndNot => a & !b,
        _ => return Err(invalid_binary_op(op, "int")),
    };
    Ok(Value::Int(value))
}

fn uint_binary(a: u64, b: u64, op: BinaryOp) -> EvalResult {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(division_by_zero()),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::AndNot => a & !b,
        _ => return Err(invalid_binary_op(op, "uint")),
    };
    Ok(Value::Uint(value))
}

fn float_binary(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => return Err(invalid_binary_op(op, "float64")),
    };
    Ok(Value::Float(value))
}

fn complex_binary(a: Complex, b: Complex, op: BinaryOp) -> EvalResult {
    let value = match op {
        BinaryOp::Add => a.add(b),
        BinaryOp::Sub => a.sub(b),
        BinaryOp::Mul => a.mul(b),
        BinaryOp::Div => a.div(b),
        _ => return Err(invalid_binary_op(op, "complex128")),
    };
    Ok(Value::Complex(value))
}

/// `<<` and `>>`: the result has the left operand's kind.
fn shift(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    let count = match right {
        Value::Int(n) if *n >= 0 => n.unsigned_abs(),
        Value::Uint(n) => *n,
        Value::Int(_) => return Err(EvalError::host("negative shift amount")),
        other => return Err(invalid_binary_op(op, other.type_name())),
    };
    let left_shift = op == BinaryOp::Shl;
    match left {
        Value::Int(a) => Ok(Value::Int(match (left_shift, u32::try_from(count)) {
            (true, Ok(n)) if n < 64 => a.wrapping_shl(n),
            (false, Ok(n)) if n < 64 => a >> n,
            (true, _) => 0,
            (false, _) => {
                if *a < 0 {
                    -1
                } else {
                    0
                }
            }
        })),
        Value::Uint(a) => Ok(Value::Uint(match u32::try_from(count) {
            Ok(n) if n < 64 && left_shift => a.wrapping_shl(n),
            Ok(n) if n < 64 => a >> n,
            _ => 0,
        })),
        other => Err(invalid_binary_op(op, other.type_name())),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Uint(u) => Some(*u as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn as_complex(value: &Value) -> Option<Complex> {
    match value {
        Value::Complex(c) => Some(*c),
        other => as_f64(other).map(|re| Complex::new(re, 0.0)),
    }
}

fn same_kind(left: &Value, right: &Value) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right)
}

/// `==` on two values.
///
/// Lists, maps, structs and functions are only comparable to `nil`.
pub fn values_equal(left: &Value, right: &Value, op: BinaryOp) -> EvalResult<bool> {
    let equal = match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Map(map), Value::Nil) | (Value::Nil, Value::Map(map)) => map.borrow().is_nil(),
        (Value::Nil, _) | (_, Value::Nil) => false,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Uint(a), Value::Uint(b)) => a == b,
        (Value::Int(a), Value::Uint(b)) | (Value::Uint(b), Value::Int(a)) => {
            i128::from(*a) == i128::from(*b)
        }
        (Value::Complex(_), _) | (_, Value::Complex(_)) => {
            match (as_complex(left), as_complex(right)) {
                (Some(a), Some(b)) => a == b,
                _ => return Err(mismatched_types(op, left.type_name(), right.type_name())),
            }
        }
        (Value::Float(_), Value::Int(_) | Value::Uint(_) | Value::Float(_))
        | (Value::Int(_) | Value::Uint(_), Value::Float(_)) => as_f64(left) == as_f64(right),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Pointer(a), Value::Pointer(b)) => a.ptr_eq(b),
        (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
        (Value::External(a), Value::External(b)) => a.address() == b.address(),
        (
            Value::List(_)
            | Value::Map(_)
            | Value::Struct(_)
            | Value::Closure(_)
            | Value::BoundMethod(_)
            | Value::Builtin(_)
            | Value::Native(_),
            _,
        ) => return Err(invalid_binary_op(op, left.type_name())),
        _ => return Err(mismatched_types(op, left.type_name(), right.type_name())),
    };
    Ok(equal)
}

/// Ordering of two numbers or two strings.
fn compare(left: &Value, right: &Value, op: BinaryOp) -> EvalResult<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Ok(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Uint(a), Value::Int(b)) => Ok(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Float(_), Value::Int(_) | Value::Uint(_) | Value::Float(_))
        | (Value::Int(_) | Value::Uint(_), Value::Float(_)) => {
            // NaN compares false under every ordering operator.
            let (a, b) = (as_f64(left).unwrap_or_default(), as_f64(right).unwrap_or_default());
            Ok(a.partial_cmp(&b).unwrap_or(match op {
                BinaryOp::Lt | BinaryOp::LtEq => Ordering::Greater,
                _ => Ordering::Less,
            }))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ if same_kind(left, right) => Err(invalid_binary_op(op, left.type_name())),
        _ => Err(mismatched_types(op, left.type_name(), right.type_name())),
    }
}

/// Evaluate `op operand`.
pub fn evaluate_unary(operand: &Value, op: UnaryOp) -> EvalResult {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
        (UnaryOp::Neg, Value::Uint(u)) => Ok(Value::Uint(u.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, Value::Complex(c)) => Ok(Value::Complex(Complex::new(-c.re, -c.im))),
        (
            UnaryOp::Pos,
            Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Complex(_),
        ) => Ok(operand.clone()),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
        (UnaryOp::BitNot, Value::Uint(u)) => Ok(Value::Uint(!u)),
        _ => Err(invalid_unary_op(op, operand.type_name())),
    }
}
